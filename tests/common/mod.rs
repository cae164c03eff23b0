#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// A small district CSV in the shape published revisions actually use:
/// quoted, zero-padded identifiers and currency-formatted numbers.
pub const DISTRICTS_CSV: &str = "\
USER_District_Number,NAME,COUNTY,Total Spending,Enrollment,Distrit Debt,Per-Pupil Debt,Average Teacher Salary
'015901,Alamo Heights ISD,Bexar,\"$1,000,000\",500,\"$2,000,000\",\"$4,000\",\"$60,000\"
227901,Austin ISD,Travis,\"$9,000,000\",\"4,500\",\"$8,000,000\",\"$1,778\",\"$58,000\"
101912,Houston ISD,Harris,\"$12,000,000\",6000,,,\"$56,000\"
";

pub const CAMPUSES_CSV: &str = "\
USER_School_Number,USER_School_Name,USER_District_Number,Campus Score,Reading OGL,Math OGL,LAT,LON
015901001,Cambridge Elementary,'015901,91,0.62,0.58,29.48,-98.46
015901041,Alamo Heights High School,15901,84,0.55,0.49,29.49,-98.47
227901001,Austin High School,227901,78,0.47,0.41,30.27,-97.74
";

pub const SPENDING_CSV: &str = "\
DISTRICT_N,DATE,VENDOR,CATEGORY,AMOUNT,DESCRIPTION
015901,2024-01-15,Acme Supply,Supplies,\"$1,250.50\",Paper goods
15901,2024-01-31T23:00:00,Lone Star Transit,Transport,800,Bus route contract
015901,2024-02-01T00:00:01,Acme Supply,Supplies,\"$3,000\",Lab equipment
227901,2024-03-10,Brazos Foods,Food Service,\"$12,000\",Cafeteria produce
";

pub const DISTRICTS_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature",
     "properties": {"DISTRICT_N": "015901", "NAME": "Alamo Heights ISD"},
     "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
    {"type": "Feature",
     "properties": {"DISTRICT_N": "227901", "NAME": "Austin ISD"},
     "geometry": {"type": "Polygon", "coordinates": [[[2, 2], [3, 2], [3, 3], [2, 2]]]}}
  ]
}"#;
