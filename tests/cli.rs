mod common;

use assert_cmd::Command;
use common::{CAMPUSES_CSV, DISTRICTS_CSV, DISTRICTS_GEOJSON, SPENDING_CSV, TestWorkspace};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

fn ledger() -> Command {
    Command::cargo_bin("lonestar-ledger").expect("binary exists")
}

#[test]
fn stats_renders_statewide_aggregates() {
    let ws = TestWorkspace::new();
    let districts = ws.write("districts.csv", DISTRICTS_CSV);
    ledger()
        .env("LONESTAR_DISTRICTS_CSV", &districts)
        .args(["stats"])
        .assert()
        .success()
        .stdout(
            contains("total spending")
                .and(contains("$22,000,000"))
                .and(contains("$18,125")),
        );
}

#[test]
fn stats_computed_mode_divides_spending_by_enrollment() {
    let ws = TestWorkspace::new();
    let districts = ws.write("districts.csv", DISTRICTS_CSV);
    ledger()
        .env("LONESTAR_DISTRICTS_CSV", &districts)
        .args(["stats", "--computed"])
        .assert()
        .success()
        .stdout(contains("$2,000"));
}

#[test]
fn probe_reports_detected_and_missing_fields() {
    let ws = TestWorkspace::new();
    let districts = ws.write("districts.csv", DISTRICTS_CSV);
    ledger()
        .env("LONESTAR_DISTRICTS_CSV", &districts)
        .args(["probe", "districts"])
        .assert()
        .success()
        .stdout(
            contains("DISTRICT_ID")
                .and(contains("USER_District_Number"))
                .and(contains("SUPERINTENDENT_SALARY")),
        );
}

#[test]
fn district_detail_finds_zero_padded_id() {
    let ws = TestWorkspace::new();
    let districts = ws.write("districts.csv", DISTRICTS_CSV);
    let campuses = ws.write("campuses.csv", CAMPUSES_CSV);
    ledger()
        .env("LONESTAR_DISTRICTS_CSV", &districts)
        .env("LONESTAR_CAMPUSES_CSV", &campuses)
        .args(["district", "15901"])
        .assert()
        .success()
        .stdout(
            contains("Alamo Heights ISD")
                .and(contains("Bexar County"))
                .and(contains("$1,000,000"))
                // 1,000,000 / 500 students
                .and(contains("$2,000"))
                .and(contains("Cambridge Elementary")),
        );
}

#[test]
fn district_not_found_is_a_clean_empty_state() {
    let ws = TestWorkspace::new();
    let districts = ws.write("districts.csv", DISTRICTS_CSV);
    ledger()
        .env("LONESTAR_DISTRICTS_CSV", &districts)
        .args(["district", "999999"])
        .assert()
        .success()
        .stdout(contains("District not found"));
}

#[test]
fn districts_search_promotes_exact_id() {
    let ws = TestWorkspace::new();
    let districts = ws.write("districts.csv", DISTRICTS_CSV);
    ledger()
        .env("LONESTAR_DISTRICTS_CSV", &districts)
        .args(["districts", "-q", "227901", "--sort", "name"])
        .assert()
        .success()
        .stdout(contains("Austin ISD").and(contains("1 of 1 result(s)")));
}

#[test]
fn spending_filters_by_date_range() {
    let ws = TestWorkspace::new();
    let spending = ws.write("spending.csv", SPENDING_CSV);
    ledger()
        .env("LONESTAR_SPENDING_CSV", &spending)
        .args([
            "spending",
            "15901",
            "--from",
            "2024-01-01",
            "--to",
            "2024-01-31",
        ])
        .assert()
        .success()
        .stdout(
            contains("Lone Star Transit")
                .and(contains("Acme Supply"))
                .and(contains("2 of 2 result(s)")),
        );
}

#[test]
fn spending_exports_csv() {
    let ws = TestWorkspace::new();
    let spending = ws.write("spending.csv", SPENDING_CSV);
    let out = ws.path().join("export.csv");
    ledger()
        .env("LONESTAR_SPENDING_CSV", &spending)
        .args(["spending", "15901", "--category", "Supplies"])
        .args(["-o", out.to_str().expect("utf8 path")])
        .assert()
        .success();
    let exported = std::fs::read_to_string(&out).expect("exported file");
    assert!(exported.contains("\"Acme Supply\""));
    assert!(!exported.contains("Lone Star Transit"));
}

#[test]
fn geo_emits_matched_boundary() {
    let ws = TestWorkspace::new();
    let geojson = ws.write("districts.geojson", DISTRICTS_GEOJSON);
    ledger()
        .env("LONESTAR_DISTRICTS_GEOJSON", &geojson)
        .args(["geo", "'015901"])
        .assert()
        .success()
        .stdout(contains("Alamo Heights ISD").and(contains("FeatureCollection")));
}

#[test]
fn geo_without_match_prints_empty_state() {
    let ws = TestWorkspace::new();
    let geojson = ws.write("districts.geojson", DISTRICTS_GEOJSON);
    ledger()
        .env("LONESTAR_DISTRICTS_GEOJSON", &geojson)
        .args(["geo", "999999"])
        .assert()
        .success()
        .stdout(contains("No geometry available"));
}

#[test]
fn geo_campus_points_synthesized_from_csv() {
    let ws = TestWorkspace::new();
    let campuses = ws.write("campuses.csv", CAMPUSES_CSV);
    ledger()
        .env("LONESTAR_CAMPUSES_CSV", &campuses)
        .args(["geo", "15901", "--campuses"])
        .assert()
        .success()
        .stdout(contains("Cambridge Elementary").and(contains("Point")));
}

#[test]
fn missing_configuration_names_the_variable() {
    ledger()
        .env_remove("LONESTAR_DISTRICTS_CSV")
        .args(["stats"])
        .assert()
        .failure()
        .stderr(contains("LONESTAR_DISTRICTS_CSV"));
}

#[test]
fn config_file_supplies_dataset_urls() {
    let ws = TestWorkspace::new();
    let districts = ws.write("districts.csv", DISTRICTS_CSV);
    let config = ws.write(
        "ledger.yml",
        &format!("districts_csv: {}\n", districts.display()),
    );
    ledger()
        .env_remove("LONESTAR_DISTRICTS_CSV")
        .args(["--config", config.to_str().expect("utf8 path"), "stats"])
        .assert()
        .success()
        .stdout(contains("$22,000,000"));
}

#[test]
fn campuses_list_searches_by_name() {
    let ws = TestWorkspace::new();
    let campuses = ws.write("campuses.csv", CAMPUSES_CSV);
    ledger()
        .env("LONESTAR_CAMPUSES_CSV", &campuses)
        .args(["campuses", "-q", "cambridge"])
        .assert()
        .success()
        .stdout(contains("Cambridge Elementary").and(contains("1 of 1 result(s)")));
}

#[test]
fn campus_detail_renders_percentages() {
    let ws = TestWorkspace::new();
    let campuses = ws.write("campuses.csv", CAMPUSES_CSV);
    ledger()
        .env("LONESTAR_CAMPUSES_CSV", &campuses)
        .args(["campus", "015901001"])
        .assert()
        .success()
        .stdout(contains("Cambridge Elementary").and(contains("62.0%")));
}
