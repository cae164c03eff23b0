//! CSV ingestion into in-memory tables.
//!
//! Source files have no controlled schema: header names drift between
//! revisions and identifier columns carry leading zeros. Everything is kept
//! as strings here; typing decisions belong to the consumers working through
//! resolved field maps. Decoding is BOM-aware via `encoding_rs` so UTF-8 and
//! UTF-16 exports from spreadsheet tools both parse.

use encoding_rs::{Encoding, UTF_8};
use log::warn;

/// How many parse irregularities to surface in the log before going quiet.
const MAX_LOGGED_WARNINGS: usize = 3;

/// A parsed dataset: cleaned headers plus rows of raw string cells, in source
/// order. Rows are addressed positionally; column lookup goes through the
/// resolved field maps in [`crate::fields`].
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cell accessor through an optional resolved column. Returns `None` for
    /// an unresolved column, a short row, or an empty cell.
    pub fn cell<'a>(&self, row: &'a [String], column: Option<usize>) -> Option<&'a str> {
        let value = row.get(column?)?.as_str();
        if value.is_empty() { None } else { Some(value) }
    }
}

/// Decodes fetched bytes into text, honouring a BOM when present and falling
/// back to UTF-8. Malformed sequences are replaced rather than fatal; the
/// parser downstream copes with the remainder.
pub fn decode_text(bytes: &[u8]) -> String {
    let (encoding, offset) = match Encoding::for_bom(bytes) {
        Some((encoding, len)) => (encoding, len),
        None => (UTF_8, 0),
    };
    let (text, _, had_errors) = encoding.decode(&bytes[offset..]);
    if had_errors {
        warn!(
            "lossy {} decode while reading dataset; malformed sequences replaced",
            encoding.name()
        );
    }
    text.into_owned()
}

/// Parses CSV text into a [`RawTable`]. Headers are trimmed and stripped of
/// any stray BOM; duplicate header names are kept as-is (the field resolver
/// collapses them). Ragged rows are tolerated: short rows are padded with
/// empty cells, long rows truncated, and the first few irregularities logged.
pub fn parse_csv(text: &str) -> RawTable {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = match reader.headers() {
        Ok(record) => record
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect(),
        Err(err) => {
            warn!("failed to read CSV header row: {err}");
            return RawTable::default();
        }
    };

    let width = headers.len();
    let mut rows = Vec::new();
    let mut warnings = 0usize;
    for (idx, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                if warnings < MAX_LOGGED_WARNINGS {
                    warn!("skipping unreadable CSV row {}: {err}", idx + 2);
                }
                warnings += 1;
                continue;
            }
        };
        let mut row: Vec<String> = record.iter().map(|cell| cell.to_string()).collect();
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if row.len() != width {
            if warnings < MAX_LOGGED_WARNINGS {
                warn!(
                    "CSV row {} has {} cell(s), expected {}",
                    idx + 2,
                    row.len(),
                    width
                );
            }
            warnings += 1;
            row.resize(width, String::new());
        }
        rows.push(row);
    }
    if warnings > MAX_LOGGED_WARNINGS {
        warn!(
            "{} further CSV irregularities suppressed",
            warnings - MAX_LOGGED_WARNINGS
        );
    }

    RawTable { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_preserves_leading_zeros() {
        let table = parse_csv("DISTRICT_N,NAME\n015901,Alamo Heights ISD\n");
        assert_eq!(table.rows[0][0], "015901");
    }

    #[test]
    fn parse_strips_bom_and_whitespace_from_headers() {
        let table = parse_csv("\u{feff}DISTRICT_N , NAME\n1,Alpha\n");
        assert_eq!(table.headers, vec!["DISTRICT_N", "NAME"]);
    }

    #[test]
    fn parse_skips_blank_rows_and_pads_short_ones() {
        let table = parse_csv("A,B,C\n1,2,3\n,,\n4,5\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[1], vec!["4", "5", ""]);
    }

    #[test]
    fn parse_keeps_quoted_commas() {
        let table = parse_csv("NAME,COUNTY\n\"Smith, John ISD\",Travis\n");
        assert_eq!(table.rows[0][0], "Smith, John ISD");
    }

    #[test]
    fn decode_text_handles_utf8_bom() {
        let bytes = b"\xef\xbb\xbfA,B\n1,2\n";
        let text = decode_text(bytes);
        assert!(text.starts_with("A,B"));
    }

    #[test]
    fn cell_treats_empty_as_absent() {
        let table = parse_csv("A,B\n1,\n");
        let row = &table.rows[0];
        assert_eq!(table.cell(row, Some(0)), Some("1"));
        assert_eq!(table.cell(row, Some(1)), None);
        assert_eq!(table.cell(row, None), None);
    }
}
