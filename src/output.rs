//! Stdout rendering: elastic text tables, money/count formatting, and CSV
//! export of query results.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use csv::QuoteStyle;

/// Shown wherever a value is missing or its column was never detected.
pub const PLACEHOLDER: &str = "—";

/// Renders rows as an aligned table: padded cells, two-space gutters, and a
/// dash rule under the header.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        let mut line = String::new();
        for (idx, cell) in cells.iter().enumerate().take(widths.len()) {
            if idx > 0 {
                line.push_str("  ");
            }
            let _ = write!(line, "{cell:<width$}", width = widths[idx]);
        }
        line.trim_end().to_string()
    };

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat((*w).max(3))).collect();
    let _ = writeln!(output, "{}", rule.join("  "));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Whole-dollar money rendering: `$1,234`, or the placeholder when absent.
pub fn fmt_money(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            let rounded = v.round() as i64;
            if rounded < 0 {
                format!("-${}", thousands(-rounded))
            } else {
                format!("${}", thousands(rounded))
            }
        }
        _ => PLACEHOLDER.to_string(),
    }
}

/// Grouped integer rendering, placeholder when absent.
pub fn fmt_int(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => thousands(v.round() as i64),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Fraction-of-one cell rendered as a percentage, clamped to 0..=1.
pub fn fmt_pct(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return PLACEHOLDER.to_string();
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();
    match cleaned.parse::<f64>() {
        Ok(value) => format!("{:.1}%", value.clamp(0.0, 1.0) * 100.0),
        Err(_) => PLACEHOLDER.to_string(),
    }
}

/// Writes query results as CSV with every field quoted, so identifiers and
/// embedded commas round-trip.
pub fn write_csv<W: Write>(writer: W, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut out = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    out.write_record(headers).context("Writing CSV header")?;
    for row in rows {
        out.write_record(row).context("Writing CSV row")?;
    }
    out.flush().context("Flushing CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_aligns_columns() {
        let headers = vec!["name".to_string(), "amount".to_string()];
        let rows = vec![
            vec!["Acme Supply".to_string(), "$1,250".to_string()],
            vec!["Bus Co".to_string(), "$800".to_string()],
        ];
        let rendered = render_table(&headers, &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("name"));
        assert!(lines[1].starts_with("---"));
        assert!(lines[2].contains("Acme Supply"));
    }

    #[test]
    fn money_formatting() {
        assert_eq!(fmt_money(Some(1234.4)), "$1,234");
        assert_eq!(fmt_money(Some(0.0)), "$0");
        assert_eq!(fmt_money(Some(-5000.0)), "-$5,000");
        assert_eq!(fmt_money(None), PLACEHOLDER);
        assert_eq!(fmt_money(Some(f64::NAN)), PLACEHOLDER);
    }

    #[test]
    fn int_formatting() {
        assert_eq!(fmt_int(Some(1234567.0)), "1,234,567");
        assert_eq!(fmt_int(Some(12.0)), "12");
        assert_eq!(fmt_int(None), PLACEHOLDER);
    }

    #[test]
    fn pct_formatting_clamps_to_unit_range() {
        assert_eq!(fmt_pct(Some("0.475")), "47.5%");
        assert_eq!(fmt_pct(Some("1.2")), "100.0%");
        assert_eq!(fmt_pct(Some("whenever")), PLACEHOLDER);
        assert_eq!(fmt_pct(None), PLACEHOLDER);
    }

    #[test]
    fn csv_export_quotes_everything() {
        let headers = vec!["id".to_string(), "name".to_string()];
        let rows = vec![vec!["015901".to_string(), "Smith, John ISD".to_string()]];
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &headers, &rows).expect("write");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("\"015901\""));
        assert!(text.contains("\"Smith, John ISD\""));
    }
}
