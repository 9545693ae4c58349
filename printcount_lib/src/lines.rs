//! Canonical `place<TAB>type<TAB>count` lines from parsed counter rows.

use serde::{Deserialize, Serialize};

use crate::rows::CounterRow;

/// Canonical label for the black-and-white reading.
pub const BW_LABEL: &str = "흑백";
/// Canonical label for the color reading.
pub const COLOR_LABEL: &str = "컬러";

/// Row count of the report layout the fixed positions below refer to.
pub const EXPECTED_ROWS: usize = 4;
/// Zero-based position of the black-and-white reading.
pub const BW_POSITION: usize = 2;
/// Zero-based position of the color reading.
pub const COLOR_POSITION: usize = 3;

/// Why a formatted result is not a pair of canonical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatWarning {
    UnexpectedRowsLength,
}

impl FormatWarning {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnexpectedRowsLength => "unexpected_rows_length",
        }
    }
}

impl std::fmt::Display for FormatWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedLines {
    pub ok: bool,
    pub lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<FormatWarning>,
}

/// Formats the black-and-white and color readings of one device.
///
/// The readings are taken by position, not by label: row 2 is
/// black-and-white and row 3 is color. If either row is missing the
/// result is not `ok`; the lines then hold a `WARN` line with the observed
/// row count followed by one raw `place, kind, value` line per row, so an
/// operator can still see what the page contained.
pub fn format_lines(place: &str, rows: &[CounterRow]) -> FormattedLines {
    let (Some(bw), Some(color)) = (rows.get(BW_POSITION), rows.get(COLOR_POSITION)) else {
        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(format!(
            "{}\tWARN\trows length={} (expected {})",
            place,
            rows.len(),
            EXPECTED_ROWS
        ));
        for row in rows {
            lines.push(format!("{}\t{}\t{}", place, row.kind, render_value(row.value)));
        }
        return FormattedLines {
            ok: false,
            lines,
            warning: Some(FormatWarning::UnexpectedRowsLength),
        };
    };

    if rows.len() != EXPECTED_ROWS {
        tracing::debug!(
            "{}: {} counter rows, using positions {} and {}",
            place,
            rows.len(),
            BW_POSITION,
            COLOR_POSITION
        );
    }

    FormattedLines {
        ok: true,
        lines: vec![
            canonical_line(place, BW_LABEL, bw.value),
            canonical_line(place, COLOR_LABEL, color.value),
        ],
        warning: None,
    }
}

fn canonical_line(place: &str, label: &str, value: Option<u64>) -> String {
    format!("{}\t{}\t{}", place, label, render_value(value))
}

fn render_value(value: Option<u64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rows::parse_counter_rows;

    fn row(index: &str, kind: &str, value: Option<u64>) -> CounterRow {
        CounterRow {
            index: Some(index.to_string()),
            kind: kind.to_string(),
            value,
        }
    }

    fn four_rows() -> Vec<CounterRow> {
        vec![
            row("101", "Total 1", Some(51477)),
            row("102", "Total 2", Some(51477)),
            row("108", "Total (Black 2)", Some(50277)),
            row("321", "Total (Color)", Some(1200)),
        ]
    }

    #[test]
    fn four_rows_give_two_canonical_lines() {
        let out = format_lines("시험측정실", &four_rows());
        assert!(out.ok);
        assert_eq!(out.warning, None);
        assert_eq!(
            out.lines,
            vec!["시험측정실\t흑백\t50277", "시험측정실\t컬러\t1200"]
        );
    }

    #[test]
    fn absent_value_renders_empty() {
        let mut rows = four_rows();
        rows[3].value = None;
        let out = format_lines("설계실", &rows);
        assert!(out.ok);
        assert_eq!(out.lines[1], "설계실\t컬러\t");
    }

    #[test]
    fn short_rows_degrade_to_diagnostic_lines() {
        let rows = vec![row("101", "Total 1", Some(10)), row("102", "Total 2", None)];
        let out = format_lines("금형관리실", &rows);
        assert!(!out.ok);
        assert_eq!(out.warning, Some(FormatWarning::UnexpectedRowsLength));
        assert_eq!(
            out.lines,
            vec![
                "금형관리실\tWARN\trows length=2 (expected 4)",
                "금형관리실\tTotal 1\t10",
                "금형관리실\tTotal 2\t",
            ]
        );
    }

    #[test]
    fn three_rows_is_still_unexpected() {
        let rows = four_rows()[..3].to_vec();
        let out = format_lines("A", &rows);
        assert!(!out.ok);
        assert_eq!(out.lines.len(), 4);
    }

    #[test]
    fn no_rows_gives_only_warning_line() {
        let out = format_lines("A", &[]);
        assert!(!out.ok);
        assert_eq!(out.lines, vec!["A\tWARN\trows length=0 (expected 4)"]);
        assert_eq!(out.warning.map(FormatWarning::as_str), Some("unexpected_rows_length"));
    }

    // Positions are trusted blindly. If firmware reorders counters the
    // values swap silently; this pins that behavior so a change is deliberate.
    #[test]
    fn readings_follow_position_not_label() {
        let rows = vec![
            row("1", "a", Some(1)),
            row("2", "b", Some(2)),
            row("321", "Total (Color)", Some(7)),
            row("108", "Total (Black 2)", Some(9)),
        ];
        let out = format_lines("A", &rows);
        assert_eq!(out.lines, vec!["A\t흑백\t7", "A\t컬러\t9"]);
    }

    #[test]
    fn extra_rows_keep_fixed_positions() {
        let mut rows = four_rows();
        rows.push(row("501", "Scan", Some(3)));
        let out = format_lines("A", &rows);
        assert!(out.ok);
        assert_eq!(out.lines, vec!["A\t흑백\t50277", "A\t컬러\t1200"]);
    }

    #[test]
    fn end_to_end_from_quoted_script_calls() {
        let html = r#"<html><body><div class="ItemListComponent"><table><tbody>
            <tr><td>Total 1</td><td><script>write_value("1","61477")</script></td></tr>
            <tr><td>Total 2</td><td><script>write_value("2","61477")</script></td></tr>
            <tr><td>Black</td><td><script>write_value("3","50277")</script></td></tr>
            <tr><td>Color</td><td><script>write_value("4","1200")</script></td></tr>
        </tbody></table></div></body></html>"#;
        let rows = parse_counter_rows(html);
        let out = format_lines("시험측정실", &rows);
        assert!(out.ok);
        assert_eq!(
            out.lines,
            vec!["시험측정실\t흑백\t50277", "시험측정실\t컬러\t1200"]
        );
    }
}
