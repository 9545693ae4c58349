//! Aggregation of canonical lines into per-place readings.
//!
//! Lines are first parsed into long records (one per place and type), then
//! pivoted into one wide record per place. Both steps are lenient: a line
//! that does not parse is skipped, and types other than black-and-white and
//! color are ignored by the pivot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::lines::{BW_LABEL, COLOR_LABEL};

/// Known spellings mapped to their canonical label.
pub const TYPE_ALIASES: &[(&str, &str)] = &[("칼라", COLOR_LABEL)];

/// One `(place, type, count)` reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongRecord {
    pub place: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
}

/// Both readings of one place. `None` means no reading was recorded, which
/// is different from a zero count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WideRecord {
    pub place: String,
    pub bw: Option<i64>,
    pub color: Option<i64>,
}

/// Parses canonical lines, skipping anything malformed.
///
/// A line is split on runs of tabs and needs at least three fields. Place
/// and type must be non-empty after trimming and the count, with thousands
/// separators removed, must be an integer.
pub fn parse_lines<I, S>(lines: I) -> Vec<LongRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_line(line.as_ref()))
        .collect()
}

fn parse_line(line: &str) -> Option<LongRecord> {
    let fields: Vec<&str> = line.trim().split('\t').filter(|f| !f.is_empty()).collect();
    if fields.len() < 3 {
        return None;
    }
    let place = fields[0].trim();
    let kind = fields[1].trim();
    if place.is_empty() || kind.is_empty() {
        return None;
    }
    let count: i64 = fields[2].replace(',', "").trim().parse().ok()?;
    Some(LongRecord {
        place: place.to_string(),
        kind: normalize_type(kind).to_string(),
        count,
    })
}

/// Maps known alternate spellings to the canonical label.
pub fn normalize_type(kind: &str) -> &str {
    TYPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == kind)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(kind)
}

/// Pivots long records into one wide record per place, in first-seen order.
///
/// Duplicate `(place, type)` records are summed.
pub fn pivot(records: &[LongRecord]) -> Vec<WideRecord> {
    let mut out: Vec<WideRecord> = Vec::new();
    let mut by_place: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let idx = *by_place.entry(record.place.as_str()).or_insert_with(|| {
            out.push(WideRecord {
                place: record.place.clone(),
                bw: None,
                color: None,
            });
            out.len() - 1
        });
        let slot = match record.kind.as_str() {
            BW_LABEL => &mut out[idx].bw,
            COLOR_LABEL => &mut out[idx].color,
            _ => continue,
        };
        *slot = Some(slot.unwrap_or(0).saturating_add(record.count));
    }

    out
}

/// `pivot(parse_lines(lines))`.
pub fn summarize<I, S>(lines: I) -> Vec<WideRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    pivot(&parse_lines(lines))
}
