//! Counter row extraction from the console's counter report page.
//!
//! The report renders its numbers client-side: each row carries script
//! calls such as `write_index("108")` and `write_value("108", 50,277)` and
//! the visible cell text is often empty or partial. Extraction therefore
//! works from an ordered list of strategies per field, authoritative
//! script arguments first and visible text last. Each strategy is exposed
//! so it can be exercised on its own.
//!
//! Parsing is total: every `<tr>` inside the counter list yields a
//! [`CounterRow`], with absent fields where nothing could be recovered.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

static ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.ItemListComponent tbody tr").expect("invalid selector: counter rows")
});
static CELLS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("invalid selector: td"));

static RE_WRITE_INDEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"write_index\(\s*["'](\d+)["']\s*\)"#).expect("invalid regex: write_index")
});
static RE_WRITE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"write_value\(\s*["'](\d+)["']\s*,\s*["']?(\d[\d,]*)["']?\s*\)"#)
        .expect("invalid regex: write_value")
});
static RE_KIND_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s*:").expect("invalid regex: kind prefix"));
static RE_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("invalid regex: digits"));
static RE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("invalid regex: title")
});

/// One row of the counter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterRow {
    /// Counter number as printed by the console (e.g. `"108"`).
    pub index: Option<String>,
    /// Visible label of the first cell, scripts removed, whitespace collapsed.
    pub kind: String,
    /// Count with thousands separators removed.
    pub value: Option<u64>,
}

/// The raw material of a row that the strategies read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Every attribute value and text node of the row, script bodies
    /// included, in document order.
    pub markup: String,
    /// Visible text of the first cell.
    pub kind_text: String,
    /// Visible text of the second cell.
    pub value_text: String,
}

/// Where a row's index can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// `write_index("<digits>")`.
    WriteIndexCall,
    /// A leading `<digits>:` in the label.
    KindPrefix,
    /// The first argument of `write_value("<digits>", ...)`.
    WriteValueCall,
}

/// Index strategies in priority order.
pub const INDEX_STRATEGIES: &[IndexSource] = &[
    IndexSource::WriteIndexCall,
    IndexSource::KindPrefix,
    IndexSource::WriteValueCall,
];

/// Where a row's value can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// The grouped number passed to `write_value(...)`.
    WriteValueCall,
    /// The first run of digits in the visible value cell.
    CellText,
}

/// Value strategies in priority order.
pub const VALUE_STRATEGIES: &[ValueSource] = &[ValueSource::WriteValueCall, ValueSource::CellText];

impl IndexSource {
    pub fn extract(self, row: &RawRow) -> Option<String> {
        let caps = match self {
            Self::WriteIndexCall => RE_WRITE_INDEX.captures(&row.markup),
            Self::KindPrefix => RE_KIND_PREFIX.captures(&row.kind_text),
            Self::WriteValueCall => RE_WRITE_VALUE.captures(&row.markup),
        }?;
        Some(caps[1].to_string())
    }
}

impl ValueSource {
    pub fn extract(self, row: &RawRow) -> Option<u64> {
        match self {
            Self::WriteValueCall => {
                let caps = RE_WRITE_VALUE.captures(&row.markup)?;
                parse_grouped(&caps[2])
            }
            Self::CellText => {
                let cleaned = row.value_text.replace(',', "");
                let digits = RE_DIGITS.find(&cleaned)?;
                digits.as_str().parse().ok()
            }
        }
    }
}

impl RawRow {
    /// Applies the index and value strategies in priority order.
    pub fn to_counter_row(&self) -> CounterRow {
        CounterRow {
            index: INDEX_STRATEGIES.iter().find_map(|s| s.extract(self)),
            kind: self.kind_text.clone(),
            value: VALUE_STRATEGIES.iter().find_map(|s| s.extract(self)),
        }
    }
}

/// Extracts the counter rows of a report document.
///
/// Only rows under `div.ItemListComponent tbody` count. A document without
/// that container yields an empty list.
pub fn parse_counter_rows(html: &str) -> Vec<CounterRow> {
    raw_rows(html).iter().map(RawRow::to_counter_row).collect()
}

/// Collects the raw material of each counter row without interpreting it.
pub fn raw_rows(html: &str) -> Vec<RawRow> {
    let document = Html::parse_document(html);
    document
        .select(&ROWS)
        .map(|tr| {
            let mut cells = tr.select(&CELLS);
            let kind_text = cells.next().map(visible_text).unwrap_or_default();
            let value_text = cells.next().map(visible_text).unwrap_or_default();
            RawRow {
                markup: row_markup(tr),
                kind_text,
                value_text,
            }
        })
        .collect()
}

/// Contents of the document's `<title>`, trimmed.
pub fn document_title(html: &str) -> Option<String> {
    let caps = RE_TITLE.captures(html)?;
    let title = normalize_whitespace(&caps[1]);
    (!title.is_empty()).then_some(title)
}

/// Text a browser would show for `cell`, ignoring `<script>` bodies.
fn visible_text(cell: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in cell.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_script = node
            .ancestors()
            .take_while(|a| a.id() != cell.id())
            .any(|a| a.value().as_element().is_some_and(|e| e.name() == "script"));
        if !in_script {
            out.push_str(text);
        }
    }
    normalize_whitespace(&out)
}

/// Attribute values and text of the row subtree, unescaped.
///
/// Inline handlers (`onload="write_index('3')"`) and script bodies both end
/// up here, so the call patterns match regardless of where the console put them.
fn row_markup(tr: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in tr.descendants() {
        if let Some(el) = node.value().as_element() {
            for (_, value) in el.attrs() {
                out.push_str(value);
                out.push('\n');
            }
        } else if let Some(text) = node.value().as_text() {
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_grouped(raw: &str) -> Option<u64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}
