//! Monthly sheet persistence.
//!
//! A sheet holds one header row followed by data rows. Saving either
//! replaces the sheet or appends to it; an existing sheet must carry the
//! header of the layout being written, and a header row is added above
//! foreign content rather than mixing layouts.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Datelike;
use serde::Serialize;
use thiserror::Error;

use crate::summary::{LongRecord, WideRecord};

pub const MAX_SHEET_NAME_LEN: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

const LONG_HEADER: [&str; 3] = ["장소", "구분", "출력매수"];
const WIDE_HEADER: [&str; 3] = ["장소", "흑백", "컬러"];
const COLUMN_WIDTHS: [(&str, f64); 3] = [("A", 22.0), ("B", 10.0), ("C", 12.0)];
const COUNT_FORMAT: &str = "#,##0";

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("invalid sheet name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
    #[error("sheet {sheet:?} holds {found} rows, cannot append {expected} rows")]
    LayoutMismatch {
        sheet: String,
        expected: SheetLayout,
        found: SheetLayout,
    },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("workbook error on {path}: {message}")]
    Xlsx { path: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetLayout {
    /// One row per place and type.
    #[default]
    Long,
    /// One row per place with both readings.
    Wide,
}

impl SheetLayout {
    pub fn header(self) -> [&'static str; 3] {
        match self {
            Self::Long => LONG_HEADER,
            Self::Wide => WIDE_HEADER,
        }
    }

    fn other(self) -> Self {
        match self {
            Self::Long => Self::Wide,
            Self::Wide => Self::Long,
        }
    }

    /// Zero-based columns holding counts.
    fn count_columns(self) -> &'static [usize] {
        match self {
            Self::Long => &[2],
            Self::Wide => &[1, 2],
        }
    }
}

impl fmt::Display for SheetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Wide => write!(f, "wide"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Number(i64),
    Empty,
}

impl Cell {
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s),
            Self::Number(n) => Cow::Owned(n.to_string()),
            Self::Empty => Cow::Borrowed(""),
        }
    }
}

impl From<Option<i64>> for Cell {
    fn from(value: Option<i64>) -> Self {
        value.map(Cell::Number).unwrap_or(Cell::Empty)
    }
}

/// Rows ready to be written under a layout's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetData {
    pub layout: SheetLayout,
    pub rows: Vec<Vec<Cell>>,
}

impl SheetData {
    pub fn long(records: &[LongRecord]) -> Self {
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    Cell::Text(r.place.clone()),
                    Cell::Text(r.kind.clone()),
                    Cell::Number(r.count),
                ]
            })
            .collect();
        Self {
            layout: SheetLayout::Long,
            rows,
        }
    }

    /// Absent readings become empty cells.
    pub fn wide(records: &[WideRecord]) -> Self {
        let rows = records
            .iter()
            .map(|r| vec![Cell::Text(r.place.clone()), r.bw.into(), r.color.into()])
            .collect();
        Self {
            layout: SheetLayout::Wide,
            rows,
        }
    }

    pub fn header(&self) -> [&'static str; 3] {
        self.layout.header()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    #[default]
    Replace,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub location: String,
    pub sheet: String,
    pub row_count: usize,
}

pub trait SpreadsheetSink {
    fn save(&self, sheet: &str, data: &SheetData, mode: SaveMode) -> Result<SaveReport, SheetError>;
}

/// `YYYY.MM` for the month containing `date`.
pub fn sheet_name_for<D: Datelike>(date: &D) -> String {
    format!("{:04}.{:02}", date.year(), date.month())
}

pub fn validate_sheet_name(name: &str) -> Result<(), SheetError> {
    let invalid = |reason: String| SheetError::InvalidName {
        name: name.to_string(),
        reason,
    };
    if name.trim().is_empty() {
        return Err(invalid("name is empty".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(invalid(format!("longer than {} characters", MAX_SHEET_NAME_LEN)));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_SHEET_CHARS.contains(c)) {
        return Err(invalid(format!("contains {:?}", c)));
    }
    Ok(())
}

/// How the existing first row of a sheet relates to the header being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderAction {
    /// Sheet is empty; write the header first.
    Write,
    /// Header already present.
    Keep,
    /// Sheet has content but no header; put one above it.
    Insert,
}

fn reconcile_header<S: AsRef<str>>(
    sheet: &str,
    layout: SheetLayout,
    first_row: Option<&[S]>,
) -> Result<HeaderAction, SheetError> {
    let Some(row) = first_row else {
        return Ok(HeaderAction::Write);
    };
    if header_matches(row, layout) {
        return Ok(HeaderAction::Keep);
    }
    if header_matches(row, layout.other()) {
        return Err(SheetError::LayoutMismatch {
            sheet: sheet.to_string(),
            expected: layout,
            found: layout.other(),
        });
    }
    Ok(HeaderAction::Insert)
}

fn header_matches<S: AsRef<str>>(row: &[S], layout: SheetLayout) -> bool {
    let header = layout.header();
    let mut cells = row.iter().map(|c| c.as_ref().trim());
    header.iter().all(|h| cells.next() == Some(*h)) && cells.all(str::is_empty)
}

/// Workbook file sink. Other sheets of an existing workbook are kept.
#[derive(Debug, Clone)]
pub struct XlsxSink {
    pub path: PathBuf,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(&self, message: impl fmt::Display) -> SheetError {
        SheetError::Xlsx {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    fn open(&self) -> Result<umya_spreadsheet::Spreadsheet, SheetError> {
        if self.path.exists() {
            umya_spreadsheet::reader::xlsx::read(&self.path).map_err(|e| self.error(e))
        } else {
            Ok(umya_spreadsheet::new_file_empty_worksheet())
        }
    }
}

impl SpreadsheetSink for XlsxSink {
    fn save(&self, sheet: &str, data: &SheetData, mode: SaveMode) -> Result<SaveReport, SheetError> {
        validate_sheet_name(sheet)?;
        let mut book = self.open()?;

        if mode == SaveMode::Replace && book.get_sheet_by_name(sheet).is_some() {
            book.remove_sheet_by_name(sheet).map_err(|e| self.error(e))?;
        }
        if book.get_sheet_by_name(sheet).is_none() {
            book.new_sheet(sheet).map_err(|e| self.error(e))?;
        }
        let ws = book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| self.error(format!("sheet {:?} missing after creation", sheet)))?;

        let existing = read_grid(ws);
        let action = reconcile_header(sheet, data.layout, existing.first().map(Vec::as_slice))?;
        let header: Vec<Cell> = data.header().iter().map(|h| Cell::Text(h.to_string())).collect();

        let mut next_row = match action {
            HeaderAction::Write => {
                write_row(ws, 1, &header);
                2
            }
            HeaderAction::Keep => existing.len() as u32 + 1,
            HeaderAction::Insert => {
                write_row(ws, 1, &header);
                for (i, row) in existing.iter().enumerate() {
                    let cells: Vec<Cell> = row.iter().map(|v| text_or_number(v)).collect();
                    write_row(ws, i as u32 + 2, &cells);
                }
                existing.len() as u32 + 2
            }
        };
        for row in &data.rows {
            write_row(ws, next_row, row);
            next_row += 1;
        }

        style_sheet(ws, data.layout, next_row - 1);

        umya_spreadsheet::writer::xlsx::write(&book, &self.path).map_err(|e| self.error(e))?;
        tracing::info!(
            "Saved {} rows to sheet {} of {}",
            data.rows.len(),
            sheet,
            self.path.display()
        );
        Ok(SaveReport {
            location: self.path.display().to_string(),
            sheet: sheet.to_string(),
            row_count: data.rows.len(),
        })
    }
}

fn read_grid(ws: &umya_spreadsheet::Worksheet) -> Vec<Vec<String>> {
    let (max_col, max_row) = ws.get_highest_column_and_row();
    (1..=max_row)
        .map(|row| {
            (1..=max_col)
                .map(|col| {
                    ws.get_cell((col, row))
                        .map(|c| c.get_value().to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

fn text_or_number(value: &str) -> Cell {
    if value.is_empty() {
        Cell::Empty
    } else if let Ok(n) = value.parse::<i64>() {
        Cell::Number(n)
    } else {
        Cell::Text(value.to_string())
    }
}

fn write_row(ws: &mut umya_spreadsheet::Worksheet, row: u32, cells: &[Cell]) {
    for (i, cell) in cells.iter().enumerate() {
        let col = i as u32 + 1;
        match cell {
            Cell::Text(s) => {
                ws.get_cell_mut((col, row)).set_value(s.as_str());
            }
            Cell::Number(n) => {
                ws.get_cell_mut((col, row)).set_value_number(*n as f64);
            }
            Cell::Empty => {
                // Clear whatever a shifted row left behind at this position.
                if ws.get_cell((col, row)).is_some() {
                    ws.get_cell_mut((col, row)).set_value("");
                }
            }
        }
    }
}

fn style_sheet(ws: &mut umya_spreadsheet::Worksheet, layout: SheetLayout, last_row: u32) {
    for col in 1..=3u32 {
        ws.get_style_mut((col, 1)).get_font_mut().set_bold(true);
    }
    for (column, width) in COLUMN_WIDTHS {
        ws.get_column_dimension_mut(column).set_width(width);
    }
    for row in 2..=last_row {
        for &col in layout.count_columns() {
            ws.get_style_mut((col as u32 + 1, row))
                .get_number_format_mut()
                .set_format_code(COUNT_FORMAT);
        }
    }
}

/// Writes each sheet to `<dir>/<sheet>.csv`.
#[derive(Debug, Clone)]
pub struct CsvSink {
    pub dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet))
    }
}

impl SpreadsheetSink for CsvSink {
    fn save(&self, sheet: &str, data: &SheetData, mode: SaveMode) -> Result<SaveReport, SheetError> {
        validate_sheet_name(sheet)?;
        let path = self.sheet_path(sheet);
        let location = path.display().to_string();

        let existing = match mode {
            SaveMode::Replace => Vec::new(),
            SaveMode::Append => read_csv(&path)?,
        };
        let action = reconcile_header(sheet, data.layout, existing.first().map(Vec::as_slice))?;

        let mut grid: Vec<Vec<String>> = Vec::with_capacity(existing.len() + data.rows.len() + 1);
        if action != HeaderAction::Keep {
            grid.push(data.header().iter().map(|h| h.to_string()).collect());
        }
        grid.extend(existing);
        grid.extend(
            data.rows
                .iter()
                .map(|row| row.iter().map(|c| c.as_text().into_owned()).collect()),
        );

        std::fs::create_dir_all(&self.dir).map_err(|source| SheetError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;
        write_csv(&path, &grid)?;

        tracing::info!("Saved {} rows to {}", data.rows.len(), location);
        Ok(SaveReport {
            location,
            sheet: sheet.to_string(),
            row_count: data.rows.len(),
        })
    }
}

fn csv_error(path: &Path, source: csv::Error) -> SheetError {
    SheetError::Csv {
        path: path.display().to_string(),
        source,
    }
}

fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, SheetError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

fn write_csv(path: &Path, grid: &[Vec<String>]) -> Result<(), SheetError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    for row in grid {
        writer.write_record(row).map_err(|e| csv_error(path, e))?;
    }
    writer.flush().map_err(|source| SheetError::Io {
        path: path.display().to_string(),
        source,
    })
}
