//! Shared persistence flags and the save step behind them.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use clap::{Args, ValueEnum};
use printcount_lib::sheet::{
    sheet_name_for, CsvSink, SaveMode, SaveReport, SheetData, SheetLayout, SpreadsheetSink,
    XlsxSink,
};
use printcount_lib::summary::{parse_lines, pivot};

pub const DEFAULT_WORKBOOK: &str = "printer_counters.xlsx";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Xlsx,
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Rewrite the month's sheet
    Replace,
    /// Add rows below the existing ones
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    /// place | type | count
    Long,
    /// place | bw | color
    Wide,
}

#[derive(Args, Clone, Debug)]
pub struct SinkArgs {
    /// Workbook file for xlsx, directory for csv (default: printer_counters.xlsx or .)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Where to write the sheet
    #[arg(long, value_enum, default_value_t = SinkKind::Xlsx)]
    pub sink: SinkKind,

    /// Replace the month's sheet or append to it
    #[arg(long, value_enum, default_value_t = ModeArg::Replace)]
    pub mode: ModeArg,

    /// Sheet layout
    #[arg(long, value_enum, default_value_t = LayoutArg::Long)]
    pub layout: LayoutArg,

    /// Sheet name (default: current month as YYYY.MM)
    #[arg(long)]
    pub sheet: Option<String>,
}

impl SinkArgs {
    pub fn save_mode(&self) -> SaveMode {
        match self.mode {
            ModeArg::Replace => SaveMode::Replace,
            ModeArg::Append => SaveMode::Append,
        }
    }

    pub fn sheet_layout(&self) -> SheetLayout {
        match self.layout {
            LayoutArg::Long => SheetLayout::Long,
            LayoutArg::Wide => SheetLayout::Wide,
        }
    }

    pub fn sheet_name(&self) -> String {
        self.sheet
            .clone()
            .unwrap_or_else(|| sheet_name_for(&Local::now().date_naive()))
    }

    fn sink(&self) -> Box<dyn SpreadsheetSink> {
        match self.sink {
            SinkKind::Xlsx => Box::new(XlsxSink::new(
                self.out.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_WORKBOOK)),
            )),
            SinkKind::Csv => Box::new(CsvSink::new(
                self.out.clone().unwrap_or_else(|| PathBuf::from(".")),
            )),
        }
    }
}

/// Builds the sheet rows for `layout` from canonical lines.
pub fn sheet_data(lines: &[String], layout: SheetLayout) -> SheetData {
    let records = parse_lines(lines);
    match layout {
        SheetLayout::Long => SheetData::long(&records),
        SheetLayout::Wide => SheetData::wide(&pivot(&records)),
    }
}

/// Writes canonical lines to the sink selected by `args`.
pub fn persist(args: &SinkArgs, lines: &[String]) -> Result<SaveReport> {
    let data = sheet_data(lines, args.sheet_layout());
    let report = args.sink().save(&args.sheet_name(), &data, args.save_mode())?;
    Ok(report)
}

pub fn saved_line(report: &SaveReport) -> String {
    format!(
        "[SAVED] {} (sheet: {}, rows: {})",
        report.location, report.sheet, report.row_count
    )
}
