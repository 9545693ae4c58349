//! Library layer for printcount: reads page counters from printer web
//! consoles and turns them into monthly readings.
//!
//! The pipeline is report document -> counter rows -> canonical lines ->
//! per-place readings -> sheet. Everything up to the readings is pure and
//! works offline on saved documents; [`fetch`] is the only part that talks
//! to a device, through the `remoteui_api` session.

pub mod availability;
pub mod collect;
pub mod config;
pub mod error;
pub mod fetch;
pub mod lines;
pub mod rows;
pub mod sheet;
pub mod summary;

pub use remoteui_api;
pub use remoteui_api::{ConsolePaths, Credentials, Timeouts};

pub use availability::{is_unavailable, unavailable_marker};
pub use collect::{collect_summary_lines, RunPolicy, RunTally};
pub use config::{credentials_from_env, ConfigError, DeviceEntry, FleetConfig};
pub use error::PrintCountError;
pub use fetch::{
    dump_html, fetch_counters, run_device, Advisory, DeviceResult, Diagnostics, Failure,
    FailureKind, ReportTransport, RequestStatus,
};
pub use lines::{format_lines, FormatWarning, FormattedLines};
pub use rows::{document_title, parse_counter_rows, CounterRow};
pub use sheet::{
    sheet_name_for, CsvSink, SaveMode, SaveReport, SheetData, SheetError, SheetLayout,
    SpreadsheetSink, XlsxSink,
};
pub use summary::{parse_lines, pivot, summarize, LongRecord, WideRecord};
