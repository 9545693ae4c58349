use std::fmt::Write as _;

use anyhow::Result;
use printcount_lib::fetch::DeviceResult;
use printcount_lib::rows::CounterRow;
use printcount_lib::summary::WideRecord;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

const RULE: &str = "====================================";

#[derive(Tabled, Serialize)]
struct WideRow {
    #[tabled(rename = "장소")]
    #[serde(rename = "장소")]
    place: String,
    #[tabled(rename = "흑백")]
    #[serde(rename = "흑백")]
    bw: String,
    #[tabled(rename = "컬러")]
    #[serde(rename = "컬러")]
    color: String,
}

#[derive(Tabled, Serialize)]
struct CounterRowOut {
    #[tabled(rename = "#")]
    #[serde(rename = "#")]
    position: usize,
    #[tabled(rename = "Index")]
    #[serde(rename = "Index")]
    index: String,
    #[tabled(rename = "Kind")]
    #[serde(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Tabled, Serialize)]
struct DeviceRow {
    #[tabled(rename = "Place")]
    #[serde(rename = "Place")]
    place: String,
    #[tabled(rename = "Base")]
    #[serde(rename = "Base")]
    base: String,
    #[tabled(rename = "Result")]
    #[serde(rename = "Result")]
    result: String,
    #[tabled(rename = "Detail")]
    #[serde(rename = "Detail")]
    detail: String,
}

// -- Row builders --

fn build_wide_rows(records: &[WideRecord]) -> Vec<WideRow> {
    records
        .iter()
        .map(|r| WideRow {
            place: r.place.clone(),
            bw: format_count(r.bw),
            color: format_count(r.color),
        })
        .collect()
}

fn build_counter_rows(rows: &[CounterRow]) -> Vec<CounterRowOut> {
    rows.iter()
        .enumerate()
        .map(|(i, r)| CounterRowOut {
            position: i,
            index: r.index.clone().unwrap_or_default(),
            kind: r.kind.clone(),
            value: r.value.map(|v| v.to_string()).unwrap_or_default(),
        })
        .collect()
}

fn build_device_rows(results: &[DeviceResult]) -> Vec<DeviceRow> {
    results
        .iter()
        .map(|r| DeviceRow {
            place: r.place.clone(),
            base: r.base.clone(),
            result: result_label(r).to_string(),
            detail: match (&r.failure, r.warning) {
                (Some(f), _) => f.message.clone(),
                (None, Some(w)) => w.to_string(),
                (None, None) => String::new(),
            },
        })
        .collect()
}

fn result_label(result: &DeviceResult) -> &'static str {
    match (result.ok, result.warning) {
        (false, _) => "FAIL",
        (true, Some(_)) => "WARN",
        (true, None) => "SUCCESS",
    }
}

fn format_count(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// -- Generic printers --

fn print_rows<T: Tabled + Serialize>(rows: Vec<T>, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", Table::new(rows)),
        OutputFormat::Markdown => {
            let mut table = Table::new(rows);
            table.with(Style::markdown());
            println!("{}", table);
        }
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        OutputFormat::Json => print_json(&rows),
    }
    Ok(())
}

/// JSON keeps the typed records so absent readings stay `null`.
pub fn print_wide(records: &[WideRecord], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            print_json(&records);
            Ok(())
        }
        _ => print_rows(build_wide_rows(records), format),
    }
}

pub fn print_counter_rows(rows: &[CounterRow], format: &OutputFormat) -> Result<()> {
    print_rows(build_counter_rows(rows), format)
}

pub fn print_devices(results: &[DeviceResult], format: &OutputFormat) -> Result<()> {
    print_rows(build_device_rows(results), format)
}

pub fn print_json<T: serde::Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

// -- Operator blocks --

/// The per-device block printed while a run progresses.
pub fn device_block(result: &DeviceResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "[{}] {}", result.place, result.base);

    if let Some(diag) = &result.diagnostics {
        let _ = writeln!(out, "[DEBUG] nativetop: {}", status_text(diag.nativetop.status));
        let _ = writeln!(out, "[DEBUG] jstatpri : {}", status_text(diag.jstatpri.status));
        let _ = writeln!(
            out,
            "[DEBUG] dcounter : {} {}",
            status_text(diag.dcounter.status),
            diag.dcounter.url
        );
    }

    if result.ok {
        let _ = writeln!(out, "[RESULT] SUCCESS");
        for line in &result.lines {
            let _ = writeln!(out, "{}", line);
        }
    } else {
        let _ = writeln!(out, "[RESULT] FAIL");
        if let Some(failure) = &result.failure {
            let _ = writeln!(out, "[ERROR] {}", failure.message);
        }
        if let Some(diag) = &result.diagnostics {
            let _ = writeln!(out, "[DEBUG] title: {}", diag.title);
        }
    }
    out.push_str(RULE);
    out
}

fn status_text(status: Option<u16>) -> String {
    status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Summary header followed by the lines that will be persisted.
pub fn summary_block(lines: &[String]) -> String {
    let mut out = String::from("\n==== SUMMARY (BW/COLOR) ====");
    for line in lines {
        out.push('\n');
        out.push_str(line);
    }
    out
}
