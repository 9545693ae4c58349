//! The `parse` subcommand: runs the row parser and line formatter on a
//! saved counter report, for checking what a device's page yields.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use printcount_lib::availability::unavailable_marker;
use printcount_lib::config::validate_place;
use printcount_lib::lines::{format_lines, FormattedLines};
use printcount_lib::rows::{document_title, parse_counter_rows, CounterRow};
use serde::Serialize;

use crate::output::{print_counter_rows, print_json, OutputFormat};

#[derive(Args)]
pub struct ParseArgs {
    /// Saved counter report (HTML)
    pub html: PathBuf,

    /// Place label for the formatted lines
    #[arg(long)]
    pub place: String,
}

#[derive(Serialize)]
struct ParseReport {
    title: Option<String>,
    unavailable: Option<&'static str>,
    rows: Vec<CounterRow>,
    #[serde(flatten)]
    formatted: FormattedLines,
}

pub fn run(args: &ParseArgs, format: &OutputFormat) -> Result<()> {
    validate_place(&args.place).map_err(anyhow::Error::msg)?;
    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("reading {}", args.html.display()))?;

    let unavailable = unavailable_marker(&html);
    if let Some(marker) = unavailable {
        tracing::warn!("Document is an error page ({}); rows will be empty", marker);
    }
    let rows = parse_counter_rows(&html);
    let formatted = format_lines(&args.place, &rows);

    match format {
        OutputFormat::Json => print_json(&ParseReport {
            title: document_title(&html),
            unavailable,
            rows,
            formatted,
        }),
        _ => {
            print_counter_rows(&rows, format)?;
            if !matches!(format, OutputFormat::Csv) {
                println!();
                for line in &formatted.lines {
                    println!("{}", line);
                }
            }
        }
    }
    Ok(())
}
