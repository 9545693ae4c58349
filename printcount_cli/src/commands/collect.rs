//! The `collect` subcommand: visits every configured device in order,
//! prints what each one reported, and saves the month's readings.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use printcount_lib::collect::{collect_summary_lines, RunPolicy, RunTally};
use printcount_lib::config::{credentials_from_env, FleetConfig};
use printcount_lib::fetch::{dump_html, run_device, DeviceResult};
use printcount_lib::sheet::SaveReport;
use printcount_lib::summary::{summarize, WideRecord};
use serde::Serialize;

use crate::output::{
    device_block, print_devices, print_json, print_wide, summary_block, OutputFormat,
};
use crate::sink::{persist, saved_line, SinkArgs};

#[derive(Args)]
pub struct CollectArgs {
    /// Fleet configuration file (TOML)
    #[arg(long)]
    pub config: PathBuf,

    #[command(flatten)]
    pub sink: SinkArgs,

    /// Stop at the first device that fails
    #[arg(long)]
    pub abort_on_error: bool,

    /// Also summarize devices whose report had an unexpected number of rows
    #[arg(long)]
    pub include_unexpected: bool,

    /// Print results without writing the sheet
    #[arg(long)]
    pub no_save: bool,

    /// Write the report document of failed or warned devices to this directory
    #[arg(long)]
    pub dump_html: Option<PathBuf>,
}

#[derive(Serialize)]
struct CollectReport<'a> {
    tally: RunTally,
    aborted: bool,
    results: &'a [DeviceResult],
    summary_lines: &'a [String],
    summary: &'a [WideRecord],
    saved: Option<&'a SaveReport>,
}

pub async fn run(args: &CollectArgs, format: &OutputFormat) -> Result<()> {
    let config = FleetConfig::load(&args.config)?;
    let credentials = credentials_from_env()?;
    let policy = if args.abort_on_error {
        RunPolicy::AbortOnError
    } else {
        RunPolicy::ContinueOnError
    };
    let blocks = matches!(format, OutputFormat::Table | OutputFormat::Markdown);

    tracing::info!(
        "Collecting counters from {} devices ({})",
        config.devices.len(),
        args.config.display()
    );

    let pb = ProgressBar::new(config.devices.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {msg}",
    )?);

    let mut results: Vec<DeviceResult> = Vec::with_capacity(config.devices.len());
    let mut aborted = false;
    for device in &config.devices {
        pb.set_message(device.place.clone());
        let result = run_device(device, &config.console, config.timeouts, &credentials).await;

        if blocks {
            pb.suspend(|| println!("{}", device_block(&result)));
        }
        if let Some(dir) = &args.dump_html {
            if !result.has_readings() {
                match dump_html(dir, &result) {
                    Ok(Some(path)) => tracing::info!("Saved report document to {}", path.display()),
                    Ok(None) => {}
                    Err(e) => tracing::warn!("{}: could not save report document: {}", result.place, e),
                }
            }
        }

        let stop = policy.should_stop(&result);
        results.push(result);
        pb.inc(1);
        if stop {
            aborted = true;
            break;
        }
    }

    let tally = RunTally::from_results(&results);
    pb.finish_with_message(format!(
        "{} ok, {} unexpected, {} failed",
        tally.succeeded, tally.unexpected, tally.failed
    ));

    let summary_lines = collect_summary_lines(&results, args.include_unexpected);
    let summary = summarize(&summary_lines);

    let saved = if aborted || args.no_save {
        None
    } else {
        Some(persist(&args.sink, &summary_lines).context("saving the sheet")?)
    };

    match format {
        OutputFormat::Json => print_json(&CollectReport {
            tally,
            aborted,
            results: &results,
            summary_lines: &summary_lines,
            summary: &summary,
            saved: saved.as_ref(),
        }),
        OutputFormat::Csv => print_wide(&summary, format)?,
        OutputFormat::Table | OutputFormat::Markdown => {
            print_devices(&results, format)?;
            println!("{}", summary_block(&summary_lines));
            println!();
            print_wide(&summary, format)?;
            if let Some(report) = &saved {
                println!("{}", saved_line(report));
            }
        }
    }

    if aborted {
        let place = results.last().map(|r| r.place.as_str()).unwrap_or_default();
        bail!("run aborted after {} failed; nothing was saved", place);
    }
    Ok(())
}
