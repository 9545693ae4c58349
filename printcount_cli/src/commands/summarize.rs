//! The `summarize` subcommand: pivots canonical lines read from a file or
//! stdin, optionally saving them like `collect` does.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use printcount_lib::summary::summarize;

use crate::output::{print_wide, OutputFormat};
use crate::sink::{persist, saved_line, SinkArgs};

#[derive(Args)]
pub struct SummarizeArgs {
    /// File of `place<TAB>type<TAB>count` lines, or `-` for stdin
    #[arg(default_value = "-")]
    pub input: String,

    /// Save the lines to the month's sheet
    #[arg(long)]
    pub save: bool,

    #[command(flatten)]
    pub sink: SinkArgs,
}

fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    } else {
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }
}

pub fn run(args: &SummarizeArgs, format: &OutputFormat) -> Result<()> {
    let text = read_input(&args.input)?;
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    let summary = summarize(&lines);
    tracing::debug!("{} lines -> {} places", lines.len(), summary.len());

    print_wide(&summary, format)?;

    if args.save {
        let report = persist(&args.sink, &lines)?;
        if !matches!(format, OutputFormat::Json | OutputFormat::Csv) {
            println!("{}", saved_line(&report));
        }
    }
    Ok(())
}
