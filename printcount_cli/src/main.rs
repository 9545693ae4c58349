mod commands;
mod output;
mod sink;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "printcount")]
#[command(about = "Collect page counters from printer web consoles into a monthly sheet")]
struct Cli {
    /// Output format: table, json, csv or markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Visit every configured device and record its counters
    Collect(Box<commands::collect::CollectArgs>),
    /// Parse a saved counter report offline
    Parse(commands::parse::ParseArgs),
    /// Pivot canonical lines into per-place readings
    Summarize(commands::summarize::SummarizeArgs),
}

/// Targets enabled at info on top of `RUST_LOG`.
const DEFAULT_DIRECTIVES: &[&str] = &["printcount=info", "remoteui_api=info"];

fn log_filter(mut filter: EnvFilter) -> Result<EnvFilter> {
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(EnvFilter::from_default_env())?)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "table" => OutputFormat::Table,
        "json" => OutputFormat::Json,
        "csv" => OutputFormat::Csv,
        "markdown" | "md" => OutputFormat::Markdown,
        other => bail!("unknown output format {:?} (expected table, json, csv or markdown)", other),
    };

    match &cli.command {
        Commands::Collect(args) => commands::collect::run(args.as_ref(), &format).await?,
        Commands::Parse(args) => commands::parse::run(args, &format)?,
        Commands::Summarize(args) => commands::summarize::run(args, &format)?,
    }

    Ok(())
}
