//! CLI subcommand implementations.

pub mod collect;
pub mod parse;
pub mod summarize;
