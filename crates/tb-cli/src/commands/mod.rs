//! CLI subcommand implementations.

pub mod generate;
pub mod lessons;
mod util;
