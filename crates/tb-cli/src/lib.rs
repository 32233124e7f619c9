//! Operator CLI for tutorbill.
//!
//! Ties the collaborators together: configuration, data-file loading,
//! calendar fetch, lesson assembly, and invoice rendering.

mod cli;
pub mod commands;
mod config;
pub mod data;
pub mod dates;
pub mod invoice;

pub use cli::{Cli, Commands};
pub use config::Config;
