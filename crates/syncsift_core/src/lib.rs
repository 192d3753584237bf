//! Syncsift Core - Quality-gated AV sync filtering
//!
//! This crate contains all pipeline logic with zero CLI dependencies:
//! chunk planning, FFmpeg extraction, sync scoring, classification,
//! output organization and batch reporting. It can be used by the CLI
//! binary or embedded in another tool.

pub mod batch;
pub mod classify;
pub mod config;
pub mod extract;
pub mod models;
pub mod oracle;
pub mod organize;
pub mod planner;
pub mod process;
pub mod report;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
