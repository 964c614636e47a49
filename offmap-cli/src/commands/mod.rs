//! Subcommand implementations.

pub mod archives;
pub mod common;
pub mod config;
pub mod download;
