//! CLI subcommands.

pub mod common;
pub mod resolve;
pub mod sample;
pub mod score;
