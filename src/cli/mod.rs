//! CLI subcommand implementations for the pagepress binary.

pub mod doctor;
pub mod export_cmd;
pub mod single_cmd;
