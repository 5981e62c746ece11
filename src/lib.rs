pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod core;
pub mod dates;
pub mod error;
pub mod report;
