//! CLI command implementations.

pub mod clear;
pub mod config;
pub mod fetch;
pub mod login;
pub mod set;
pub mod show;
pub mod watch;
