//! CLI subcommands. Each maps to one `picoagent` subcommand and returns the
//! process exit code per the contract in `main.rs`.

mod setup;

pub mod agent;
pub mod doctor;
pub mod gateway;
pub mod mcp;
pub mod memory;
pub mod onboard;
pub mod providers;
pub mod session;
pub mod skills;
pub mod threshold_stats;
pub mod tools;
