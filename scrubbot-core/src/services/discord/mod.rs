// File: scrubbot-core/src/services/discord/mod.rs

pub mod clean_commands;
pub mod clean_handler;

pub use clean_commands::{parse_clean_command, CleanArgs, CleanCommand, CLEAN_HELP};
pub use clean_handler::CleanCommandHandler;
