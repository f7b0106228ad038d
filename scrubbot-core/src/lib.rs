// src/lib.rs

pub mod cache;
pub mod clean;
pub mod config;
pub mod modlog;
pub mod platforms;
pub mod services;
pub mod utils;

pub use scrubbot_common::error::Error;
pub use config::CleanConfig;
