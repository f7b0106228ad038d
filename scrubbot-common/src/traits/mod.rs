// File: scrubbot-common/src/traits/mod.rs
pub mod clean_traits;

pub use clean_traits::{CleanAuditSink, MessagePlatform};
