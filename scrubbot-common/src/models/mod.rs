// File: scrubbot-common/src/models/mod.rs
pub mod clean;
pub mod message;

pub use clean::{ChannelScope, CleanLimit};
pub use message::{CleanMessage, EmbedFieldText, EmbedText};
