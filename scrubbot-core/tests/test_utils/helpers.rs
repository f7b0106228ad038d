// File: scrubbot-core/tests/test_utils/helpers.rs

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Duration, Utc};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::id::Id;

use scrubbot_common::models::CleanMessage;
use scrubbot_core::clean::CleanContext;
use scrubbot_core::utils::time::{snowflake_from_time, snowflake_timestamp};

pub const GUILD: u64 = 500;
pub const OPERATOR: u64 = 900;

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub fn channel(id: u64) -> Id<ChannelMarker> {
    Id::new(id)
}

pub fn user(id: u64) -> Id<UserMarker> {
    Id::new(id)
}

pub fn guild() -> Id<GuildMarker> {
    Id::new(GUILD)
}

pub fn context(channel_id: u64) -> CleanContext {
    CleanContext {
        operator: user(OPERATOR),
        channel_id: channel(channel_id),
        guild_id: Some(guild()),
    }
}

/// A message whose snowflake places it `age` in the past.
pub fn message_aged(channel_id: u64, author: u64, bot: bool, content: &str, age: Duration) -> CleanMessage {
    // Low bits only carry the sequence, so the timestamp stays exact to the millisecond.
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % 4096;
    let id = Id::new(snowflake_from_time(Utc::now() - age) | seq);

    CleanMessage {
        id,
        channel_id: channel(channel_id),
        guild_id: Some(guild()),
        author_id: user(author),
        author_name: format!("user{author}"),
        author_bot: bot,
        content: content.to_string(),
        embeds: Vec::new(),
        created_at: snowflake_timestamp(id),
    }
}

pub fn bot_message(channel_id: u64, age: Duration) -> CleanMessage {
    message_aged(channel_id, 1, true, "beep", age)
}

pub fn human_message(channel_id: u64, author: u64, content: &str, age: Duration) -> CleanMessage {
    message_aged(channel_id, author, false, content, age)
}

/// `count` bot messages, newest first, one minute apart starting a minute ago.
pub fn recent_bot_history(channel_id: u64, count: usize) -> Vec<CleanMessage> {
    (1..=count as i64)
        .map(|i| bot_message(channel_id, Duration::minutes(i)))
        .collect()
}
