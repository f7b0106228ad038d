use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_model::id::Id;

/// Where a clean looks for messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelScope {
    /// Every text channel in the guild (or the whole recency cache).
    All,
    Channels(Vec<Id<ChannelMarker>>),
}

impl ChannelScope {
    pub fn is_all(&self) -> bool {
        matches!(self, ChannelScope::All)
    }
}

impl fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelScope::All => write!(f, "all channels"),
            ChannelScope::Channels(ids) => {
                let mentions: Vec<String> = ids.iter().map(|id| format!("<#{id}>")).collect();
                write!(f, "{}", mentions.join(", "))
            }
        }
    }
}

/// One end of a clean range, as the moderator expressed it.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanLimit {
    /// An existing message; also pins the scope to its channel.
    Message {
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    },
    /// "This long ago", relative to when the clean starts.
    Age(chrono::Duration),
    Timestamp(DateTime<Utc>),
}

impl CleanLimit {
    pub fn message_channel(&self) -> Option<Id<ChannelMarker>> {
        match self {
            CleanLimit::Message { channel_id, .. } => Some(*channel_id),
            _ => None,
        }
    }
}
