use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::id::Id;

/// The searchable parts of a rich embed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedText {
    pub title: Option<String>,
    pub description: Option<String>,
    pub footer_text: Option<String>,
    pub author_name: Option<String>,
    pub fields: Vec<EmbedFieldText>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedFieldText {
    pub name: String,
    pub value: String,
}

/// A chat message as seen by the cleaner.
///
/// Holds only the fields filtering, deletion and transcripts need;
/// the platform object itself stays with the platform layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanMessage {
    pub id: Id<MessageMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub guild_id: Option<Id<GuildMarker>>,
    pub author_id: Id<UserMarker>,
    pub author_name: String,
    pub author_bot: bool,
    pub content: String,
    pub embeds: Vec<EmbedText>,
    pub created_at: DateTime<Utc>,
}

impl CleanMessage {
    /// Message body followed by every non-empty embed text field, newline-joined.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.content.as_str()];

        for embed in &self.embeds {
            parts.extend(embed.title.as_deref());
            parts.extend(embed.description.as_deref());
            parts.extend(embed.footer_text.as_deref());
            parts.extend(embed.author_name.as_deref());
            for field in &embed.fields {
                parts.push(field.name.as_str());
                parts.push(field.value.as_str());
            }
        }

        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
