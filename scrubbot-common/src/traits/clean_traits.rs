use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker, UserMarker};
use twilight_model::id::Id;

use crate::error::Error;
use crate::models::{ChannelScope, CleanMessage};

/// The chat-platform calls the cleaner depends on.
///
/// Implementations report a missing message as `Error::NotFound`
/// and any other failure as `Error::Platform`.
#[async_trait]
pub trait MessagePlatform: Send + Sync {
    /// Lazily walks up to `limit` messages of a channel, newest first,
    /// restricted to those created within `after..=before`.
    fn history<'a>(
        &'a self,
        channel_id: Id<ChannelMarker>,
        limit: usize,
        before: Option<DateTime<Utc>>,
        after: Option<DateTime<Utc>>,
    ) -> BoxStream<'a, Result<CleanMessage, Error>>;

    /// Text channels of a guild, in guild order.
    async fn text_channels(&self, guild_id: Id<GuildMarker>) -> Result<Vec<Id<ChannelMarker>>, Error>;

    /// Deletes up to 100 messages of one channel in a single call.
    async fn bulk_delete(
        &self,
        channel_id: Id<ChannelMarker>,
        message_ids: &[Id<MessageMarker>],
    ) -> Result<(), Error>;

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), Error>;
}

/// Receives the record of a finished clean and returns a reference
/// (URL, file path, ...) moderators can follow to review it.
#[async_trait]
pub trait CleanAuditSink: Send + Sync {
    async fn report(
        &self,
        messages: &[CleanMessage],
        operator: Id<UserMarker>,
        scope: &ChannelScope,
    ) -> Result<String, Error>;
}
