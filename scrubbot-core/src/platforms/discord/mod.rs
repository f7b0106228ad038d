// File: scrubbot-core/src/platforms/discord/mod.rs

pub mod runtime;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use tracing::trace;
use twilight_http::error::ErrorType;
use twilight_http::Client as HttpClient;
use twilight_model::channel::message::Embed;
use twilight_model::channel::{ChannelType, Message};
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker};
use twilight_model::id::Id;

use crate::utils::time::{snowflake_from_time, snowflake_timestamp};
use crate::Error;
use scrubbot_common::models::{CleanMessage, EmbedFieldText, EmbedText};
use scrubbot_common::traits::MessagePlatform;

pub use runtime::DiscordCleanRuntime;

/// Largest page the channel-messages endpoint returns.
const HISTORY_PAGE_SIZE: usize = 100;

/// Maps a twilight HTTP error onto the cleaner's taxonomy: 404 means the
/// target is already gone, anything else is a platform failure.
pub fn map_http_error(err: twilight_http::Error, action: &str) -> Error {
    if let ErrorType::Response { status, .. } = err.kind() {
        if status.get() == 404 {
            return Error::NotFound(format!("{action}: {err}"));
        }
    }
    Error::Platform(format!("{action}: {err}"))
}

fn embed_text(embed: &Embed) -> EmbedText {
    EmbedText {
        title: embed.title.clone(),
        description: embed.description.clone(),
        footer_text: embed.footer.as_ref().map(|f| f.text.clone()),
        author_name: embed.author.as_ref().map(|a| a.name.clone()),
        fields: embed
            .fields
            .iter()
            .map(|f| EmbedFieldText {
                name: f.name.clone(),
                value: f.value.clone(),
            })
            .collect(),
    }
}

/// Copies what the cleaner needs out of a gateway/HTTP message.
pub fn clean_message_from(message: &Message) -> CleanMessage {
    CleanMessage {
        id: message.id,
        channel_id: message.channel_id,
        guild_id: message.guild_id,
        author_id: message.author.id,
        author_name: message.author.name.clone(),
        author_bot: message.author.bot,
        content: message.content.clone(),
        embeds: message.embeds.iter().map(embed_text).collect(),
        created_at: snowflake_timestamp(message.id),
    }
}

struct HistoryCursor {
    before: Option<Id<MessageMarker>>,
    /// Ids at or below this are past the lower bound.
    floor: u64,
    remaining: usize,
    done: bool,
}

/// `MessagePlatform` over the Discord REST API.
pub struct TwilightPlatform {
    http: Arc<HttpClient>,
}

impl TwilightPlatform {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    async fn fetch_page(
        &self,
        channel_id: Id<ChannelMarker>,
        before: Option<Id<MessageMarker>>,
        limit: u16,
    ) -> Result<Vec<Message>, Error> {
        let request = self.http.channel_messages(channel_id);
        let response = match before {
            Some(id) => request.before(id).limit(limit).await,
            None => request.limit(limit).await,
        }
        .map_err(|e| map_http_error(e, "fetching channel history"))?;

        response
            .models()
            .await
            .map_err(|e| Error::Platform(format!("decoding channel history: {e}")))
    }
}

#[async_trait]
impl MessagePlatform for TwilightPlatform {
    /// Pages backwards with a `before` cursor so results stay newest first,
    /// stopping at the lower bound instead of asking the API for both ends.
    fn history<'a>(
        &'a self,
        channel_id: Id<ChannelMarker>,
        limit: usize,
        before: Option<DateTime<Utc>>,
        after: Option<DateTime<Utc>>,
    ) -> BoxStream<'a, Result<CleanMessage, Error>> {
        let cursor = HistoryCursor {
            before: before
                .map(|t| snowflake_from_time(t + chrono::Duration::milliseconds(1)))
                .and_then(Id::new_checked),
            floor: after.map(|t| snowflake_from_time(t).saturating_sub(1)).unwrap_or(0),
            remaining: limit,
            done: limit == 0,
        };

        stream::try_unfold(cursor, move |mut cursor| async move {
            if cursor.done {
                return Ok::<_, Error>(None);
            }

            let page_size = cursor.remaining.min(HISTORY_PAGE_SIZE);
            let page = self.fetch_page(channel_id, cursor.before, page_size as u16).await?;
            trace!("History page for {channel_id}: {} messages", page.len());

            if page.len() < page_size {
                cursor.done = true;
            }

            let mut batch = Vec::with_capacity(page.len());
            for message in &page {
                if message.id.get() <= cursor.floor {
                    cursor.done = true;
                    break;
                }
                cursor.before = Some(message.id);
                batch.push(clean_message_from(message));
            }

            cursor.remaining -= batch.len();
            if cursor.remaining == 0 {
                cursor.done = true;
            }

            Ok(Some((batch, cursor)))
        })
        .map_ok(|batch| stream::iter(batch.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }

    async fn text_channels(&self, guild_id: Id<GuildMarker>) -> Result<Vec<Id<ChannelMarker>>, Error> {
        let channels = self
            .http
            .guild_channels(guild_id)
            .await
            .map_err(|e| map_http_error(e, "listing guild channels"))?
            .models()
            .await
            .map_err(|e| Error::Platform(format!("decoding guild channels: {e}")))?;

        Ok(channels
            .into_iter()
            .filter(|c| matches!(c.kind, ChannelType::GuildText | ChannelType::GuildAnnouncement))
            .map(|c| c.id)
            .collect())
    }

    async fn bulk_delete(
        &self,
        channel_id: Id<ChannelMarker>,
        message_ids: &[Id<MessageMarker>],
    ) -> Result<(), Error> {
        match message_ids {
            [] => Ok(()),
            // The bulk endpoint needs at least two ids.
            [single] => self.delete_message(channel_id, *single).await,
            ids => {
                self.http
                    .delete_messages(channel_id, ids)
                    .await
                    .map_err(|e| map_http_error(e, "bulk deleting messages"))?;
                Ok(())
            }
        }
    }

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), Error> {
        self.http
            .delete_message(channel_id, message_id)
            .await
            .map_err(|e| map_http_error(e, "deleting message"))?;
        Ok(())
    }
}
