// File: scrubbot-core/src/modlog/mod.rs

pub mod transcript;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};
use twilight_http::Client as HttpClient;
use twilight_model::id::marker::{ChannelMarker, MessageMarker, UserMarker};
use twilight_model::id::Id;

use crate::Error;
use scrubbot_common::models::{ChannelScope, CleanMessage};
use scrubbot_common::traits::CleanAuditSink;

pub use transcript::FileTranscriptStore;

/// Message ids whose upcoming delete events were caused by a clean and
/// should not be logged one by one.
pub struct DeleteIgnoreList {
    entries: DashMap<Id<MessageMarker>, Instant>,
    ttl: Duration,
}

impl DeleteIgnoreList {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ignore(&self, ids: &[Id<MessageMarker>]) {
        self.prune();
        let now = Instant::now();
        for id in ids {
            self.entries.insert(*id, now);
        }
        debug!("Ignoring delete events for {} messages", ids.len());
    }

    /// Consumes the entry; true if the delete event should be skipped.
    pub fn take(&self, id: Id<MessageMarker>) -> bool {
        self.entries
            .remove(&id)
            .is_some_and(|(_, added)| added.elapsed() <= self.ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&self) {
        self.entries.retain(|_, added| added.elapsed() <= self.ttl);
    }
}

impl Default for DeleteIgnoreList {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}

/// The summary posted to the mod-log channel.
pub fn summary_text(count: usize, scope: &ChannelScope, operator: Id<UserMarker>, reference: &str) -> String {
    format!(
        "**Bulk message delete**\n**{count}** messages deleted in {scope} by <@{operator}>\n\n\
         A log of the deleted messages can be found here: {reference}"
    )
}

/// Stores the transcript through `inner`, then announces it in the mod-log channel.
pub struct ModLogReporter {
    inner: Arc<dyn CleanAuditSink>,
    http: Arc<HttpClient>,
    channel_id: Id<ChannelMarker>,
}

impl ModLogReporter {
    pub fn new(inner: Arc<dyn CleanAuditSink>, http: Arc<HttpClient>, channel_id: Id<ChannelMarker>) -> Self {
        Self { inner, http, channel_id }
    }
}

#[async_trait]
impl CleanAuditSink for ModLogReporter {
    async fn report(
        &self,
        messages: &[CleanMessage],
        operator: Id<UserMarker>,
        scope: &ChannelScope,
    ) -> Result<String, Error> {
        let reference = self.inner.report(messages, operator, scope).await?;
        let text = summary_text(messages.len(), scope, operator, &reference);

        // The transcript is already stored; a failed announcement only loses the notice.
        if let Err(e) = self.http.create_message(self.channel_id).content(&text).await {
            warn!("Failed to post clean summary to mod log {}: {e}", self.channel_id);
        }

        Ok(reference)
    }
}
