// File: scrubbot-core/tests/test_utils/fake_platform.rs

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use parking_lot::Mutex;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, MessageMarker};
use twilight_model::id::Id;

use scrubbot_common::models::CleanMessage;
use scrubbot_common::traits::MessagePlatform;
use scrubbot_core::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    History(Id<ChannelMarker>),
    TextChannels(Id<GuildMarker>),
    BulkDelete(Id<ChannelMarker>, Vec<Id<MessageMarker>>),
    Delete(Id<ChannelMarker>, Id<MessageMarker>),
}

type Hook = Arc<dyn Fn(usize) + Send + Sync>;

/// In-memory `MessagePlatform` that records every call.
///
/// Histories are stored newest first. Hooks see a running count of history
/// items served or delete calls made, so tests can cancel at a precise point.
#[derive(Default)]
pub struct FakePlatform {
    histories: Mutex<HashMap<Id<ChannelMarker>, Vec<CleanMessage>>>,
    text_channels: Vec<Id<ChannelMarker>>,
    gone: HashSet<Id<MessageMarker>>,
    failing_channels: HashSet<Id<ChannelMarker>>,
    failing_deletes: HashSet<Id<ChannelMarker>>,
    calls: Mutex<Vec<PlatformCall>>,
    history_served: Arc<AtomicUsize>,
    delete_calls: AtomicUsize,
    on_history_item: Mutex<Option<Hook>>,
    on_delete_call: Mutex<Option<Hook>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_history(self, channel_id: Id<ChannelMarker>, messages: Vec<CleanMessage>) -> Self {
        self.histories.lock().insert(channel_id, messages);
        self
    }

    pub fn with_text_channels(mut self, channels: Vec<Id<ChannelMarker>>) -> Self {
        self.text_channels = channels;
        self
    }

    /// Deleting these reports "not found".
    pub fn with_gone(mut self, ids: impl IntoIterator<Item = Id<MessageMarker>>) -> Self {
        self.gone.extend(ids);
        self
    }

    /// Every call touching this channel fails with a platform error.
    pub fn with_failing_channel(mut self, channel_id: Id<ChannelMarker>) -> Self {
        self.failing_channels.insert(channel_id);
        self
    }

    /// History reads work, but deletes in this channel fail.
    pub fn with_failing_deletes(mut self, channel_id: Id<ChannelMarker>) -> Self {
        self.failing_deletes.insert(channel_id);
        self
    }

    pub fn on_history_item(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.on_history_item.lock() = Some(Arc::new(hook));
    }

    pub fn on_delete_call(&self, hook: impl Fn(usize) + Send + Sync + 'static) {
        *self.on_delete_call.lock() = Some(Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().clone()
    }

    pub fn bulk_calls(&self) -> Vec<Vec<Id<MessageMarker>>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::BulkDelete(_, ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    pub fn single_deletes(&self) -> Vec<Id<MessageMarker>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Delete(_, id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn delete_call_count(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().push(call);
    }

    fn fail_if_failing(&self, channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        if self.failing_channels.contains(&channel_id) {
            return Err(Error::Platform(format!("missing access to {channel_id}")));
        }
        Ok(())
    }

    fn fail_if_delete_fails(&self, channel_id: Id<ChannelMarker>) -> Result<(), Error> {
        self.fail_if_failing(channel_id)?;
        if self.failing_deletes.contains(&channel_id) {
            return Err(Error::Platform(format!("missing permissions in {channel_id}")));
        }
        Ok(())
    }

    fn after_delete_call(&self) {
        let count = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let hook = self.on_delete_call.lock().clone();
        if let Some(hook) = hook {
            hook(count);
        }
    }
}

#[async_trait]
impl MessagePlatform for FakePlatform {
    fn history<'a>(
        &'a self,
        channel_id: Id<ChannelMarker>,
        limit: usize,
        before: Option<DateTime<Utc>>,
        after: Option<DateTime<Utc>>,
    ) -> BoxStream<'a, Result<CleanMessage, Error>> {
        self.record(PlatformCall::History(channel_id));
        if let Err(e) = self.fail_if_failing(channel_id) {
            return stream::once(async move { Err(e) }).boxed();
        }

        let messages: Vec<CleanMessage> = self
            .histories
            .lock()
            .get(&channel_id)
            .map(|all| {
                all.iter()
                    .filter(|m| before.is_none_or(|b| m.created_at <= b))
                    .filter(|m| after.is_none_or(|a| m.created_at >= a))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let served = Arc::clone(&self.history_served);
        let hook = self.on_history_item.lock().clone();
        stream::iter(messages)
            .map(move |m| {
                let count = served.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(hook) = &hook {
                    hook(count);
                }
                Ok(m)
            })
            .boxed()
    }

    async fn text_channels(&self, guild_id: Id<GuildMarker>) -> Result<Vec<Id<ChannelMarker>>, Error> {
        self.record(PlatformCall::TextChannels(guild_id));
        Ok(self.text_channels.clone())
    }

    async fn bulk_delete(
        &self,
        channel_id: Id<ChannelMarker>,
        message_ids: &[Id<MessageMarker>],
    ) -> Result<(), Error> {
        self.record(PlatformCall::BulkDelete(channel_id, message_ids.to_vec()));
        self.after_delete_call();
        self.fail_if_delete_fails(channel_id)?;

        if message_ids.iter().all(|id| self.gone.contains(id)) {
            return Err(Error::NotFound(format!("unknown messages in {channel_id}")));
        }
        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: Id<ChannelMarker>,
        message_id: Id<MessageMarker>,
    ) -> Result<(), Error> {
        self.record(PlatformCall::Delete(channel_id, message_id));
        self.after_delete_call();
        self.fail_if_delete_fails(channel_id)?;

        if self.gone.contains(&message_id) {
            return Err(Error::NotFound(format!("unknown message {message_id}")));
        }
        Ok(())
    }
}
