// File: scrubbot-core/src/clean/source.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_model::id::Id;

use crate::clean::predicate::MessagePredicate;
use crate::Error;
use scrubbot_common::models::CleanMessage;
use scrubbot_common::traits::MessagePlatform;

/// Matched messages grouped by channel.
///
/// Channels keep the order in which they were first seen, and messages
/// keep source order within their channel. `ids` is the flat list of
/// every matched id, in match order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelBatches {
    channels: Vec<(Id<ChannelMarker>, Vec<CleanMessage>)>,
    index: HashMap<Id<ChannelMarker>, usize>,
    ids: Vec<Id<MessageMarker>>,
}

impl ChannelBatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: CleanMessage) {
        self.ids.push(message.id);
        match self.index.get(&message.channel_id) {
            Some(&i) => self.channels[i].1.push(message),
            None => {
                self.index.insert(message.channel_id, self.channels.len());
                self.channels.push((message.channel_id, vec![message]));
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[Id<MessageMarker>] {
        &self.ids
    }

    pub fn channel(&self, channel_id: Id<ChannelMarker>) -> Option<&[CleanMessage]> {
        self.index.get(&channel_id).map(|&i| self.channels[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<ChannelMarker>, &[CleanMessage])> {
        self.channels.iter().map(|(id, msgs)| (*id, msgs.as_slice()))
    }
}

/// Scans messages already held in memory, newest first.
///
/// A cancellation stops the scan but keeps what was matched so far.
pub fn collect_from_cache<I>(
    messages: I,
    traverse: usize,
    predicate: &MessagePredicate,
    cancel: &CancellationToken,
) -> ChannelBatches
where
    I: IntoIterator<Item = CleanMessage>,
{
    let mut found = ChannelBatches::new();

    for message in messages.into_iter().take(traverse) {
        if cancel.is_cancelled() {
            debug!("Cache scan cancelled after {} matches", found.len());
            return found;
        }
        if predicate.matches(&message) {
            found.push(message);
        }
    }

    found
}

/// Walks each channel's history in turn, newest first.
///
/// A cancellation discards everything matched in this call: nothing has
/// been deleted yet, so the scan can simply be run again.
pub async fn collect_from_history(
    platform: &dyn MessagePlatform,
    channels: &[Id<ChannelMarker>],
    traverse: usize,
    predicate: &MessagePredicate,
    cancel: &CancellationToken,
    before: Option<DateTime<Utc>>,
    after: Option<DateTime<Utc>>,
) -> Result<ChannelBatches, Error> {
    let mut found = ChannelBatches::new();

    for &channel_id in channels {
        let mut history = platform.history(channel_id, traverse, before, after);
        let mut scanned = 0usize;

        loop {
            // Before every pull: a pull may start a page fetch.
            if cancel.is_cancelled() {
                info!("History scan cancelled in channel {channel_id}; discarding matches");
                return Ok(ChannelBatches::new());
            }
            let Some(item) = history.next().await else {
                break;
            };
            let message = item?;
            scanned += 1;
            if predicate.matches(&message) {
                found.push(message);
            }
        }

        debug!(
            "Scanned {scanned} messages in channel {channel_id}, {} total matches",
            found.len()
        );
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn msg(id: u64, channel: u64) -> CleanMessage {
        CleanMessage {
            id: Id::new(id),
            channel_id: Id::new(channel),
            guild_id: None,
            author_id: Id::new(1),
            author_name: "someone".into(),
            author_bot: false,
            content: String::new(),
            embeds: Vec::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn batches_group_by_channel_in_first_seen_order() {
        let mut b = ChannelBatches::new();
        b.push(msg(5, 200));
        b.push(msg(4, 100));
        b.push(msg(3, 200));

        let order: Vec<_> = b.iter().map(|(c, m)| (c.get(), m.len())).collect();
        assert_eq!(order, vec![(200, 2), (100, 1)]);
        assert_eq!(b.ids().iter().map(|i| i.get()).collect::<Vec<_>>(), vec![5, 4, 3]);
        assert_eq!(b.channel(Id::new(200)).unwrap()[1].id.get(), 3);
    }

    #[test]
    fn cache_scan_respects_traverse() {
        let cache: Vec<_> = (1..=10).rev().map(|i| msg(i, 1)).collect();
        let token = CancellationToken::new();
        let found = collect_from_cache(cache, 4, &MessagePredicate::default(), &token);
        assert_eq!(found.ids().iter().map(|i| i.get()).collect::<Vec<_>>(), vec![10, 9, 8, 7]);
    }

    #[test]
    fn cancelled_cache_scan_keeps_partial_matches() {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let cache = (1..=10u64).rev().map(move |i| {
            if i == 7 {
                cancel.cancel();
            }
            msg(i, 1)
        });

        let found = collect_from_cache(cache, 10, &MessagePredicate::default(), &token);
        assert_eq!(found.ids().iter().map(|i| i.get()).collect::<Vec<_>>(), vec![10, 9, 8]);
    }
}
