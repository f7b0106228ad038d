// File: src/cache/message_cache.rs

use std::collections::{HashSet, VecDeque};

use parking_lot::RwLock;
use twilight_model::id::marker::MessageMarker;
use twilight_model::id::Id;

use scrubbot_common::models::{CleanMessage, EmbedText};

/// Recently seen messages across all channels, newest first.
///
/// Fed from the gateway. Once `capacity` is reached the oldest entry is dropped.
pub struct RecencyCache {
    messages: RwLock<VecDeque<CleanMessage>>,
    capacity: usize,
}

impl RecencyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    pub fn insert(&self, message: CleanMessage) {
        if self.capacity == 0 {
            return;
        }
        let mut messages = self.messages.write();
        messages.push_front(message);
        messages.truncate(self.capacity);
    }

    /// Drops the given ids, e.g. after a delete event.
    pub fn remove(&self, ids: &[Id<MessageMarker>]) {
        if ids.is_empty() {
            return;
        }
        let ids: HashSet<_> = ids.iter().copied().collect();
        self.messages.write().retain(|m| !ids.contains(&m.id));
    }

    /// Applies an edit to a cached message. Returns false if it is not cached.
    pub fn update(&self, id: Id<MessageMarker>, content: String, embeds: Vec<EmbedText>) -> bool {
        let mut messages = self.messages.write();
        match messages.iter_mut().find(|m| m.id == id) {
            Some(cached) => {
                cached.content = content;
                cached.embeds = embeds;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the `limit` most recent messages, newest first.
    pub fn recent(&self, limit: usize) -> Vec<CleanMessage> {
        self.messages.read().iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(id: u64) -> CleanMessage {
        CleanMessage {
            id: Id::new(id),
            channel_id: Id::new(1),
            guild_id: None,
            author_id: Id::new(2),
            author_name: "someone".into(),
            author_bot: false,
            content: format!("message {id}"),
            embeds: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn ids(messages: &[CleanMessage]) -> Vec<u64> {
        messages.iter().map(|m| m.id.get()).collect()
    }

    #[test]
    fn newest_first() {
        let cache = RecencyCache::new(10);
        for i in 1..=3 {
            cache.insert(msg(i));
        }
        assert_eq!(ids(&cache.recent(10)), vec![3, 2, 1]);
        assert_eq!(ids(&cache.recent(2)), vec![3, 2]);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let cache = RecencyCache::new(2);
        for i in 1..=5 {
            cache.insert(msg(i));
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(ids(&cache.recent(10)), vec![5, 4]);
    }

    #[test]
    fn remove_drops_deleted_messages() {
        let cache = RecencyCache::new(10);
        for i in 1..=4 {
            cache.insert(msg(i));
        }
        cache.remove(&[Id::new(2), Id::new(4), Id::new(99)]);
        assert_eq!(ids(&cache.recent(10)), vec![3, 1]);
    }

    #[test]
    fn update_replaces_text_in_place() {
        let cache = RecencyCache::new(10);
        for i in 1..=3 {
            cache.insert(msg(i));
        }
        let embed = EmbedText {
            title: Some("Free prizes".into()),
            ..EmbedText::default()
        };

        assert!(cache.update(Id::new(2), "spam link".into(), vec![embed.clone()]));
        assert!(!cache.update(Id::new(99), "ignored".into(), Vec::new()));

        let recent = cache.recent(10);
        assert_eq!(ids(&recent), vec![3, 2, 1]);
        assert_eq!(recent[1].content, "spam link");
        assert_eq!(recent[1].embeds, vec![embed]);
        assert!(recent[1].searchable_text().contains("Free prizes"));
        assert_eq!(recent[0].content, "message 3");
    }

    #[test]
    fn zero_capacity_holds_nothing() {
        let cache = RecencyCache::new(0);
        cache.insert(msg(1));
        assert!(cache.is_empty());
    }
}
