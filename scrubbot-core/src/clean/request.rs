// File: scrubbot-core/src/clean/request.rs

use chrono::{DateTime, Utc};
use regex::Regex;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::id::Id;

use crate::clean::predicate::MessagePredicate;
use crate::utils::time::snowflake_timestamp;
use crate::Error;
use scrubbot_common::models::{ChannelScope, CleanLimit};

/// The criteria of one clean, as given by the moderator.
#[derive(Debug, Clone)]
pub struct CleanRequest {
    /// Messages to look at per channel (or in the cache).
    pub traverse: usize,
    /// `None` means the invoking channel, or a message limit's channel.
    pub channels: Option<ChannelScope>,
    pub bots_only: bool,
    pub users: Vec<Id<UserMarker>>,
    pub pattern: Option<Regex>,
    pub first_limit: Option<CleanLimit>,
    pub second_limit: Option<CleanLimit>,
    /// Only honoured for `ChannelScope::All`; explicit channels always read history.
    pub use_cache: bool,
}

impl CleanRequest {
    pub fn new(traverse: usize) -> Self {
        Self {
            traverse,
            channels: None,
            bots_only: false,
            users: Vec::new(),
            pattern: None,
            first_limit: None,
            second_limit: None,
            use_cache: false,
        }
    }

    /// Rejects contradictory combinations. Nothing is touched on failure.
    pub fn validate(&self, message_limit: usize) -> Result<(), Error> {
        if self.traverse > message_limit {
            return Err(Error::Validation(format!(
                "Cannot traverse more than {message_limit} messages."
            )));
        }

        let first_channel = self.first_limit.as_ref().and_then(CleanLimit::message_channel);
        let second_channel = self.second_limit.as_ref().and_then(CleanLimit::message_channel);

        if (first_channel.is_some() || second_channel.is_some()) && self.has_explicit_channels() {
            return Err(Error::Validation("Both a message limit and channels specified.".into()));
        }

        if let (Some(a), Some(b)) = (first_channel, second_channel) {
            if a != b {
                return Err(Error::Validation("Message limits are in different channels.".into()));
            }
        }

        if self.bots_only && !self.users.is_empty() {
            return Err(Error::Validation("Marked as bots only, but users were specified.".into()));
        }

        if self.second_limit.is_some() && self.first_limit.is_none() {
            return Err(Error::Validation("Second limit specified without the first.".into()));
        }

        Ok(())
    }

    fn has_explicit_channels(&self) -> bool {
        match &self.channels {
            Some(ChannelScope::All) => true,
            Some(ChannelScope::Channels(ids)) => !ids.is_empty(),
            None => false,
        }
    }

    /// Pins the scope and turns both limits into ordered timestamps.
    pub fn resolve(&self, invoked_in: Id<ChannelMarker>, now: DateTime<Utc>) -> ResolvedClean {
        let scope = match &self.channels {
            Some(ChannelScope::Channels(ids)) if !ids.is_empty() => ChannelScope::Channels(ids.clone()),
            Some(ChannelScope::All) => ChannelScope::All,
            _ => {
                let pinned = self
                    .first_limit
                    .as_ref()
                    .and_then(CleanLimit::message_channel)
                    .or_else(|| self.second_limit.as_ref().and_then(CleanLimit::message_channel))
                    .unwrap_or(invoked_in);
                ChannelScope::Channels(vec![pinned])
            }
        };

        let mut lower = self.first_limit.as_ref().map(|l| limit_time(l, now));
        let mut upper = self.second_limit.as_ref().map(|l| limit_time(l, now));
        if let (Some(a), Some(b)) = (lower, upper) {
            if a > b {
                lower = Some(b);
                upper = Some(a);
            }
        }

        ResolvedClean {
            traverse: self.traverse,
            scope,
            lower,
            upper,
            use_cache: self.use_cache,
            predicate: MessagePredicate::build(
                self.bots_only,
                &self.users,
                self.pattern.clone(),
                lower,
                upper,
            ),
        }
    }
}

fn limit_time(limit: &CleanLimit, now: DateTime<Utc>) -> DateTime<Utc> {
    match limit {
        CleanLimit::Message { message_id, .. } => snowflake_timestamp(*message_id),
        CleanLimit::Age(age) => now - *age,
        CleanLimit::Timestamp(t) => *t,
    }
}

/// A validated request with concrete scope and bounds, `lower <= upper`.
#[derive(Debug, Clone)]
pub struct ResolvedClean {
    pub traverse: usize,
    pub scope: ChannelScope,
    pub lower: Option<DateTime<Utc>>,
    pub upper: Option<DateTime<Utc>>,
    pub use_cache: bool,
    pub predicate: MessagePredicate,
}

impl ResolvedClean {
    pub fn reads_cache(&self) -> bool {
        self.use_cache && self.scope.is_all()
    }
}

/// Who asked for the clean, and from where.
#[derive(Debug, Clone, Copy)]
pub struct CleanContext {
    pub operator: Id<UserMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub guild_id: Option<Id<GuildMarker>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::snowflake_from_time;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn message_limit(channel: u64, at: DateTime<Utc>) -> CleanLimit {
        CleanLimit::Message {
            channel_id: Id::new(channel),
            message_id: Id::new(snowflake_from_time(at) | 7),
        }
    }

    fn validation_message(req: &CleanRequest) -> String {
        match req.validate(10_000) {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn default_request_is_valid() {
        assert!(CleanRequest::new(10).validate(10_000).is_ok());
    }

    #[test]
    fn traverse_is_capped() {
        let req = CleanRequest::new(10_001);
        assert_eq!(validation_message(&req), "Cannot traverse more than 10000 messages.");
    }

    #[test]
    fn message_limit_excludes_channels() {
        let mut req = CleanRequest::new(10);
        req.first_limit = Some(message_limit(5, now()));
        req.channels = Some(ChannelScope::Channels(vec![Id::new(6)]));
        assert_eq!(validation_message(&req), "Both a message limit and channels specified.");

        req.channels = Some(ChannelScope::All);
        assert_eq!(validation_message(&req), "Both a message limit and channels specified.");

        req.first_limit = Some(CleanLimit::Age(Duration::hours(1)));
        req.second_limit = Some(message_limit(5, now()));
        assert_eq!(validation_message(&req), "Both a message limit and channels specified.");
    }

    #[test]
    fn message_limits_share_a_channel() {
        let mut req = CleanRequest::new(10);
        req.first_limit = Some(message_limit(5, now()));
        req.second_limit = Some(message_limit(6, now()));
        assert_eq!(validation_message(&req), "Message limits are in different channels.");

        req.second_limit = Some(message_limit(5, now() - Duration::hours(1)));
        assert!(req.validate(10_000).is_ok());
    }

    #[test]
    fn bots_only_excludes_users() {
        let mut req = CleanRequest::new(10);
        req.bots_only = true;
        req.users = vec![Id::new(3)];
        assert_eq!(validation_message(&req), "Marked as bots only, but users were specified.");
    }

    #[test]
    fn second_limit_needs_first() {
        let mut req = CleanRequest::new(10);
        req.second_limit = Some(CleanLimit::Timestamp(now()));
        assert_eq!(validation_message(&req), "Second limit specified without the first.");
    }

    #[test]
    fn scope_defaults_to_invoking_channel() {
        let resolved = CleanRequest::new(10).resolve(Id::new(42), now());
        assert_eq!(resolved.scope, ChannelScope::Channels(vec![Id::new(42)]));
        assert!(resolved.lower.is_none() && resolved.upper.is_none());
    }

    #[test]
    fn message_limit_pins_scope_and_time() {
        let at = now() - Duration::hours(3);
        let mut req = CleanRequest::new(10);
        req.first_limit = Some(message_limit(77, at));

        let resolved = req.resolve(Id::new(42), now());
        assert_eq!(resolved.scope, ChannelScope::Channels(vec![Id::new(77)]));
        assert_eq!(resolved.lower, Some(at));
        assert_eq!(resolved.upper, None);
    }

    #[test]
    fn second_message_limit_also_pins_scope() {
        let mut req = CleanRequest::new(10);
        req.first_limit = Some(CleanLimit::Age(Duration::days(1)));
        req.second_limit = Some(message_limit(88, now()));
        let resolved = req.resolve(Id::new(42), now());
        assert_eq!(resolved.scope, ChannelScope::Channels(vec![Id::new(88)]));
    }

    #[test]
    fn bounds_are_swapped_into_order() {
        let early = now() - Duration::days(2);
        let mut req = CleanRequest::new(10);
        req.first_limit = Some(CleanLimit::Timestamp(now()));
        req.second_limit = Some(CleanLimit::Timestamp(early));

        let resolved = req.resolve(Id::new(1), now());
        assert_eq!(resolved.lower, Some(early));
        assert_eq!(resolved.upper, Some(now()));
    }

    #[test]
    fn age_is_relative_to_now() {
        let mut req = CleanRequest::new(10);
        req.first_limit = Some(CleanLimit::Age(Duration::minutes(30)));
        let resolved = req.resolve(Id::new(1), now());
        assert_eq!(resolved.lower, Some(now() - Duration::minutes(30)));
    }

    #[test]
    fn cache_only_applies_to_all_channels() {
        let mut req = CleanRequest::new(10);
        req.use_cache = true;
        assert!(!req.resolve(Id::new(1), now()).reads_cache());

        req.channels = Some(ChannelScope::All);
        assert!(req.resolve(Id::new(1), now()).reads_cache());
    }
}
