// File: scrubbot-core/src/clean/predicate.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;

use crate::Error;
use scrubbot_common::models::CleanMessage;

/// Compiles a clean pattern the way moderators expect it to behave:
/// case-insensitive, with `.` also matching newlines.
pub fn compile_pattern(pattern: &str) -> Result<Regex, Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|e| Error::Validation(format!("Regex error: {e}")))
}

/// A single test a message must pass to be cleaned.
#[derive(Debug, Clone)]
pub enum MessageFilter {
    BotsOnly,
    Authors(HashSet<Id<UserMarker>>),
    /// Searched anywhere in the body and embed text.
    Pattern(Regex),
    /// Inclusive on both ends.
    Range {
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    },
    /// Created at or after the bound.
    After(DateTime<Utc>),
}

impl MessageFilter {
    pub fn matches(&self, message: &CleanMessage) -> bool {
        match self {
            MessageFilter::BotsOnly => message.author_bot,
            MessageFilter::Authors(ids) => ids.contains(&message.author_id),
            MessageFilter::Pattern(re) => re.is_match(&message.searchable_text()),
            MessageFilter::Range { lower, upper } => {
                *lower <= message.created_at && message.created_at <= *upper
            }
            MessageFilter::After(lower) => message.created_at >= *lower,
        }
    }
}

/// Logical AND of filters, evaluated in a fixed order:
/// bots, authors, pattern, then the time test.
///
/// With no filters every message matches.
#[derive(Debug, Clone, Default)]
pub struct MessagePredicate {
    filters: Vec<MessageFilter>,
}

impl MessagePredicate {
    /// `upper` only takes effect together with `lower`; callers are
    /// expected to have sorted the bounds already.
    pub fn build(
        bots_only: bool,
        authors: &[Id<UserMarker>],
        pattern: Option<Regex>,
        lower: Option<DateTime<Utc>>,
        upper: Option<DateTime<Utc>>,
    ) -> Self {
        let mut filters = Vec::new();

        if bots_only {
            filters.push(MessageFilter::BotsOnly);
        }
        if !authors.is_empty() {
            filters.push(MessageFilter::Authors(authors.iter().copied().collect()));
        }
        if let Some(re) = pattern {
            filters.push(MessageFilter::Pattern(re));
        }
        match (lower, upper) {
            (Some(lower), Some(upper)) => filters.push(MessageFilter::Range { lower, upper }),
            (Some(lower), None) => filters.push(MessageFilter::After(lower)),
            _ => {}
        }

        Self { filters }
    }

    pub fn filters(&self) -> &[MessageFilter] {
        &self.filters
    }

    pub fn matches(&self, message: &CleanMessage) -> bool {
        self.filters.iter().all(|f| f.matches(message))
    }
}
