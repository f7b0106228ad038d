// File: scrubbot-core/src/clean/age.rs

use chrono::{DateTime, Duration, Utc};
use twilight_model::id::marker::MessageMarker;
use twilight_model::id::Id;

use crate::utils::time::snowflake_from_time;

/// Messages older than this many days cannot go through the bulk-delete endpoint.
pub const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;

/// The oldest snowflake the bulk-delete endpoint still accepts, fixed at
/// the moment it was computed. Build a fresh one for every deletion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkDeleteCutoff {
    min_snowflake: u64,
}

impl BulkDeleteCutoff {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            min_snowflake: snowflake_from_time(now - Duration::days(BULK_DELETE_MAX_AGE_DAYS)),
        }
    }

    /// Compares ids directly; no per-message timestamp parsing.
    pub fn is_bulk_eligible(&self, message_id: Id<MessageMarker>) -> bool {
        message_id.get() >= self.min_snowflake
    }
}
