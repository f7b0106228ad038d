//! The message cleanup pipeline.
//!
//! A [`CleanRequest`] is validated and admitted by [`CleanupService`],
//! resolved into a [`MessagePredicate`] plus scope, enumerated from the
//! recency cache or channel history, handed to the [`Deleter`], and
//! finally reported to the audit sink.

pub mod age;
pub mod deleter;
pub mod predicate;
pub mod request;
pub mod session;
pub mod source;

pub use age::{BulkDeleteCutoff, BULK_DELETE_MAX_AGE_DAYS};
pub use deleter::{DeletionReport, Deleter, BULK_DELETE_LIMIT};
pub use predicate::{compile_pattern, MessageFilter, MessagePredicate};
pub use request::{CleanContext, CleanRequest, ResolvedClean};
pub use session::{CleanOutcome, CleanRun, CleanState, CleanupService};
pub use source::{collect_from_cache, collect_from_history, ChannelBatches};
