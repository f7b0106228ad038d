// File: scrubbot-core/src/clean/session.rs

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use twilight_model::id::marker::{ChannelMarker, UserMarker};
use twilight_model::id::Id;
use uuid::Uuid;

use crate::cache::RecencyCache;
use crate::clean::deleter::Deleter;
use crate::clean::request::{CleanContext, CleanRequest, ResolvedClean};
use crate::clean::source::{self, ChannelBatches};
use crate::modlog::DeleteIgnoreList;
use crate::Error;
use scrubbot_common::models::{ChannelScope, CleanMessage};
use scrubbot_common::traits::{CleanAuditSink, MessagePlatform};

/// Where the running clean currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanState {
    Idle,
    Validating,
    Enumerating,
    Deleting,
    Reporting,
}

/// How a clean ended.
#[derive(Debug)]
pub enum CleanOutcome {
    Completed {
        /// Chronological.
        deleted: Vec<CleanMessage>,
        log_reference: Option<String>,
        failures: Vec<(Id<ChannelMarker>, Error)>,
    },
    NothingMatched,
    Cancelled {
        /// Chronological; empty if the clean was stopped before deleting.
        deleted: Vec<CleanMessage>,
        log_reference: Option<String>,
    },
}

#[derive(Debug)]
struct ActiveClean {
    id: Uuid,
    operator: Id<UserMarker>,
    started_at: DateTime<Utc>,
    state: CleanState,
    cancel: CancellationToken,
}

type ActiveSlot = Arc<Mutex<Option<ActiveClean>>>;

/// Frees the single-flight slot when dropped, however the run ends.
struct CleanGuard {
    slot: ActiveSlot,
    id: Uuid,
}

impl CleanGuard {
    fn set_state(&self, state: CleanState) {
        if let Some(active) = self.slot.lock().as_mut().filter(|a| a.id == self.id) {
            debug!("Clean {} => {:?}", self.id, state);
            active.state = state;
        }
    }
}

impl Drop for CleanGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|a| a.id == self.id) {
            *slot = None;
        }
    }
}

/// Runs cleans, one at a time per process.
pub struct CleanupService {
    platform: Arc<dyn MessagePlatform>,
    cache: Arc<RecencyCache>,
    audit: Arc<dyn CleanAuditSink>,
    ignore: Arc<DeleteIgnoreList>,
    message_limit: usize,
    active: ActiveSlot,
}

impl CleanupService {
    pub fn new(
        platform: Arc<dyn MessagePlatform>,
        cache: Arc<RecencyCache>,
        audit: Arc<dyn CleanAuditSink>,
        ignore: Arc<DeleteIgnoreList>,
        message_limit: usize,
    ) -> Self {
        Self {
            platform,
            cache,
            audit,
            ignore,
            message_limit,
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Validates the request and claims the single-flight slot.
    ///
    /// Fails with `Error::Validation` or `Error::CleanInProgress`; in both
    /// cases nothing changes, including any clean already running.
    pub fn begin(self: &Arc<Self>, request: CleanRequest, context: CleanContext) -> Result<CleanRun, Error> {
        request.validate(self.message_limit)?;

        if request.channels == Some(ChannelScope::All) && !request.use_cache && context.guild_id.is_none() {
            return Err(Error::Validation("All channels can only be cleaned inside a server.".into()));
        }

        let mut slot = self.active.lock();
        if let Some(running) = slot.as_ref() {
            warn!(
                "Rejected clean from {}: clean {} by {} running since {}",
                context.operator, running.id, running.operator, running.started_at
            );
            return Err(Error::CleanInProgress);
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *slot = Some(ActiveClean {
            id,
            operator: context.operator,
            started_at: Utc::now(),
            state: CleanState::Validating,
            cancel: cancel.clone(),
        });
        info!("Clean {id} started by {} in channel {}", context.operator, context.channel_id);

        Ok(CleanRun {
            service: Arc::clone(self),
            request,
            context,
            cancel,
            guard: CleanGuard { slot: Arc::clone(&self.active), id },
        })
    }

    /// `begin` followed by `execute`.
    pub async fn clean(self: &Arc<Self>, request: CleanRequest, context: CleanContext) -> Result<CleanOutcome, Error> {
        self.begin(request, context)?.execute().await
    }

    /// Flags the running clean to stop at its next checkpoint.
    /// Returns false if nothing was running.
    pub fn cancel(&self) -> bool {
        match self.active.lock().as_ref() {
            Some(active) => {
                info!("Cancelling clean {}", active.id);
                active.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    pub fn state(&self) -> CleanState {
        self.active.lock().as_ref().map_or(CleanState::Idle, |a| a.state)
    }
}

/// An admitted clean that has not run yet. Holds the single-flight slot.
pub struct CleanRun {
    service: Arc<CleanupService>,
    request: CleanRequest,
    context: CleanContext,
    cancel: CancellationToken,
    guard: CleanGuard,
}

impl fmt::Debug for CleanRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanRun")
            .field("id", &self.guard.id)
            .field("operator", &self.context.operator)
            .field("channel_id", &self.context.channel_id)
            .finish()
    }
}

impl CleanRun {
    pub fn id(&self) -> Uuid {
        self.guard.id
    }

    pub async fn execute(self) -> Result<CleanOutcome, Error> {
        let resolved = self.request.resolve(self.context.channel_id, Utc::now());
        info!(
            "Clean {} resolved: scope={}, traverse={}, lower={:?}, upper={:?}, cache={}",
            self.guard.id,
            resolved.scope,
            resolved.traverse,
            resolved.lower,
            resolved.upper,
            resolved.reads_cache()
        );

        self.guard.set_state(CleanState::Enumerating);
        let batches = self.enumerate(&resolved).await?;

        if self.cancel.is_cancelled() {
            info!("Clean {} cancelled before deleting anything", self.guard.id);
            return Ok(CleanOutcome::Cancelled { deleted: Vec::new(), log_reference: None });
        }
        info!("Clean {} matched {} messages", self.guard.id, batches.len());

        self.service.ignore.ignore(batches.ids());

        self.guard.set_state(CleanState::Deleting);
        let report = Deleter::new(Arc::clone(&self.service.platform))
            .execute(&batches, &self.cancel)
            .await;

        self.guard.set_state(CleanState::Reporting);
        let mut deleted = report.deleted;
        let mut failures = report.failures;
        deleted.sort_by_key(|m| m.id);

        if deleted.is_empty() {
            if report.cancelled {
                return Ok(CleanOutcome::Cancelled { deleted, log_reference: None });
            }
            if !failures.is_empty() {
                let (channel_id, err) = failures.remove(0);
                warn!("Clean {} deleted nothing; first failure in channel {channel_id}", self.guard.id);
                return Err(err);
            }
            return Ok(CleanOutcome::NothingMatched);
        }

        let log_reference = self.report(&deleted, &resolved.scope).await;

        if report.cancelled {
            Ok(CleanOutcome::Cancelled { deleted, log_reference })
        } else {
            Ok(CleanOutcome::Completed { deleted, log_reference, failures })
        }
    }

    async fn enumerate(&self, resolved: &ResolvedClean) -> Result<ChannelBatches, Error> {
        if resolved.reads_cache() {
            let recent = self.service.cache.recent(resolved.traverse);
            return Ok(source::collect_from_cache(
                recent,
                resolved.traverse,
                &resolved.predicate,
                &self.cancel,
            ));
        }

        let channels = match &resolved.scope {
            ChannelScope::Channels(ids) => ids.clone(),
            ChannelScope::All => {
                let guild_id = self.context.guild_id.ok_or_else(|| {
                    Error::Validation("All channels can only be cleaned inside a server.".into())
                })?;
                self.service.platform.text_channels(guild_id).await?
            }
        };

        source::collect_from_history(
            self.service.platform.as_ref(),
            &channels,
            resolved.traverse,
            &resolved.predicate,
            &self.cancel,
            resolved.upper,
            resolved.lower,
        )
        .await
    }

    /// Audit failures are logged and otherwise ignored; the deletions stand.
    async fn report(&self, deleted: &[CleanMessage], scope: &ChannelScope) -> Option<String> {
        match self.service.audit.report(deleted, self.context.operator, scope).await {
            Ok(reference) => {
                info!("Clean {} logged {} messages at {reference}", self.guard.id, deleted.len());
                Some(reference)
            }
            Err(e) => {
                warn!("Clean {} could not be logged: {e}", self.guard.id);
                None
            }
        }
    }
}
