// File: scrubbot-core/src/clean/deleter.rs

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_model::id::Id;

use crate::clean::age::BulkDeleteCutoff;
use crate::clean::source::ChannelBatches;
use crate::Error;
use scrubbot_common::models::CleanMessage;
use scrubbot_common::traits::MessagePlatform;

/// Most messages one bulk-delete call accepts.
pub const BULK_DELETE_LIMIT: usize = 100;

/// What a deletion pass got done.
#[derive(Debug, Default)]
pub struct DeletionReport {
    /// Messages confirmed gone, in source order.
    pub deleted: Vec<CleanMessage>,
    /// Channels whose remaining work was abandoned, with the reason.
    pub failures: Vec<(Id<ChannelMarker>, Error)>,
    pub cancelled: bool,
}

/// Runs the two-tier deletion: bulk calls while messages are young
/// enough, single deletes from the first too-old message onward.
pub struct Deleter {
    platform: Arc<dyn MessagePlatform>,
}

impl Deleter {
    pub fn new(platform: Arc<dyn MessagePlatform>) -> Self {
        Self { platform }
    }

    /// Deletes every batch, channel by channel.
    ///
    /// A failure other than "not found" ends that channel's work and is
    /// recorded; the next channel still runs. Cancellation returns at once
    /// with what was already deleted.
    pub async fn execute(&self, batches: &ChannelBatches, cancel: &CancellationToken) -> DeletionReport {
        let cutoff = BulkDeleteCutoff::now();
        let mut report = DeletionReport::default();

        for (channel_id, messages) in batches.iter() {
            let before = report.deleted.len();
            let result = self
                .delete_channel(channel_id, messages, cutoff, cancel, &mut report.deleted)
                .await;

            match result {
                Ok(true) => {
                    info!(
                        "Clean cancelled in channel {channel_id} after {} deletions",
                        report.deleted.len() - before
                    );
                    report.cancelled = true;
                    return report;
                }
                Ok(false) => {
                    info!("Deleted {} messages in channel {channel_id}", report.deleted.len() - before);
                }
                Err(e) => {
                    error!("Deletion in channel {channel_id} aborted: {e}");
                    report.failures.push((channel_id, e));
                }
            }
        }

        report
    }

    /// Returns `Ok(true)` if cancelled.
    async fn delete_channel(
        &self,
        channel_id: Id<ChannelMarker>,
        messages: &[CleanMessage],
        cutoff: BulkDeleteCutoff,
        cancel: &CancellationToken,
        deleted: &mut Vec<CleanMessage>,
    ) -> Result<bool, Error> {
        let mut pending: Vec<&CleanMessage> = Vec::with_capacity(BULK_DELETE_LIMIT);
        let mut cut_point = None;

        for (index, message) in messages.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(true);
            }

            if !cutoff.is_bulk_eligible(message.id) {
                debug!("Message {} is too old for bulk deletion; switching to single deletes", message.id);
                cut_point = Some(index);
                break;
            }

            pending.push(message);

            if pending.len() == BULK_DELETE_LIMIT {
                self.flush(channel_id, &mut pending, deleted).await?;
            }
        }

        if cancel.is_cancelled() {
            return Ok(true);
        }
        if !pending.is_empty() {
            self.flush(channel_id, &mut pending, deleted).await?;
        }

        if let Some(index) = cut_point {
            return self.delete_individually(channel_id, &messages[index..], cancel, deleted).await;
        }

        Ok(false)
    }

    async fn flush(
        &self,
        channel_id: Id<ChannelMarker>,
        pending: &mut Vec<&CleanMessage>,
        deleted: &mut Vec<CleanMessage>,
    ) -> Result<(), Error> {
        let ids: Vec<Id<MessageMarker>> = pending.iter().map(|m| m.id).collect();

        match self.platform.bulk_delete(channel_id, &ids).await {
            Ok(()) => deleted.extend(pending.drain(..).cloned()),
            Err(e) if e.is_not_found() => {
                debug!("Bulk delete of {} messages in channel {channel_id} found nothing: {e}", ids.len());
                pending.clear();
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    async fn delete_individually(
        &self,
        channel_id: Id<ChannelMarker>,
        messages: &[CleanMessage],
        cancel: &CancellationToken,
        deleted: &mut Vec<CleanMessage>,
    ) -> Result<bool, Error> {
        for message in messages {
            if cancel.is_cancelled() {
                return Ok(true);
            }
            match self.platform.delete_message(channel_id, message.id).await {
                Ok(()) => deleted.push(message.clone()),
                Err(e) if e.is_not_found() => {
                    debug!("Message {} was already gone", message.id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(false)
    }
}
