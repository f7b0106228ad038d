use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use twilight_model::id::marker::UserMarker;
use twilight_model::id::Id;
use uuid::Uuid;

use crate::Error;
use scrubbot_common::models::{ChannelScope, CleanMessage};
use scrubbot_common::traits::CleanAuditSink;

#[derive(Serialize)]
struct Transcript<'a> {
    operator: Id<UserMarker>,
    scope: &'a ChannelScope,
    scope_text: String,
    logged_at: DateTime<Utc>,
    count: usize,
    messages: &'a [CleanMessage],
}

/// Writes each clean's deleted messages to a JSON file and hands back its path.
pub struct FileTranscriptStore {
    dir: PathBuf,
}

impl FileTranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CleanAuditSink for FileTranscriptStore {
    async fn report(
        &self,
        messages: &[CleanMessage],
        operator: Id<UserMarker>,
        scope: &ChannelScope,
    ) -> Result<String, Error> {
        let logged_at = Utc::now();
        let transcript = Transcript {
            operator,
            scope,
            scope_text: scope.to_string(),
            logged_at,
            count: messages.len(),
            messages,
        };
        let body = serde_json::to_vec_pretty(&transcript)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!(
            "clean-{}-{}.json",
            logged_at.format("%Y%m%dT%H%M%S"),
            Uuid::new_v4().simple()
        );
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, body).await?;

        info!("Wrote clean transcript of {} messages to {}", messages.len(), path.display());
        Ok(path.display().to_string())
    }
}
