// File: scrubbot-core/src/services/discord/clean_handler.rs

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use twilight_http::request::channel::reaction::RequestReactionType;
use twilight_http::Client as HttpClient;
use twilight_model::channel::Message;
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_model::id::Id;

use crate::cache::RecencyCache;
use crate::clean::{CleanContext, CleanOutcome, CleanupService};
use crate::config::CleanConfig;
use crate::modlog::DeleteIgnoreList;
use crate::platforms::discord::map_http_error;
use crate::services::discord::clean_commands::{CleanCommand, CLEAN_HELP};
use crate::Error;

const SUCCESS_EMOJI: &str = "✅";

pub const IN_PROGRESS_NOTICE: &str = ":x: Please wait for the currently ongoing clean operation to complete.";
pub const NOTHING_MATCHED_NOTICE: &str = ":x: No matching messages could be found.";
pub const INTERRUPTED_NOTICE: &str = "✅ Clean interrupted.";
pub const NOT_CLEANING_NOTICE: &str = ":question: There's no cleaning going on.";

/// What to tell the invoker once a clean has run.
#[derive(Debug, PartialEq, Eq)]
pub enum CleanReply {
    Say(String),
    React,
    Nothing,
}

pub fn error_notice(err: &Error) -> String {
    match err {
        Error::CleanInProgress => IN_PROGRESS_NOTICE.to_string(),
        other => format!(":x: {other}"),
    }
}

/// Admitted cleans and `stop` remove the invoking message unless it was
/// sent in a moderation channel. Help and rejected commands leave it.
pub fn removes_invocation(command: &CleanCommand, in_mod_channel: bool) -> bool {
    match command {
        CleanCommand::Clean(_) | CleanCommand::Stop => !in_mod_channel,
        CleanCommand::Help => false,
    }
}

/// Moderation channels get a reaction once the clean is logged; elsewhere a
/// summary is only sent when no mod-log channel carries one.
pub fn outcome_reply(outcome: &CleanOutcome, in_mod_channel: bool, has_mod_log: bool) -> CleanReply {
    match outcome {
        CleanOutcome::NothingMatched => CleanReply::Say(NOTHING_MATCHED_NOTICE.to_string()),
        // `stop` already answered.
        CleanOutcome::Cancelled { .. } => CleanReply::Nothing,
        CleanOutcome::Completed { deleted, log_reference, failures } => {
            let mut text = String::new();
            if !failures.is_empty() {
                let channels: Vec<String> = failures.iter().map(|(ch, _)| format!("<#{ch}>")).collect();
                text = format!(":warning: Could not finish cleaning {}.", channels.join(", "));
            }

            if in_mod_channel && log_reference.is_some() && text.is_empty() {
                return CleanReply::React;
            }
            if !has_mod_log || log_reference.is_none() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(&format!("{SUCCESS_EMOJI} Deleted **{}** messages.", deleted.len()));
                if let Some(reference) = log_reference {
                    text.push_str(&format!(" Log: {reference}"));
                }
            }

            if text.is_empty() { CleanReply::Nothing } else { CleanReply::Say(text) }
        }
    }
}

/// Runs parsed clean commands against the service and answers in Discord.
pub struct CleanCommandHandler {
    service: Arc<CleanupService>,
    http: Arc<HttpClient>,
    cache: Arc<RecencyCache>,
    ignore: Arc<DeleteIgnoreList>,
    config: Arc<CleanConfig>,
}

impl CleanCommandHandler {
    pub fn new(
        service: Arc<CleanupService>,
        http: Arc<HttpClient>,
        cache: Arc<RecencyCache>,
        ignore: Arc<DeleteIgnoreList>,
        config: Arc<CleanConfig>,
    ) -> Self {
        Self { service, http, cache, ignore, config }
    }

    pub async fn handle(&self, invocation: Message, command: Result<CleanCommand, Error>) {
        let in_mod_channel = self.config.is_mod_channel(invocation.channel_id);

        let command = match command {
            Ok(command) => command,
            Err(e) => {
                self.reply(invocation.channel_id, &error_notice(&e), in_mod_channel).await;
                return;
            }
        };
        let remove_invocation = removes_invocation(&command, in_mod_channel);

        let args = match command {
            CleanCommand::Clean(args) => args,
            CleanCommand::Help => {
                self.reply(invocation.channel_id, CLEAN_HELP, in_mod_channel).await;
                return;
            }
            CleanCommand::Stop => {
                let notice = if self.service.cancel() { INTERRUPTED_NOTICE } else { NOT_CLEANING_NOTICE };
                self.reply(invocation.channel_id, notice, in_mod_channel).await;
                if remove_invocation {
                    self.delete_invocation(invocation.channel_id, invocation.id).await;
                }
                return;
            }
        };

        let context = CleanContext {
            operator: invocation.author.id,
            channel_id: invocation.channel_id,
            guild_id: invocation.guild_id,
        };
        let run = match self.service.begin(args.into_request(&self.config), context) {
            Ok(run) => run,
            Err(e) => {
                self.reply(invocation.channel_id, &error_notice(&e), in_mod_channel).await;
                return;
            }
        };

        if remove_invocation {
            self.delete_invocation(invocation.channel_id, invocation.id).await;
        }

        let clean_id = run.id();
        match run.execute().await {
            Ok(outcome) => {
                if let CleanOutcome::Completed { deleted, .. } | CleanOutcome::Cancelled { deleted, .. } = &outcome {
                    info!("Clean {clean_id} removed {} messages", deleted.len());
                }
                let has_mod_log = self.config.mod_log_channel.is_some();
                match outcome_reply(&outcome, in_mod_channel, has_mod_log) {
                    CleanReply::Say(text) => self.reply(invocation.channel_id, &text, in_mod_channel).await,
                    CleanReply::React => self.react(invocation.channel_id, invocation.id).await,
                    CleanReply::Nothing => {}
                }
            }
            Err(e) => {
                error!("Clean {clean_id} failed: {e}");
                self.reply(invocation.channel_id, &error_notice(&e), in_mod_channel).await;
            }
        }
    }

    /// Sends `text`; outside moderation channels the reply removes itself
    /// after the configured delay.
    async fn reply(&self, channel_id: Id<ChannelMarker>, text: &str, persistent: bool) {
        let sent = match self.http.create_message(channel_id).content(text).await {
            Ok(resp) => resp.model().await,
            Err(e) => {
                warn!("Could not reply in {channel_id}: {e}");
                return;
            }
        };
        let message = match sent {
            Ok(message) => message,
            Err(e) => {
                warn!("Could not read reply in {channel_id}: {e}");
                return;
            }
        };
        if persistent {
            return;
        }

        let http = Arc::clone(&self.http);
        let delay = self.config.response_delete_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = http.delete_message(channel_id, message.id).await {
                debug!("Expiring reply {} was not deleted: {e}", message.id);
            }
        });
    }

    async fn react(&self, channel_id: Id<ChannelMarker>, message_id: Id<MessageMarker>) {
        let emoji = RequestReactionType::Unicode { name: SUCCESS_EMOJI };
        if let Err(e) = self.http.create_reaction(channel_id, message_id, &emoji).await {
            warn!("Could not react to {message_id}: {e}");
        }
    }

    async fn delete_invocation(&self, channel_id: Id<ChannelMarker>, message_id: Id<MessageMarker>) {
        self.ignore.ignore(&[message_id]);
        self.cache.remove(&[message_id]);

        match self.http.delete_message(channel_id, message_id).await {
            Ok(_) => {}
            Err(e) => match map_http_error(e, "deleting clean invocation") {
                Error::NotFound(_) => debug!("Clean invocation {message_id} already gone"),
                other => warn!("{other}"),
            },
        }
    }
}
