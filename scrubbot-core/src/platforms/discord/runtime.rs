use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, Shard, StreamExt,
};
use twilight_http::Client as HttpClient;
use twilight_model::channel::Message;
use twilight_model::id::marker::{ChannelMarker, MessageMarker};
use twilight_model::id::Id;

use crate::cache::RecencyCache;
use crate::modlog::DeleteIgnoreList;
use crate::platforms::discord::clean_message_from;
use crate::services::discord::{parse_clean_command, CleanCommandHandler};
use crate::Error;

/// Everything a shard needs to keep the cache current and dispatch commands.
#[derive(Clone)]
struct ShardContext {
    cache: Arc<RecencyCache>,
    ignore: Arc<DeleteIgnoreList>,
    handler: Arc<CleanCommandHandler>,
    prefix: Arc<str>,
}

fn wanted_events() -> EventTypeFlags {
    EventTypeFlags::READY
        | EventTypeFlags::MESSAGE_CREATE
        | EventTypeFlags::MESSAGE_UPDATE
        | EventTypeFlags::MESSAGE_DELETE
        | EventTypeFlags::MESSAGE_DELETE_BULK
}

async fn shard_runner(mut shard: Shard, ctx: ShardContext) {
    let shard_id = shard.id().number();
    info!("(ShardRunner) Shard {shard_id} started. Listening for events.");

    while let Some(item) = shard.next_event(wanted_events()).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Shard {shard_id} => error receiving event: {err:?}");
                continue;
            }
        };

        match event {
            Event::Ready(ready) => {
                info!("Shard {shard_id} => READY as {} (ID={})", ready.user.name, ready.user.id);
            }
            Event::MessageCreate(msg) => ctx.on_message(msg.0),
            Event::MessageUpdate(update) => ctx.on_edited(&update.0),
            Event::MessageDelete(deleted) => ctx.on_deleted(deleted.channel_id, &[deleted.id]),
            Event::MessageDeleteBulk(deleted) => ctx.on_deleted(deleted.channel_id, &deleted.ids),
            Event::GatewayClose(frame) => {
                debug!("Shard {shard_id} => gateway closed: {frame:?}");
            }
            other => {
                trace!("Shard {shard_id} => unhandled event: {:?}", other.kind());
            }
        }
    }

    warn!("(ShardRunner) Shard {shard_id} event loop ended.");
}

impl ShardContext {
    fn on_message(&self, message: Message) {
        self.cache.insert(clean_message_from(&message));

        if message.author.bot {
            return;
        }
        let Some(body) = message.content.strip_prefix(&*self.prefix) else {
            return;
        };
        let Some(command) = parse_clean_command(body, Utc::now()) else {
            return;
        };

        debug!("Clean command from {} in {}: {body}", message.author.id, message.channel_id);
        let handler = Arc::clone(&self.handler);
        tokio::spawn(async move {
            handler.handle(message, command).await;
        });
    }

    /// Edits and link unfurls both arrive as updates.
    fn on_edited(&self, message: &Message) {
        let edited = clean_message_from(message);
        if self.cache.update(edited.id, edited.content, edited.embeds) {
            trace!("Refreshed cached message {} in {}", message.id, message.channel_id);
        }
    }

    fn on_deleted(&self, channel_id: Id<ChannelMarker>, ids: &[Id<MessageMarker>]) {
        self.cache.remove(ids);

        let logged: Vec<_> = ids.iter().filter(|id| !self.ignore.take(**id)).collect();
        match logged.as_slice() {
            [] => trace!("{} clean deletions in {channel_id} acknowledged", ids.len()),
            [id] => info!("Message {id} deleted in {channel_id}"),
            many => info!("{} messages deleted in {channel_id}", many.len()),
        }
    }
}

/// Gateway side of the bot: one runner per recommended shard.
pub struct DiscordCleanRuntime {
    token: String,
    http: Arc<HttpClient>,
    cache: Arc<RecencyCache>,
    ignore: Arc<DeleteIgnoreList>,
    handler: Arc<CleanCommandHandler>,
    prefix: String,
}

impl DiscordCleanRuntime {
    pub fn new(
        token: String,
        http: Arc<HttpClient>,
        cache: Arc<RecencyCache>,
        ignore: Arc<DeleteIgnoreList>,
        handler: Arc<CleanCommandHandler>,
        prefix: String,
    ) -> Self {
        Self { token, http, cache, ignore, handler, prefix }
    }

    /// Connects every shard and runs until `shutdown` fires or all shards stop.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), Error> {
        if self.token.is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let config = Config::new(
            self.token.clone(),
            Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT,
        );
        let shards = gateway::create_recommended(&self.http, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("create_recommended error: {e}")))?;

        let ctx = ShardContext {
            cache: self.cache,
            ignore: self.ignore,
            handler: self.handler,
            prefix: Arc::from(self.prefix),
        };

        let mut senders = Vec::new();
        let mut tasks = Vec::new();
        for shard in shards {
            senders.push(shard.sender());
            tasks.push(tokio::spawn(shard_runner(shard, ctx.clone())));
        }
        info!("Started {} shard(s)", tasks.len());

        let all_done = futures_util::future::join_all(tasks);
        tokio::pin!(all_done);

        let shards_ended = tokio::select! {
            _ = shutdown.cancelled() => None,
            results = &mut all_done => Some(results),
        };

        let results = match shards_ended {
            Some(results) => {
                warn!("All shards stopped");
                results
            }
            None => {
                info!("Shutting down gateway connections");
                for sender in &senders {
                    let _ = sender.close(CloseFrame::NORMAL);
                }
                all_done.await
            }
        };
        for result in results {
            if let Err(e) = result {
                error!("Shard task failed: {e}");
            }
        }

        Ok(())
    }
}
