use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use twilight_http::Client as HttpClient;
use twilight_model::id::Id;
use twilight_model::id::marker::ChannelMarker;

use scrubbot_common::traits::{CleanAuditSink, MessagePlatform};
use scrubbot_core::cache::RecencyCache;
use scrubbot_core::clean::CleanupService;
use scrubbot_core::modlog::{DeleteIgnoreList, FileTranscriptStore, ModLogReporter};
use scrubbot_core::platforms::discord::{DiscordCleanRuntime, TwilightPlatform};
use scrubbot_core::services::discord::CleanCommandHandler;
use scrubbot_core::CleanConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "scrubbot")]
#[command(author, version, about = "ScrubBot - bulk message cleanup for Discord moderators")]
struct Args {
    /// Bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: String,

    /// JSON config file; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Most messages a single clean may traverse.
    #[arg(long)]
    message_limit: Option<usize>,

    /// Channel that receives clean summaries.
    #[arg(long)]
    mod_log_channel: Option<u64>,

    /// Moderation channels (repeatable). Replies there are kept.
    #[arg(long = "mod-channel")]
    mod_channels: Vec<u64>,

    #[arg(long)]
    transcript_dir: Option<PathBuf>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    cache_capacity: Option<usize>,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("scrubbot=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)
        .expect("Failed to set global subscriber");
}

fn channel_id(raw: u64) -> anyhow::Result<Id<ChannelMarker>> {
    Id::new_checked(raw).with_context(|| format!("invalid channel id {raw}"))
}

fn load_config(args: &Args) -> anyhow::Result<CleanConfig> {
    let mut config = match &args.config {
        Some(path) => CleanConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => CleanConfig::default(),
    };

    if let Some(limit) = args.message_limit {
        config.message_limit = limit;
    }
    if let Some(raw) = args.mod_log_channel {
        config.mod_log_channel = Some(channel_id(raw)?);
    }
    if !args.mod_channels.is_empty() {
        config.mod_channels = args
            .mod_channels
            .iter()
            .map(|raw| channel_id(*raw))
            .collect::<anyhow::Result<_>>()?;
    }
    if let Some(dir) = &args.transcript_dir {
        config.transcript_dir = dir.clone();
    }
    if let Some(prefix) = &args.prefix {
        config.command_prefix = prefix.clone();
    }
    if let Some(capacity) = args.cache_capacity {
        config.cache_capacity = capacity;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    if args.token.trim().is_empty() {
        bail!("DISCORD_TOKEN is empty");
    }
    let config = Arc::new(load_config(&args)?);
    info!(
        "ScrubBot starting. prefix={}, message_limit={}, mod_log={:?}, mod_channels={}",
        config.command_prefix,
        config.message_limit,
        config.mod_log_channel,
        config.mod_channels.len()
    );

    let http = Arc::new(HttpClient::new(args.token.clone()));
    let platform: Arc<dyn MessagePlatform> = Arc::new(TwilightPlatform::new(Arc::clone(&http)));
    let cache = Arc::new(RecencyCache::new(config.cache_capacity));
    let ignore = Arc::new(DeleteIgnoreList::default());

    let transcripts = Arc::new(FileTranscriptStore::new(config.transcript_dir.clone()));
    let audit: Arc<dyn CleanAuditSink> = match config.mod_log_channel {
        Some(channel) => Arc::new(ModLogReporter::new(transcripts, Arc::clone(&http), channel)),
        None => {
            warn!("No mod-log channel configured; clean summaries go to the invoking channel");
            transcripts
        }
    };

    let service = Arc::new(CleanupService::new(
        platform,
        Arc::clone(&cache),
        audit,
        Arc::clone(&ignore),
        config.message_limit,
    ));
    let handler = Arc::new(CleanCommandHandler::new(
        service,
        Arc::clone(&http),
        Arc::clone(&cache),
        Arc::clone(&ignore),
        Arc::clone(&config),
    ));
    let runtime = DiscordCleanRuntime::new(
        args.token,
        http,
        cache,
        ignore,
        handler,
        config.command_prefix.clone(),
    );

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for Ctrl-C: {e}");
            return;
        }
        info!("Ctrl-C received");
        on_signal.cancel();
    });

    if let Err(e) = runtime.run(shutdown).await {
        error!("Gateway error: {e}");
        return Err(e.into());
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
