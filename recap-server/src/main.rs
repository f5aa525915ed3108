//! Recap server entry point.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recap_server::config::Config;
use recap_server::pipeline::SummaryPipeline;
use recap_server::server;
use recap_server::services::chat::ChatClient;
use recap_server::services::key_policy::KeyPolicy;
use recap_server::services::ytdlp::YtDlp;

/// Recap - asynchronous YouTube summarization backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to bind to (overrides the PORT environment variable)
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment from .env, when present.
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("recap_server={log_level},recap_common={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Recap server starting...");

    let mut config = Config::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }

    let key_policy = Arc::new(KeyPolicy::new(
        config.key_policy_mode,
        config.designated_users.iter().cloned(),
    ));
    let pipeline = SummaryPipeline::new(
        YtDlp::new(config.subtitle_langs.clone()),
        ChatClient::new(&config.llm)?,
        Arc::clone(&key_policy),
        config.llm.api_key.clone(),
        config.chunk_seconds,
    );

    server::start(config, key_policy, Arc::new(pipeline)).await
}
