use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use dynamo_core::{
    ChatCompletionsClient, ConceptExtractor, DEFAULT_TEMPERATURE, ExtractionConfig, LlmClient,
    Provider, RetrieverConfig, YoutubeRetriever, get_root_cache_dir,
};
use dynamo_server::{AppState, DEFAULT_PORT, run_server_with_shutdown, state::DEFAULT_GROUP_SIZE};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dynamo-server")]
#[command(about = "HTTP API that finds and defines the key concepts of YouTube videos")]
struct Args {
    #[arg(long, default_value_t = DEFAULT_PORT, env = "DYNAMO_PORT")]
    port: u16,

    /// Group size used when a request does not specify one
    #[arg(long, default_value_t = DEFAULT_GROUP_SIZE, env = "DYNAMO_GROUP_SIZE")]
    group_size: usize,

    #[arg(long, default_value = "gemini", env = "DYNAMO_PROVIDER")]
    provider: Provider,

    #[arg(long, env = "DYNAMO_MODEL")]
    model: Option<String>,

    #[arg(long, default_value_t = 1, env = "DYNAMO_CONCURRENCY")]
    concurrency: usize,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 120, env = "DYNAMO_TIMEOUT")]
    timeout: u64,

    /// Sampling temperature for the model
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, env = "DYNAMO_TEMPERATURE")]
    temperature: f32,

    #[arg(long, default_value = "en", env = "DYNAMO_LANG")]
    lang: String,

    /// Sort concepts alphabetically within each group
    #[arg(long, env = "DYNAMO_SORT")]
    sort: bool,

    /// Cache transcripts on disk (defaults to the user cache directory)
    #[arg(long, env = "DYNAMO_CACHE")]
    cache: bool,

    #[arg(long, env = "DYNAMO_CACHE_DIR")]
    cache_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = ExtractionConfig {
        concurrency: args.concurrency.max(1),
        call_timeout: Duration::from_secs(args.timeout),
        sort_concepts: args.sort,
        ..Default::default()
    };

    let mut client =
        ChatCompletionsClient::from_provider(args.provider)?.with_temperature(args.temperature);
    if let Some(model) = args.model {
        client = client.with_model(model);
    }
    tracing::info!(provider = %args.provider, model = client.model(), "LLM client ready");

    let mut retriever = YoutubeRetriever::new(RetrieverConfig {
        language: args.lang,
        ..Default::default()
    });
    if args.cache || args.cache_dir.is_some() {
        let root = args.cache_dir.unwrap_or_else(get_root_cache_dir);
        tracing::info!(path = %root.display(), "Caching transcripts");
        retriever = retriever.with_cache(root);
    }

    let state = AppState::new(
        Arc::new(retriever),
        ConceptExtractor::new(Arc::new(client), config),
    )
    .with_default_group_size(args.group_size);

    run_server_with_shutdown(Arc::new(state), args.port, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutting down");
    })
    .await
}
