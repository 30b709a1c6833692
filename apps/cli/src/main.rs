use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::Parser;
use console::style;
use dynamo_core::{
    CancellationToken, ChatCompletionsClient, ConceptEntry, ConceptExtractor, CostEstimate,
    CostRates, DEFAULT_TEMPERATURE, ExtractionConfig, LlmClient, Provider, RetrieverConfig,
    YoutubeRetriever, format_concepts_readable, get_root_cache_dir, grouping::split_by_plan,
    plan_groups, retriever::is_cached,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let whole = d.as_secs();
        format!("{}m {}s", whole / 60, whole % 60)
    }
}

#[derive(Parser)]
#[command(name = "dynamo")]
#[command(about = "Find and define the key concepts of a YouTube video")]
struct Cli {
    /// Video URL
    url: String,

    /// Number of groups to split the transcript into (0 picks ~5 chunks per group)
    #[arg(short, long, default_value_t = 0, env = "DYNAMO_GROUP_SIZE")]
    group_size: usize,

    /// AI provider for concept extraction (grok, openai, gemini)
    #[arg(short, long, default_value = "gemini", env = "DYNAMO_PROVIDER")]
    provider: Provider,

    /// Override the provider's default model
    #[arg(short, long, env = "DYNAMO_MODEL")]
    model: Option<String>,

    /// Number of groups sent to the model at once
    #[arg(short, long, default_value_t = 1, env = "DYNAMO_CONCURRENCY")]
    concurrency: usize,

    /// Per-call timeout in seconds
    #[arg(long, default_value_t = 120, env = "DYNAMO_TIMEOUT")]
    timeout: u64,

    /// Sampling temperature for the model
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, env = "DYNAMO_TEMPERATURE")]
    temperature: f32,

    /// Preferred transcript language
    #[arg(short, long, default_value = "en")]
    lang: String,

    /// Sort concepts alphabetically within each group
    #[arg(long)]
    sort: bool,

    /// Print JSON instead of markdown
    #[arg(long)]
    json: bool,

    /// Force re-fetching the transcript even if it is cached
    #[arg(short, long)]
    force: bool,

    /// Log every group's cost and parse result
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    key_concepts: &'a [ConceptEntry],
    cost: &'a CostEstimate,
}

fn create_spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    Ok(pb)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Validate API key early
    let client = match ChatCompletionsClient::from_provider(cli.provider) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let client = match &cli.model {
        Some(model) => client.with_model(model),
        None => client,
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let config = ExtractionConfig {
        rates: CostRates::default(),
        concurrency: cli.concurrency.max(1),
        call_timeout: Duration::from_secs(cli.timeout),
        sort_concepts: cli.sort,
        ..Default::default()
    };
    let client = client.with_temperature(cli.temperature);
    let model = client.model().to_string();
    let extractor = ConceptExtractor::new(Arc::new(client), config);

    let cache_root = get_root_cache_dir();
    let retriever = YoutubeRetriever::new(RetrieverConfig {
        language: cli.lang.clone(),
        ..Default::default()
    })
    .with_cache(&cache_root)
    .force_refresh(cli.force);

    if !cli.json {
        println!(
            "\n{}  {}\n",
            style("dynamo").cyan().bold(),
            style("Key Concept Finder").dim()
        );
        println!("{}", style("─".repeat(60)).dim());
    }

    let total_start = Instant::now();

    // Step 1: Transcript (check cache)
    let step_start = Instant::now();
    let cached = !cli.force && is_cached(&cache_root, &cli.url);
    let spinner = create_spinner("Fetching transcript...")?;
    let transcript = retriever.transcript(&cli.url).await?;
    let chunks = retriever.split(&transcript);
    spinner.finish_with_message(format!(
        "{} Transcript: {} chunks, {} {}",
        style("✓").green().bold(),
        chunks.len(),
        style(&transcript.language).yellow(),
        if cached {
            style("(cached)".to_string()).dim()
        } else {
            style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
        }
    ));

    // Step 2: Validate grouping before spending anything
    let plan = plan_groups(chunks.len(), cli.group_size)?;

    // Step 3: Extract concepts
    let step_start = Instant::now();
    let spinner = create_spinner(&format!(
        "Extracting key concepts from {} groups of {} chunks with {} ({})...",
        plan.group_count(chunks.len()),
        plan.docs_per_group,
        cli.provider.name(),
        model
    ))?;
    let groups = split_by_plan(&chunks, &plan);
    let extraction = extractor.extract(&groups, &cancel).await?;
    spinner.finish_with_message(format!(
        "{} Extracted {} concepts {}",
        style("✓").green().bold(),
        extraction.concepts.len(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    if cli.json {
        let output = JsonOutput {
            key_concepts: &extraction.concepts,
            cost: &extraction.cost,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!("{}", style("─".repeat(60)).dim());

    // Human-readable output
    let metadata = chunks.first().and_then(|c| c.metadata.as_ref());
    println!("{}", format_concepts_readable(&extraction, metadata));

    Ok(())
}
