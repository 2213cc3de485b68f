use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use related_posts::application::services::{
    EmbeddingPipelineConfig, UpdateRelatedConfig, UpdateRelatedService, UpdateSummary,
};
use related_posts::domain::value_objects::{LinkRewriter, PostDirectoryPath};
use related_posts::infrastructure::embeddings::{
    HttpEmbeddingClient, HttpEmbeddingConfig, MarkdownStripper, DEFAULT_ENDPOINT,
};
use related_posts::infrastructure::persistence::MarkdownDocumentRepository;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "related-posts")]
#[command(about = "Find and record related posts for a static site")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute the similar_posts front matter of every post
    #[command(name = "update-related", alias = "ur")]
    UpdateRelated(UpdateRelatedArgs),
}

#[derive(Args)]
struct UpdateRelatedArgs {
    /// Base URL of the embedding API
    #[arg(long, env = "EMBED_API_URL", default_value = DEFAULT_ENDPOINT)]
    embed_api_url: String,

    /// Bearer token for the embedding API
    #[arg(long, env = "EMBED_API_TOKEN", default_value = "", hide_env_values = true)]
    embed_api_token: String,

    /// Directory holding the post bundles
    #[arg(long, default_value = "./content/posts")]
    post_dir: PathBuf,

    /// Site content root, stripped from post paths to build links
    #[arg(long, default_value = "content")]
    content_root: String,

    /// Maximum concurrent embedding requests
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Related posts recorded per post (1 to 3)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=3))]
    limit: u8,

    /// Compute related posts without writing any file
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn update_related(args: UpdateRelatedArgs) -> Result<UpdateSummary> {
    let post_dir = PostDirectoryPath::new(&args.post_dir)
        .with_context(|| format!("Invalid post directory {}", args.post_dir.display()))?;
    let timeout = Duration::from_secs(args.timeout_secs);

    let client = HttpEmbeddingClient::new(HttpEmbeddingConfig {
        endpoint: args.embed_api_url,
        token: Some(args.embed_api_token),
        timeout,
    })
    .context("Failed to create embedding client")?;
    info!("Using embedding API at {}", client.url());

    let config = UpdateRelatedConfig {
        pipeline: EmbeddingPipelineConfig {
            max_concurrent: args.concurrency,
            call_timeout: timeout,
        },
        related_limit: usize::from(args.limit),
        link_rewriter: LinkRewriter::new(args.content_root),
        dry_run: args.dry_run,
    };

    let service = UpdateRelatedService::new(
        MarkdownDocumentRepository::new(post_dir),
        Arc::new(client),
        Arc::new(MarkdownStripper::new()),
        config,
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            on_interrupt.cancel();
        }
    });

    service
        .run(&cancel)
        .await
        .context("Failed to update related posts")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::UpdateRelated(args) => {
            let summary = update_related(args).await?;

            println!(
                "{} posts loaded, {} related lists changed, {} files written",
                summary.documents_loaded, summary.documents_changed, summary.documents_saved
            );
        }
    }

    Ok(())
}
