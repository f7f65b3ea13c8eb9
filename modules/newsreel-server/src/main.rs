mod routes;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use newsreel_annotate::Annotator;
use newsreel_cluster::{ClusterPipeline, HotIndex};
use newsreel_common::AgencyRating;
use newsreel_store::DocumentStore;

use crate::state::AppState;

#[derive(Parser)]
#[command(name = "newsreel-server", about = "Online news thread aggregation server")]
struct Cli {
    /// Path to config TOML file
    #[arg(long, default_value = "./configs/newsreel.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(config = %cli.config.display(), "Loading config");
    let config = newsreel_common::config::load_config(&cli.config)?;

    // Failure to open the store is the one startup condition that kills the
    // process outright.
    let store = Arc::new(
        DocumentStore::open(&config.store.db_path, config.store.db_fail_if_missing)
            .with_context(|| format!("opening store at {}", config.store.db_path.display()))?,
    );
    tracing::info!(db_path = %config.store.db_path.display(), "Document store open");

    let annotator = Arc::new(Annotator::from_config(&config.annotator)?);
    let rating = Arc::new(AgencyRating::load(&config.rating.agency_rating)?);
    let index = Arc::new(HotIndex::new());

    // The clustering loop is CPU-bound and never yields; it gets its own
    // thread. Its first successful publish flips the frontend to ready.
    let pipeline = ClusterPipeline::new(
        store.clone(),
        rating.clone(),
        config.clustering.clone(),
        index.clone(),
    );
    std::thread::Builder::new()
        .name("clustering-loop".to_string())
        .spawn(move || pipeline.run())
        .context("spawning clustering loop")?;

    let app_state = Arc::new(AppState {
        store,
        annotator,
        rating,
        index,
        ranking: config.ranking.clone(),
        skip_irrelevant_docs: config.annotator.skip_irrelevant_docs,
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.thread_pool_size)
        .enable_all()
        .build()
        .context("building server runtime")?;

    runtime.block_on(async {
        let app = routes::build_router(app_state);
        let addr = format!("0.0.0.0:{}", config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {addr}"))?;
        tracing::info!(%addr, workers = config.server.thread_pool_size, "Serving");
        axum::serve(listener, app).await.context("serving")
    })
}
