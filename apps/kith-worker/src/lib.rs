use std::{sync::Arc, time::Duration};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use kith_indexer::{IndexingPipeline, ProcessorConfig, RateLimiter, ReindexPoller, UserProcessor};
use kith_providers::{
	HttpConsentClient, HttpDirectoryClient, HttpEmbeddingBackend, HttpImageAnalyzer,
	HttpProfileClient,
};
use kith_service::SearchService;
use kith_storage::{db::Db, jobs::PgReindexStore, qdrant::QdrantStore, query_log::PgQueryLog};

#[derive(Debug, Parser)]
#[command(version, rename_all = "kebab")]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	color_eyre::install()?;

	let config = kith_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let qdrant = Arc::new(QdrantStore::new(&config.storage.qdrant)?);

	qdrant.ensure_collection().await?;

	let directory = Arc::new(HttpDirectoryClient::new(config.directory.clone())?);
	let embedder = Arc::new(HttpEmbeddingBackend::new(config.providers.embedding.clone())?);
	let processor = Arc::new(UserProcessor {
		store: qdrant.clone(),
		profiles: Arc::new(HttpProfileClient::new(config.directory.clone())?),
		consent: Arc::new(HttpConsentClient::new(config.directory.clone())?),
		embedder: embedder.clone(),
		images: Arc::new(HttpImageAnalyzer::new(config.providers.image_analysis.clone())?),
		limiter: Arc::new(RateLimiter::new(Duration::from_millis(
			config.indexing.min_embed_interval_ms,
		))),
		cfg: ProcessorConfig::from_config(&config)?,
	});
	let jobs = Arc::new(PgReindexStore::new(db.pool.clone()));
	let pipeline = Arc::new(IndexingPipeline::new(
		processor.clone(),
		directory.clone(),
		qdrant.clone(),
		config.indexing.clone(),
		config.directory.page_size,
	));
	let poller = Arc::new(ReindexPoller::new(
		jobs.clone(),
		processor.clone(),
		config.reindex.clone(),
		config.indexing.full_ttl_seconds,
	));
	let service = Arc::new(SearchService {
		cfg: config.search.clone(),
		store: qdrant.clone(),
		directory,
		embedder,
		query_log: Arc::new(PgQueryLog::new(db.pool.clone())),
		jobs,
		processor,
		page_size: config.directory.page_size,
		refresh_ttl_seconds: config.indexing.full_ttl_seconds,
	});
	let cancel = CancellationToken::new();
	let tasks = [
		tokio::spawn(pipeline.clone().start(cancel.clone())),
		tokio::spawn(pipeline.start_ttl_cleanup(cancel.clone())),
		tokio::spawn(poller.run(cancel.clone())),
		tokio::spawn(service.start_purge_loop(cancel.clone())),
	];

	tracing::info!("Worker started.");
	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutdown signal received.");
	cancel.cancel();

	for task in tasks {
		if let Err(err) = task.await {
			tracing::error!(error = %err, "Background task panicked.");
		}
	}

	Ok(())
}
