pub mod documents;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre;

use hunian_storage::qdrant::QdrantStore;

#[derive(Debug, Parser)]
#[command(
	version = hunian_cli::VERSION,
	rename_all = "kebab",
	styles = hunian_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Directory holding `listings.json` and `page_content/`.
	#[arg(long, value_name = "DIR", default_value = "data/embeds")]
	pub embeds_dir: PathBuf,
	#[arg(long, value_name = "N", default_value_t = 64)]
	pub batch_size: usize,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = hunian_config::load(&args.config)?;

	hunian_cli::init_tracing(&config.service.log_level);

	if args.batch_size == 0 {
		return Err(eyre::eyre!("--batch-size must be greater than zero."));
	}

	let rows = documents::load_rows(&args.embeds_dir)?;
	let total = rows.len();
	let prepared = documents::prepare(&args.embeds_dir, rows);

	tracing::info!(
		total,
		ready = prepared.documents.len(),
		skipped = prepared.skipped,
		"Listings loaded."
	);

	if prepared.documents.is_empty() {
		return Err(eyre::eyre!("No listing has usable page content."));
	}

	let store = QdrantStore::new(&config.vector)?;

	if store.ensure_collection().await? {
		tracing::info!(collection = %config.vector.collection, "Collection created.");
	}

	let mut upserted = 0;

	for (batch, chunk) in prepared.documents.chunks(args.batch_size).enumerate() {
		let texts: Vec<String> = chunk.iter().map(|doc| doc.page_content.clone()).collect();
		let vectors =
			hunian_providers::embedding::embed(&config.providers.embedding, &texts).await?;

		upserted += store.upsert_documents(chunk, vectors).await?;

		tracing::info!(batch = batch + 1, upserted, "Batch upserted.");
	}

	tracing::info!(upserted, skipped = prepared.skipped, "Ingest finished.");

	Ok(())
}
