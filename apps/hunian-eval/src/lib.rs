pub mod audit;
pub mod collect;
pub mod dataset;
pub mod score;

use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use color_eyre::eyre;
use time::{OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};
use uuid::Uuid;

use hunian_service::{Assistant, Providers, RetrievalMode};
use hunian_storage::{qdrant::QdrantStore, session::MemorySessionStore};

use crate::{audit::RunMeta, score::ScoreOptions};

#[derive(Debug, Parser)]
#[command(
	version = hunian_cli::VERSION,
	rename_all = "kebab",
	styles = hunian_cli::styles(),
)]
pub struct Args {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Score stored answers against gold constraints and append audit sheets.
	Score(ScoreArgs),
	/// Ask benchmark questions through the assistant and write a scoring dataset.
	Collect(CollectArgs),
}

#[derive(Debug, clap::Args)]
pub struct ScoreArgs {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// CPR@All threshold for a positive prediction.
	#[arg(long, value_name = "T")]
	pub threshold: Option<f64>,
	#[arg(long, value_name = "DIR")]
	pub audit_dir: Option<PathBuf>,
	#[arg(long, value_name = "N")]
	pub concurrency: Option<usize>,
}

#[derive(Debug, clap::Args)]
pub struct CollectArgs {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'q', value_name = "FILE")]
	pub questions: PathBuf,
	#[arg(long, short = 'o', value_name = "FILE")]
	pub out: PathBuf,
	#[arg(long, value_name = "MODE", default_value = "hybrid")]
	pub mode: String,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	match args.command {
		Command::Score(args) => run_score(args).await,
		Command::Collect(args) => run_collect(args).await,
	}
}

async fn run_score(args: ScoreArgs) -> color_eyre::Result<()> {
	let config = hunian_config::load(&args.config)?;

	hunian_cli::init_tracing(&config.service.log_level);

	let options = ScoreOptions::resolve(&config, args.threshold, args.concurrency, args.audit_dir)?;
	let dataset = dataset::load(&args.dataset)?;
	let meta = run_meta(&dataset.name)?;
	let listing = Providers::default().listing;
	let output = score::score_dataset(&config, dataset, &options, listing, meta).await?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

async fn run_collect(args: CollectArgs) -> color_eyre::Result<()> {
	let config = hunian_config::load(&args.config)?;

	hunian_cli::init_tracing(&config.service.log_level);

	let mode = RetrievalMode::parse(&args.mode)
		.ok_or_else(|| eyre::eyre!("--mode must be one of api, vector or hybrid."))?;
	let questions = collect::load_questions(&args.questions)?;
	let run_id = run_meta("collect")?.run_id;
	let index = Arc::new(QdrantStore::new(&config.vector)?);
	let sessions = Arc::new(MemorySessionStore::new(&config.session));
	let assistant = Assistant::new(config, Providers::default(), index, sessions)?;
	let asked = questions.len();
	let rows = collect::collect(&assistant, questions, mode, &run_id).await;

	collect::write_rows(&args.out, &rows)?;

	tracing::info!(asked, written = rows.len(), out = %args.out.display(), "Answers collected.");

	Ok(())
}

fn run_meta(dataset: &str) -> color_eyre::Result<RunMeta> {
	let now = OffsetDateTime::now_utc();
	let stamp = now.format(format_description!("[year][month][day]-[hour][minute][second]"))?;
	let suffix = Uuid::new_v4().simple().to_string();

	Ok(RunMeta {
		run_id: format!("{stamp}-{}", &suffix[..8]),
		run_ts: now.format(&Rfc3339)?,
		dataset: dataset.to_string(),
	})
}
