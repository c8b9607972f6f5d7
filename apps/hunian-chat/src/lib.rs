use std::{path::PathBuf, sync::Arc};

use clap::{ArgGroup, Parser};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use hunian_service::{Assistant, Providers, RetrievalMode, TurnRequest};
use hunian_storage::{qdrant::QdrantStore, session::MemorySessionStore};

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "keluar"];

#[derive(Debug, Parser)]
#[command(
	version = hunian_cli::VERSION,
	rename_all = "kebab",
	styles = hunian_cli::styles(),
	group = ArgGroup::new("mode").multiple(false),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Search the listing API only, with vector fallback when it has nothing.
	#[arg(long, group = "mode")]
	pub api: bool,
	/// Search the vector index only.
	#[arg(long, group = "mode")]
	pub vector: bool,
	/// Search both sources concurrently (default).
	#[arg(long, group = "mode")]
	pub hybrid: bool,
	#[arg(long, value_name = "NAME", default_value = "guest")]
	pub name: String,
	/// Session id. A random one is used when omitted.
	#[arg(long, value_name = "ID")]
	pub session: Option<String>,
}
impl Args {
	pub fn mode(&self) -> RetrievalMode {
		if self.api {
			RetrievalMode::Structured
		} else if self.vector {
			RetrievalMode::Vector
		} else {
			RetrievalMode::Hybrid
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = hunian_config::load(&args.config)?;

	hunian_cli::init_tracing(&config.service.log_level);

	let index = Arc::new(QdrantStore::new(&config.vector)?);
	let sessions = Arc::new(MemorySessionStore::new(&config.session));
	let assistant = Assistant::new(config, Providers::default(), index, sessions)?;
	let session_id = args.session.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
	let mode = args.mode();
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	let mut stdout = tokio::io::stdout();

	stdout
		.write_all(format!("Mode: {}. Ketik 'exit' untuk keluar.\n", mode.as_str()).as_bytes())
		.await?;

	loop {
		stdout.write_all(b"\nAnda: ").await?;
		stdout.flush().await?;

		let Some(line) = lines.next_line().await? else {
			break;
		};
		let question = line.trim();

		if question.is_empty() {
			continue;
		}
		if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
			break;
		}

		let request = TurnRequest::new(session_id.clone(), question)
			.with_user_name(args.name.clone())
			.with_mode(mode);
		let reply = match assistant.handle_turn(request).await {
			Ok(report) => format!(
				"AI: {}\n[{} | {} token | Rp{:.2} | {} ms]\n",
				report.answer,
				report.intent.as_str(),
				report.usage.total_tokens,
				report.cost_idr,
				report.elapsed_ms,
			),
			Err(err) => {
				tracing::error!(error = %err, "Turn failed.");

				format!("AI: Maaf, terjadi kendala ({}). Silakan coba lagi.\n", err.kind())
			},
		};

		stdout.write_all(reply.as_bytes()).await?;
	}

	assistant.flush_history().await;

	Ok(())
}
