//! One conversational turn: rewrite, classify, retrieve, fuse and render.

use std::{
	sync::{Arc, Mutex},
	time::Instant,
};

use serde::Serialize;
use tokio::task::JoinSet;

use hunian_config::Config;
use hunian_domain::{
	filter::Filter,
	fusion::{self, Selection},
	greeting::DayPart,
	intent::Intent,
};
use hunian_providers::{
	listing_api::ChatHistoryRecord,
	llm::{ChatMessage, TokenUsage},
};
use hunian_storage::session::{Log, Message, SessionStore};

use crate::{
	Error, Providers, Result, VectorIndex, prompts,
	retrieval::{RetrievalMode, SemanticSearch, StructuredSearch, StructuredStatus},
	telemetry::TurnUsage,
};

const GUEST: &str = "guest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRequest {
	pub session_id: String,
	pub user_name: String,
	pub question: String,
	pub mode: RetrievalMode,
}
impl TurnRequest {
	pub fn new(session_id: impl Into<String>, question: impl Into<String>) -> Self {
		Self {
			session_id: session_id.into(),
			user_name: GUEST.to_string(),
			question: question.into(),
			mode: RetrievalMode::default(),
		}
	}

	pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
		let user_name = user_name.into();

		if !user_name.trim().is_empty() {
			self.user_name = user_name.trim().to_string();
		}

		self
	}

	pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
		self.mode = mode;

		self
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
	pub answer: String,
	pub intent: Intent,
	pub method: RetrievalMode,
	pub rewritten_question: String,
	/// The filter sent to the listing API, when the turn searched it.
	pub filter: Option<Filter>,
	pub structured: StructuredStatus,
	pub structured_count: usize,
	pub vector_count: usize,
	pub selected_count: usize,
	pub usage: TokenUsage,
	pub response_count: u32,
	pub cost_usd: f64,
	pub cost_idr: f64,
	pub elapsed_ms: u64,
}

struct Retrieved {
	filter: Option<Filter>,
	structured: StructuredStatus,
	selection: Selection,
}

pub struct Assistant {
	cfg: Config,
	providers: Providers,
	sessions: Arc<dyn SessionStore>,
	structured: StructuredSearch,
	semantic: SemanticSearch,
	/// Chat-history appends still in flight.
	history: Mutex<JoinSet<()>>,
}
impl Assistant {
	pub fn new(
		cfg: Config,
		providers: Providers,
		index: Arc<dyn VectorIndex>,
		sessions: Arc<dyn SessionStore>,
	) -> Result<Self> {
		let structured = StructuredSearch::new(&cfg, providers.listing.clone(), sessions.clone())?;
		let semantic = SemanticSearch::new(&cfg, providers.embedding.clone(), index);

		Ok(Self {
			cfg,
			providers,
			sessions,
			structured,
			semantic,
			history: Mutex::new(JoinSet::new()),
		})
	}

	pub fn cfg(&self) -> &Config {
		&self.cfg
	}

	pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnReport> {
		if request.session_id.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "session_id must be non-empty.".to_string(),
			});
		}
		if request.question.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "question must be non-empty.".to_string(),
			});
		}

		let started = Instant::now();
		let session_id = request.session_id.as_str();
		let _turn = self.sessions.acquire(session_id).await?;
		let chat = self.sessions.get(session_id, Log::Chat).await?;
		let history = prompts::render_history(&chat, self.cfg.retrieval.history_turns);
		let mut usage = TurnUsage::default();
		let rewritten = self
			.complete(&prompts::build_rewrite_messages(&history, &request.question), &mut usage)
			.await?;
		let rewritten =
			if rewritten.trim().is_empty() { request.question.clone() } else { rewritten };
		let intent = Intent::parse(
			&self.complete(&prompts::build_classifier_messages(&rewritten), &mut usage).await?,
		);

		tracing::debug!(session_id, intent = intent.as_str(), "Turn classified.");

		let mut retrieved = None;
		let answer = match intent {
			Intent::Greeting => {
				let messages = prompts::build_greeting_messages(
					DayPart::now(),
					&request.user_name,
					&history,
					&request.question,
				);

				self.complete(&messages, &mut usage).await?
			},
			Intent::UpdateRequest => prompts::UPDATE_REQUEST_REPLY.to_string(),
			Intent::OffTopic =>
				self.complete(
					&prompts::build_off_topic_messages(&history, &request.question),
					&mut usage,
				)
				.await?,
			Intent::Search => {
				let found = self.retrieve(session_id, request.mode, &rewritten, &mut usage).await?;
				let messages = prompts::build_answer_messages(&rewritten, &found.selection.text());
				let answer = self.complete(&messages, &mut usage).await?;

				retrieved = Some(found);

				answer
			},
		};

		self.sessions
			.append(
				session_id,
				Log::Chat,
				vec![Message::human(request.question.clone()), Message::ai(answer.clone())],
			)
			.await?;
		self.sessions.trim(session_id, Log::Chat, self.cfg.session.max_messages).await?;

		let cost = usage.cost(&self.cfg.telemetry);
		let elapsed_ms = started.elapsed().as_millis() as u64;
		let (filter, structured, selection) = match retrieved {
			Some(Retrieved { filter, structured, selection }) => (filter, structured, selection),
			None => (None, StructuredStatus::Skipped, Selection::default()),
		};
		let report = TurnReport {
			answer,
			intent,
			method: request.mode,
			rewritten_question: rewritten,
			filter,
			structured,
			structured_count: selection.structured_count,
			vector_count: selection.vector_count,
			selected_count: selection.selected_count(),
			usage: usage.tokens,
			response_count: usage.response_count,
			cost_usd: cost.usd,
			cost_idr: cost.idr,
			elapsed_ms,
		};

		self.record_chat_history(&request, &report);

		tracing::info!(
			session_id,
			intent = intent.as_str(),
			method = request.mode.as_str(),
			total_tokens = report.usage.total_tokens,
			elapsed_ms,
			"Turn completed."
		);

		Ok(report)
	}

	async fn complete(&self, messages: &[ChatMessage], usage: &mut TurnUsage) -> Result<String> {
		let completion = self.providers.chat.complete(&self.cfg.providers.llm, messages).await?;

		usage.record(&completion);

		Ok(completion.content)
	}

	async fn extract_filter(
		&self,
		session_id: &str,
		rewritten: &str,
		usage: &mut TurnUsage,
	) -> Result<Filter> {
		let previous = self.structured.previous_entry(session_id).await?;
		let messages = prompts::build_filter_messages(previous.as_deref(), rewritten);
		let reply = self.complete(&messages, usage).await?;

		Ok(Filter::from_reply(&reply)?)
	}

	async fn retrieve(
		&self,
		session_id: &str,
		mode: RetrievalMode,
		rewritten: &str,
		usage: &mut TurnUsage,
	) -> Result<Retrieved> {
		let target_n = self.cfg.retrieval.target_n;
		let retrieved = match mode {
			RetrievalMode::Vector => {
				let items = self.semantic_items(rewritten).await;

				Retrieved {
					filter: None,
					structured: StructuredStatus::Skipped,
					selection: fusion::select("", &items, target_n),
				}
			},
			RetrievalMode::Hybrid => {
				let filter = self.extract_filter(session_id, rewritten, usage).await?;
				let (structured, items) = tokio::join!(
					self.structured.fetch(session_id, &filter, rewritten),
					self.semantic_items(rewritten)
				);
				let structured = structured?;
				let items = if fusion::vector_fallback_allowed(
					&structured.filter,
					structured.status.blocks(),
				) {
					items
				} else {
					Vec::new()
				};

				Retrieved {
					selection: fusion::select(&structured.text, &items, target_n),
					filter: Some(structured.filter),
					structured: structured.status,
				}
			},
			RetrievalMode::Structured => {
				let filter = self.extract_filter(session_id, rewritten, usage).await?;
				let structured = self.structured.fetch(session_id, &filter, rewritten).await?;
				let blocks = structured.status.blocks();
				let items =
					if blocks == 0 && fusion::vector_fallback_allowed(&structured.filter, blocks) {
						self.semantic_items(rewritten).await
					} else {
						Vec::new()
					};

				Retrieved {
					selection: fusion::select(&structured.text, &items, target_n),
					filter: Some(structured.filter),
					structured: structured.status,
				}
			},
		};

		tracing::info!(
			session_id,
			page = retrieved.filter.as_ref().and_then(|filter| filter.page),
			structured_count = retrieved.selection.structured_count,
			vector_count = retrieved.selection.vector_count,
			selected_count = retrieved.selection.selected_count(),
			"Candidates fused."
		);

		Ok(retrieved)
	}

	async fn semantic_items(&self, query: &str) -> Vec<String> {
		match self.semantic.fetch(query).await {
			Ok(items) => items,
			Err(err) => {
				tracing::warn!(error = %err, "Semantic search failed.");

				Vec::new()
			},
		}
	}

	fn record_chat_history(&self, request: &TurnRequest, report: &TurnReport) {
		if !self.cfg.listing_api.has_credentials() {
			tracing::debug!("Listing API credentials missing. Chat history not recorded.");

			return;
		}

		let record = ChatHistoryRecord {
			chat_session_id: request.session_id.clone(),
			human: request.question.clone(),
			ai: report.answer.clone(),
			method: request.mode.as_str().to_string(),
			input_token: report.usage.prompt_tokens,
			output_token: report.usage.completion_tokens,
			total_token: report.usage.total_tokens,
			response_count: report.response_count,
			response_time: report.elapsed_ms,
			cost_usd: report.cost_usd,
			cost_idr: report.cost_idr,
		};
		let listing = self.providers.listing.clone();
		let api = self.cfg.listing_api.clone();
		let mut pending = self.history.lock().unwrap_or_else(|err| err.into_inner());

		while pending.try_join_next().is_some() {}

		pending.spawn(async move {
			if let Err(err) = listing.post_chat_history(&api, &record).await {
				tracing::warn!(error = %err, "Chat history append failed.");
			}
		});
	}

	/// Waits for every chat-history append started so far.
	pub async fn flush_history(&self) {
		let mut pending =
			std::mem::take(&mut *self.history.lock().unwrap_or_else(|err| err.into_inner()));

		while let Some(joined) = pending.join_next().await {
			if let Err(err) = joined {
				tracing::warn!(error = %err, "Chat history task failed.");
			}
		}
	}
}
