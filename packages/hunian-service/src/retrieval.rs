//! Candidate sources: the structured listing API with paging continuity, and the vector index.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use hunian_config::Config;
use hunian_domain::{
	answer,
	filter::{self, Continuity, Filter},
	listing,
};
use hunian_storage::session::{Log, Message, Role, SessionStore};

use crate::{EmbeddingProvider, Error, ListingSource, Result, VectorIndex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
	Structured,
	Vector,
	#[default]
	Hybrid,
}
impl RetrievalMode {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_lowercase().as_str() {
			"api" | "structured" | "sql" => Some(Self::Structured),
			"vector" => Some(Self::Vector),
			"hybrid" => Some(Self::Hybrid),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Structured => "structured",
			Self::Vector => "vector",
			Self::Hybrid => "hybrid",
		}
	}
}

/// What the structured source did this turn. A failure is never reported as an empty success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StructuredStatus {
	Skipped,
	Ok { blocks: usize },
	Failed { kind: &'static str },
}
impl StructuredStatus {
	pub fn blocks(&self) -> usize {
		match self {
			Self::Ok { blocks } => *blocks,
			Self::Skipped | Self::Failed { .. } => 0,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredOutcome {
	/// The filter as sent, with paging and the hard flag filled in.
	pub filter: Filter,
	/// Response text, empty when the API had no rows or the call failed.
	pub text: String,
	pub status: StructuredStatus,
}

pub struct StructuredSearch {
	listing: Arc<dyn ListingSource>,
	sessions: Arc<dyn SessionStore>,
	api: hunian_config::ListingApi,
	page_size: u32,
	continuity: Continuity,
	max_messages: usize,
}
impl StructuredSearch {
	pub fn new(
		cfg: &Config,
		listing: Arc<dyn ListingSource>,
		sessions: Arc<dyn SessionStore>,
	) -> Result<Self> {
		let continuity =
			Continuity::parse(&cfg.retrieval.continuity).ok_or_else(|| Error::InvalidRequest {
				message: "retrieval.continuity must be subset or exact.".to_string(),
			})?;

		Ok(Self {
			listing,
			sessions,
			api: cfg.listing_api.clone(),
			page_size: cfg.retrieval.page_size,
			continuity,
			max_messages: cfg.session.max_messages,
		})
	}

	/// The filter JSON issued on the session's most recent search turn.
	pub async fn previous_entry(&self, session_id: &str) -> Result<Option<String>> {
		let log = self.sessions.get(session_id, Log::Query).await?;

		Ok(log.into_iter().rev().find(|message| message.role == Role::Ai).map(|m| m.content))
	}

	/// Issues `filter` with continuity paging and records it, then the question, in the query log.
	pub async fn fetch(
		&self,
		session_id: &str,
		filter: &Filter,
		rewritten: &str,
	) -> Result<StructuredOutcome> {
		let previous = self.previous_entry(session_id).await?.and_then(|raw| parse_entry(&raw));
		let outbound = self.outbound(previous.as_ref(), filter);
		let body = serde_json::to_value(&outbound).map_err(|err| Error::MalformedFilter {
			message: format!("Filter could not be serialized: {err}."),
		})?;

		tracing::debug!(
			session_id,
			filter = %outbound.to_json_string(),
			"Structured query issued."
		);

		let result = self.listing.query(&self.api, &body).await;

		self.sessions
			.append(
				session_id,
				Log::Query,
				vec![Message::ai(outbound.to_json_string()), Message::human(rewritten)],
			)
			.await?;
		self.sessions.trim(session_id, Log::Query, self.max_messages).await?;

		let (text, status) = match result {
			Ok(text) if answer::response_is_empty(&text) =>
				(String::new(), StructuredStatus::Ok { blocks: 0 }),
			Ok(text) => {
				let blocks = listing::split_blocks(&text).len();

				(text, StructuredStatus::Ok { blocks })
			},
			Err(err) => {
				tracing::warn!(error = %err, kind = err.kind(), "Structured listing fetch failed.");

				(String::new(), StructuredStatus::Failed { kind: err.kind() })
			},
		};

		Ok(StructuredOutcome { filter: outbound, text, status })
	}

	fn outbound(&self, previous: Option<&Filter>, filter: &Filter) -> Filter {
		let mut outbound = filter.normalized();

		outbound.page = Some(filter::next_page(previous, &outbound, self.continuity));
		outbound.paginate = Some(self.page_size);
		outbound.is_hard_filter = Some(outbound.is_hard());

		outbound
	}
}

pub struct SemanticSearch {
	embedding: Arc<dyn EmbeddingProvider>,
	index: Arc<dyn VectorIndex>,
	embedding_cfg: hunian_config::EmbeddingProviderConfig,
	fetch_k: u64,
	max_results: usize,
	score_threshold: f32,
}
impl SemanticSearch {
	pub fn new(
		cfg: &Config,
		embedding: Arc<dyn EmbeddingProvider>,
		index: Arc<dyn VectorIndex>,
	) -> Self {
		Self {
			embedding,
			index,
			embedding_cfg: cfg.providers.embedding.clone(),
			fetch_k: cfg.vector.fetch_k,
			max_results: cfg.vector.max_results,
			score_threshold: cfg.vector.score_threshold,
		}
	}

	/// Page-content snippets in retrieval order, trimmed, non-empty and capped.
	pub async fn fetch(&self, query: &str) -> Result<Vec<String>> {
		let texts = vec![query.to_string()];
		let vector = self
			.embedding
			.embed(&self.embedding_cfg, &texts)
			.await?
			.into_iter()
			.next()
			.ok_or_else(|| Error::Provider {
				message: "Embedding response is empty.".to_string(),
			})?;
		let hits = self.index.search(vector, self.fetch_k, self.score_threshold).await?;

		Ok(clean_snippets(hits, self.max_results))
	}
}

pub(crate) fn parse_entry(raw: &str) -> Option<Filter> {
	let value: Value = serde_json::from_str(raw).ok()?;

	match Filter::from_value(value) {
		Ok(filter) => Some(filter),
		Err(err) => {
			tracing::debug!(error = %err, "Previous query entry is not a filter.");

			None
		},
	}
}

fn clean_snippets(hits: Vec<String>, cap: usize) -> Vec<String> {
	hits.into_iter()
		.map(|hit| hit.trim().to_string())
		.filter(|hit| !hit.is_empty())
		.take(cap)
		.collect()
}
