pub mod assistant;
pub mod evaluate;
pub mod prompts;
pub mod retrieval;
pub mod telemetry;

mod error;

pub use assistant::{Assistant, TurnReport, TurnRequest};
pub use error::{Error, Result};
pub use evaluate::{Evaluator, QuestionEvaluation, TruthCache};
pub use hunian_storage::BoxFuture;
pub use retrieval::{RetrievalMode, StructuredStatus};

use std::sync::Arc;

use serde_json::Value;

use hunian_config::{EmbeddingProviderConfig, ListingApi, LlmProviderConfig};
use hunian_providers::{
	embedding,
	listing_api::{self, ChatHistoryRecord},
	llm::{self, ChatMessage, Completion},
};
use hunian_storage::qdrant::QdrantStore;

pub trait ChatModel
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, hunian_providers::Result<Completion>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, hunian_providers::Result<Vec<Vec<f32>>>>;
}

pub trait ListingSource
where
	Self: Send + Sync,
{
	/// Raw response text for a filter-shaped body.
	fn query<'a>(
		&'a self,
		cfg: &'a ListingApi,
		body: &'a Value,
	) -> BoxFuture<'a, hunian_providers::Result<String>>;

	fn fetch_listing<'a>(
		&'a self,
		cfg: &'a ListingApi,
		listing_id: u64,
	) -> BoxFuture<'a, hunian_providers::Result<Value>>;

	fn post_chat_history<'a>(
		&'a self,
		cfg: &'a ListingApi,
		record: &'a ChatHistoryRecord,
	) -> BoxFuture<'a, hunian_providers::Result<()>>;
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Page contents nearest to `vector`, most relevant first.
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u64,
		score_threshold: f32,
	) -> BoxFuture<'a, hunian_storage::Result<Vec<String>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub chat: Arc<dyn ChatModel>,
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub listing: Arc<dyn ListingSource>,
}
impl Providers {
	pub fn new(
		chat: Arc<dyn ChatModel>,
		embedding: Arc<dyn EmbeddingProvider>,
		listing: Arc<dyn ListingSource>,
	) -> Self {
		Self { chat, embedding, listing }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { chat: provider.clone(), embedding: provider.clone(), listing: provider }
	}
}

struct DefaultProviders;
impl ChatModel for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, hunian_providers::Result<Completion>> {
		Box::pin(llm::complete(cfg, messages))
	}
}
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, hunian_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}
impl ListingSource for DefaultProviders {
	fn query<'a>(
		&'a self,
		cfg: &'a ListingApi,
		body: &'a Value,
	) -> BoxFuture<'a, hunian_providers::Result<String>> {
		Box::pin(listing_api::query_listings(cfg, body))
	}

	fn fetch_listing<'a>(
		&'a self,
		cfg: &'a ListingApi,
		listing_id: u64,
	) -> BoxFuture<'a, hunian_providers::Result<Value>> {
		Box::pin(listing_api::fetch_listing(cfg, listing_id))
	}

	fn post_chat_history<'a>(
		&'a self,
		cfg: &'a ListingApi,
		record: &'a ChatHistoryRecord,
	) -> BoxFuture<'a, hunian_providers::Result<()>> {
		Box::pin(listing_api::post_chat_history(cfg, record))
	}
}

impl VectorIndex for QdrantStore {
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		limit: u64,
		score_threshold: f32,
	) -> BoxFuture<'a, hunian_storage::Result<Vec<String>>> {
		Box::pin(self.search_dense(vector, limit, score_threshold))
	}
}
