use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub listing_api: ListingApi,
	pub providers: Providers,
	pub vector: Vector,
	pub retrieval: Retrieval,
	pub session: Session,
	pub evaluation: Evaluation,
	pub telemetry: Telemetry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

/// Structured listing API. Blank `api_base` or `api_token` means the credentials are missing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingApi {
	pub api_base: String,
	pub api_token: String,
	#[serde(default = "default_query_path")]
	pub query_path: String,
	#[serde(default = "default_chat_history_path")]
	pub chat_history_path: String,
	#[serde(default = "default_listing_timeout_ms")]
	pub timeout_ms: u64,
}
impl ListingApi {
	pub fn has_credentials(&self) -> bool {
		!self.api_base.trim().is_empty() && !self.api_token.trim().is_empty()
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Vector {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
	/// Number of nearest neighbours requested from the index before post-filtering.
	#[serde(default = "default_fetch_k")]
	pub fetch_k: u64,
	/// Cap applied after empty snippets are dropped.
	#[serde(default = "default_max_results")]
	pub max_results: usize,
	#[serde(default = "default_score_threshold")]
	pub score_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Retrieval {
	#[serde(default = "default_target_n")]
	pub target_n: usize,
	#[serde(default = "default_page_size")]
	pub page_size: u32,
	/// One of "subset" or "exact".
	#[serde(default = "default_continuity")]
	pub continuity: String,
	#[serde(default = "default_history_turns")]
	pub history_turns: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
	#[serde(default = "default_max_messages")]
	pub max_messages: usize,
	#[serde(default = "default_idle_ttl_secs")]
	pub idle_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Evaluation {
	#[serde(default = "default_cpr_threshold")]
	pub cpr_threshold: f64,
	#[serde(default = "default_keyword_threshold")]
	pub keyword_threshold: f64,
	#[serde(default = "default_address_threshold")]
	pub address_threshold: f64,
	#[serde(default = "default_phrase_threshold")]
	pub phrase_threshold: f64,
	#[serde(default = "default_concurrency")]
	pub concurrency: usize,
	pub audit_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Telemetry {
	#[serde(default = "default_input_usd_per_mtok")]
	pub input_usd_per_mtok: f64,
	#[serde(default = "default_output_usd_per_mtok")]
	pub output_usd_per_mtok: f64,
	#[serde(default = "default_idr_per_usd")]
	pub idr_per_usd: f64,
}

fn default_query_path() -> String {
	"/query_listing".to_string()
}

fn default_chat_history_path() -> String {
	"/chat_history".to_string()
}

fn default_listing_timeout_ms() -> u64 {
	15_000
}

fn default_fetch_k() -> u64 {
	1_500
}

fn default_max_results() -> usize {
	100
}

fn default_score_threshold() -> f32 {
	0.35
}

fn default_target_n() -> usize {
	5
}

fn default_page_size() -> u32 {
	20
}

fn default_continuity() -> String {
	"subset".to_string()
}

fn default_history_turns() -> usize {
	10
}

fn default_max_messages() -> usize {
	200
}

fn default_idle_ttl_secs() -> u64 {
	3_600
}

fn default_cpr_threshold() -> f64 {
	0.60
}

fn default_keyword_threshold() -> f64 {
	85.0
}

fn default_address_threshold() -> f64 {
	70.0
}

fn default_phrase_threshold() -> f64 {
	80.0
}

fn default_concurrency() -> usize {
	4
}

fn default_input_usd_per_mtok() -> f64 {
	0.15
}

fn default_output_usd_per_mtok() -> f64 {
	0.60
}

fn default_idr_per_usd() -> f64 {
	17_000.0
}
