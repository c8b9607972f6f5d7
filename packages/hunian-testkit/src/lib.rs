mod error;

pub use error::{Error, Result};

use std::{
	collections::{BTreeMap, HashMap},
	future::IntoFuture,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use axum::{
	Json, Router,
	extract::State,
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	response::{IntoResponse, Response},
	routing,
};
use serde_json::{Map, Value};
use tokio::{
	net::TcpListener,
	sync::{oneshot, oneshot::Sender},
	time,
};

use hunian_config::{
	Config, EmbeddingProviderConfig, Evaluation, ListingApi, LlmProviderConfig, Providers,
	Retrieval, Service, Session, Telemetry, Vector,
};

pub const TEST_TOKEN: &str = "test-token";
pub const TEST_VECTOR_DIM: u32 = 4;

/// A config whose listing API points at `listing_base` and whose other collaborators are unroutable.
pub fn test_config(listing_base: &str) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		listing_api: ListingApi {
			api_base: listing_base.trim_end_matches('/').to_string(),
			api_token: TEST_TOKEN.to_string(),
			query_path: "/query_listing".to_string(),
			chat_history_path: "/chat_history".to_string(),
			timeout_ms: 2_000,
		},
		providers: Providers { llm: dummy_llm_provider(), embedding: dummy_embedding_provider() },
		vector: Vector {
			url: "http://127.0.0.1:1".to_string(),
			collection: "listings_test".to_string(),
			vector_dim: TEST_VECTOR_DIM,
			fetch_k: 50,
			max_results: 10,
			score_threshold: 0.0,
		},
		retrieval: Retrieval {
			target_n: 5,
			page_size: 20,
			continuity: "subset".to_string(),
			history_turns: 10,
		},
		session: Session { max_messages: 200, idle_ttl_secs: 3_600 },
		evaluation: Evaluation {
			cpr_threshold: 0.60,
			keyword_threshold: 85.0,
			address_threshold: 70.0,
			phrase_threshold: 80.0,
			concurrency: 4,
			audit_dir: None,
		},
		telemetry: Telemetry {
			input_usd_per_mtok: 0.15,
			output_usd_per_mtok: 0.60,
			idr_per_usd: 17_000.0,
		},
	}
}

pub fn dummy_llm_provider() -> LlmProviderConfig {
	LlmProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		api_key: "test-key".to_string(),
		path: "/chat/completions".to_string(),
		model: "test".to_string(),
		temperature: 0.0,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

pub fn dummy_embedding_provider() -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "test".to_string(),
		api_base: "http://127.0.0.1:1".to_string(),
		api_key: "test-key".to_string(),
		path: "/embeddings".to_string(),
		model: "test".to_string(),
		dimensions: TEST_VECTOR_DIM,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
	pub path: String,
	pub authorization: Option<String>,
	pub body: Value,
}

/// Configures the canned responses of a [`ListingStub`].
#[derive(Debug, Default)]
pub struct ListingStubBuilder {
	default_text: String,
	pages: BTreeMap<u32, String>,
	listings: HashMap<u64, Value>,
	status: Option<StatusCode>,
	delay: Duration,
}
impl ListingStubBuilder {
	/// Body returned for filter queries whose page has no dedicated text.
	pub fn query_text(mut self, text: impl Into<String>) -> Self {
		self.default_text = text.into();

		self
	}

	pub fn page_text(mut self, page: u32, text: impl Into<String>) -> Self {
		self.pages.insert(page, text.into());

		self
	}

	/// JSON returned for a `{"listing_id": id}` lookup.
	pub fn listing(mut self, listing_id: u64, record: Value) -> Self {
		self.listings.insert(listing_id, record);

		self
	}

	/// Answers every request with this status and an empty body.
	pub fn status(mut self, status: u16) -> Self {
		self.status = StatusCode::from_u16(status).ok();

		self
	}

	pub fn delay(mut self, delay: Duration) -> Self {
		self.delay = delay;

		self
	}

	pub async fn start(self) -> Result<ListingStub> {
		let state = Arc::new(StubState {
			default_text: self.default_text,
			pages: self.pages,
			listings: self.listings,
			status: self.status,
			delay: self.delay,
			requests: Mutex::new(Vec::new()),
			lookups: AtomicUsize::new(0),
		});
		let app = Router::new()
			.route("/query_listing", routing::post(query_handler))
			.route("/chat_history", routing::post(chat_history_handler))
			.with_state(state.clone());
		let listener = TcpListener::bind("127.0.0.1:0").await?;
		let addr = listener.local_addr()?;
		let (tx, rx) = oneshot::channel();
		let server = axum::serve(listener, app).with_graceful_shutdown(async move {
			let _ = rx.await;
		});

		tokio::spawn(async move {
			let _ = server.into_future().await;
		});

		Ok(ListingStub { base_url: format!("http://{addr}"), state, shutdown: Some(tx) })
	}
}

/// In-process stand-in for the listing API: `POST /query_listing` and `POST /chat_history`.
pub struct ListingStub {
	base_url: String,
	state: Arc<StubState>,
	shutdown: Option<Sender<()>>,
}
impl ListingStub {
	pub fn builder() -> ListingStubBuilder {
		ListingStubBuilder::default()
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub fn requests(&self) -> Vec<RecordedRequest> {
		self.state.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
		self.requests().into_iter().filter(|request| request.path == path).collect()
	}

	/// Number of listing-id lookups served.
	pub fn lookup_count(&self) -> usize {
		self.state.lookups.load(Ordering::SeqCst)
	}

	/// Polls until `count` chat-history posts arrive or the deadline passes.
	pub async fn wait_for_chat_history(&self, count: usize, deadline: Duration) -> Result<()> {
		let start = time::Instant::now();

		while self.requests_to("/chat_history").len() < count {
			if start.elapsed() >= deadline {
				return Err(Error::Message(format!(
					"Expected {count} chat history posts within {deadline:?}."
				)));
			}

			time::sleep(Duration::from_millis(10)).await;
		}

		Ok(())
	}
}
impl Drop for ListingStub {
	fn drop(&mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
	}
}

struct StubState {
	default_text: String,
	pages: BTreeMap<u32, String>,
	listings: HashMap<u64, Value>,
	status: Option<StatusCode>,
	delay: Duration,
	requests: Mutex<Vec<RecordedRequest>>,
	lookups: AtomicUsize,
}
impl StubState {
	fn record(&self, path: &str, headers: &HeaderMap, body: Value) {
		let authorization =
			headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).map(str::to_string);
		let mut requests = self.requests.lock().unwrap_or_else(|err| err.into_inner());

		requests.push(RecordedRequest { path: path.to_string(), authorization, body });
	}
}

async fn query_handler(
	State(state): State<Arc<StubState>>,
	headers: HeaderMap,
	Json(body): Json<Value>,
) -> Response {
	state.record("/query_listing", &headers, body.clone());

	if !state.delay.is_zero() {
		time::sleep(state.delay).await;
	}
	if let Some(status) = state.status {
		return status.into_response();
	}
	if let Some(listing_id) = body.get("listing_id").and_then(Value::as_u64) {
		state.lookups.fetch_add(1, Ordering::SeqCst);

		return match state.listings.get(&listing_id) {
			Some(record) => Json(record.clone()).into_response(),
			None => Json(serde_json::json!({ "data": [] })).into_response(),
		};
	}

	let page = body.get("page").and_then(Value::as_u64).and_then(|page| u32::try_from(page).ok());
	let text = page.and_then(|page| state.pages.get(&page)).unwrap_or(&state.default_text);

	(StatusCode::OK, text.clone()).into_response()
}

async fn chat_history_handler(
	State(state): State<Arc<StubState>>,
	headers: HeaderMap,
	Json(body): Json<Value>,
) -> Response {
	state.record("/chat_history", &headers, body);

	if let Some(status) = state.status {
		return status.into_response();
	}

	Json(serde_json::json!({ "status": "ok" })).into_response()
}
