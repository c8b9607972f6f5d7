use std::{
	collections::VecDeque,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use serde_json::{Value, json};

use hunian_config::{Config, EmbeddingProviderConfig, ListingApi, LlmProviderConfig};
use hunian_domain::{constraint::Gold, intent::Intent, scoring::Emptiness};
use hunian_providers::{
	listing_api::{self, ChatHistoryRecord},
	llm::{ChatMessage, Completion, TokenUsage},
};
use hunian_service::{
	Assistant, BoxFuture, ChatModel, EmbeddingProvider, Error, Evaluator, ListingSource,
	Providers, RetrievalMode, StructuredStatus, TurnRequest, VectorIndex, prompts,
};
use hunian_storage::session::MemorySessionStore;
use hunian_testkit::{ListingStub, TEST_VECTOR_DIM, test_config};

struct ScriptedChat {
	replies: Mutex<VecDeque<String>>,
	calls: Mutex<Vec<Vec<ChatMessage>>>,
}
impl ScriptedChat {
	fn new(replies: &[&str]) -> Arc<Self> {
		Arc::new(Self {
			replies: Mutex::new(replies.iter().map(|reply| reply.to_string()).collect()),
			calls: Mutex::new(Vec::new()),
		})
	}

	fn calls(&self) -> Vec<Vec<ChatMessage>> {
		self.calls.lock().expect("calls lock").clone()
	}
}
impl ChatModel for ScriptedChat {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, hunian_providers::Result<Completion>> {
		self.calls.lock().expect("calls lock").push(messages.to_vec());

		let reply = self.replies.lock().expect("replies lock").pop_front();

		Box::pin(async move {
			let content = reply.ok_or_else(|| hunian_providers::Error::InvalidResponse {
				message: "Script exhausted.".to_string(),
			})?;

			Ok(Completion {
				content,
				usage: TokenUsage { prompt_tokens: 100, completion_tokens: 20, total_tokens: 120 },
			})
		})
	}
}

struct StubEmbedding;
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, hunian_providers::Result<Vec<Vec<f32>>>> {
		let vectors = texts.iter().map(|_| vec![0.0; TEST_VECTOR_DIM as usize]).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

struct StubIndex {
	items: Vec<String>,
	calls: AtomicUsize,
}
impl StubIndex {
	fn new(items: &[&str]) -> Arc<Self> {
		Arc::new(Self {
			items: items.iter().map(|item| item.to_string()).collect(),
			calls: AtomicUsize::new(0),
		})
	}
}
impl VectorIndex for StubIndex {
	fn search<'a>(
		&'a self,
		_vector: Vec<f32>,
		_limit: u64,
		_score_threshold: f32,
	) -> BoxFuture<'a, hunian_storage::Result<Vec<String>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let items = self.items.clone();

		Box::pin(async move { Ok(items) })
	}
}

struct HttpListing;
impl ListingSource for HttpListing {
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

fn assistant(cfg: Config, chat: Arc<ScriptedChat>, index: Arc<StubIndex>) -> Assistant {
	let providers = Providers::new(chat, Arc::new(StubEmbedding), Arc::new(HttpListing));
	let sessions = Arc::new(MemorySessionStore::new(&cfg.session));

	Assistant::new(cfg, providers, index, sessions).expect("Failed to build assistant.")
}

async fn stub(text: &str) -> ListingStub {
	ListingStub::builder().query_text(text).start().await.expect("Failed to start listing stub.")
}

const VECTOR_ITEMS: [&str; 2] =
	["Rumah Vektor A\nhttps://x/listing/901", "Rumah Vektor B\nhttps://x/listing/902"];

#[tokio::test]
async fn repeated_search_advances_to_the_next_page() {
	let stub = ListingStub::builder()
		.page_text(1, "Ruko Ringroad 1\nLink: https://x/listing/1")
		.page_text(2, "Ruko Ringroad 2\nLink: https://x/listing/2")
		.start()
		.await
		.expect("Failed to start listing stub.");
	let filter = r#"{"keyword": "ringroad", "harga_max": 800000000}"#;
	let chat = ScriptedChat::new(&[
		"Ruko di ringroad di bawah 800 juta",
		"1",
		filter,
		"Ini ruko pertama.",
		"Ada ruko lain di ringroad di bawah 800 juta?",
		"1",
		filter,
		"Ini ruko berikutnya.",
	]);
	let assistant = assistant(test_config(stub.base_url()), chat.clone(), StubIndex::new(&[]));
	let first = assistant
		.handle_turn(TurnRequest::new("s-1", "ruko ringroad dibawah 800jt"))
		.await
		.expect("first turn failed");
	let second = assistant
		.handle_turn(TurnRequest::new("s-1", "ada yang lain?"))
		.await
		.expect("second turn failed");
	let queries = stub.requests_to("/query_listing");

	assert_eq!(queries.len(), 2);
	assert_eq!(queries[0].body["page"], 1);
	assert_eq!(queries[1].body["page"], 2);
	assert_eq!(queries[1].body["paginate"], 20);
	assert_eq!(queries[1].body["is_hard_filter"], true);
	assert_eq!(first.intent, Intent::Search);
	assert_eq!(second.filter.as_ref().and_then(|filter| filter.page), Some(2));
	assert_eq!(second.structured, StructuredStatus::Ok { blocks: 1 });

	let second_filter_prompt = &chat.calls()[6][0].content;

	assert!(
		second_filter_prompt.contains(r#""page":1"#),
		"Expected the previous filter as context."
	);
}

#[tokio::test]
async fn changed_filter_resets_to_the_first_page() {
	let stub = stub("Ruko Ringroad\nLink: https://x/listing/1").await;
	let chat = ScriptedChat::new(&[
		"Ruko ringroad di bawah 800 juta",
		"1",
		r#"{"keyword": "ringroad", "harga_max": 800000000}"#,
		"Ini rukonya.",
		"Ruko ringroad di bawah 500 juta",
		"1",
		r#"{"keyword": "ringroad", "harga_max": 500000000}"#,
		"Ini rukonya.",
	]);
	let assistant = assistant(test_config(stub.base_url()), chat, StubIndex::new(&[]));

	for question in ["ruko ringroad < 800jt", "kalau di bawah 500jt?"] {
		assistant.handle_turn(TurnRequest::new("s-2", question)).await.expect("turn failed");
	}

	let queries = stub.requests_to("/query_listing");

	assert_eq!(queries[1].body["page"], 1);
}

#[tokio::test]
async fn hard_filter_without_structured_rows_never_uses_vector_items() {
	for mode in [RetrievalMode::Hybrid, RetrievalMode::Structured] {
		let stub = stub("").await;
		let chat = ScriptedChat::new(&[
			"Rumah 3 kamar di medan",
			"1",
			r#"{"keyword": "medan", "kamar_tidur": 3}"#,
			"Maaf, belum ada yang cocok.",
		]);
		let index = StubIndex::new(&VECTOR_ITEMS);
		let assistant = assistant(test_config(stub.base_url()), chat.clone(), index.clone());
		let report = assistant
			.handle_turn(TurnRequest::new("s-3", "rumah 3 kamar di medan").with_mode(mode))
			.await
			.expect("turn failed");

		assert_eq!(report.structured, StructuredStatus::Ok { blocks: 0 });
		assert_eq!(report.vector_count, 0, "Expected no vector items in {mode:?}.");
		assert_eq!(report.selected_count, 0);
		assert!(chat.calls()[3][1].content.contains("(kosong)"));

		if mode == RetrievalMode::Structured {
			assert_eq!(index.calls.load(Ordering::SeqCst), 0);
		}
	}
}

#[tokio::test]
async fn soft_filter_without_structured_rows_is_back_filled() {
	for mode in [RetrievalMode::Hybrid, RetrievalMode::Structured] {
		let stub = stub("").await;
		let chat = ScriptedChat::new(&[
			"Rumah di medan",
			"1",
			r#"{"keyword": "medan"}"#,
			"Berikut rumah di Medan.",
		]);
		let assistant =
			assistant(test_config(stub.base_url()), chat, StubIndex::new(&VECTOR_ITEMS));
		let report = assistant
			.handle_turn(TurnRequest::new("s-4", "rumah di medan").with_mode(mode))
			.await
			.expect("turn failed");

		assert_eq!(report.structured_count, 0);
		assert_eq!(report.vector_count, 2, "Expected vector back-fill in {mode:?}.");
	}
}

#[tokio::test]
async fn structured_rows_come_before_vector_items() {
	let stub = stub(
		"Rumah A\nLink: https://x/listing/1\n-----\nRumah B\nLink: https://x/listing/901\n",
	)
	.await;
	let chat = ScriptedChat::new(&["Rumah di medan", "1", r#"{"keyword": "medan"}"#, "Hasil."]);
	let assistant =
		assistant(test_config(stub.base_url()), chat.clone(), StubIndex::new(&VECTOR_ITEMS));
	let report =
		assistant.handle_turn(TurnRequest::new("s-5", "rumah di medan")).await.expect("turn failed");
	let data_prompt = &chat.calls()[3][1].content;

	assert_eq!((report.structured_count, report.vector_count, report.selected_count), (2, 1, 3));
	assert!(data_prompt.find("Rumah A") < data_prompt.find("Rumah Vektor B"));
	assert!(
		!data_prompt.contains("Rumah Vektor A"),
		"Expected the key-equal vector item to be skipped."
	);
}

#[tokio::test]
async fn structured_failure_is_reported_without_failing_the_turn() {
	let stub =
		ListingStub::builder().status(500).start().await.expect("Failed to start listing stub.");
	let chat = ScriptedChat::new(&["Rumah di medan", "1", r#"{"keyword": "medan"}"#, "Hasil."]);
	let assistant = assistant(test_config(stub.base_url()), chat, StubIndex::new(&VECTOR_ITEMS));
	let report =
		assistant.handle_turn(TurnRequest::new("s-6", "rumah di medan")).await.expect("turn failed");

	assert_eq!(report.structured, StructuredStatus::Failed { kind: "http_status" });
	assert_eq!(report.vector_count, 2);
}

#[tokio::test]
async fn unparseable_filter_fails_the_turn() {
	let stub = stub("").await;
	let chat = ScriptedChat::new(&["Rumah di medan", "1", "Maaf, saya tidak paham."]);
	let assistant = assistant(test_config(stub.base_url()), chat, StubIndex::new(&[]));
	let err = assistant
		.handle_turn(TurnRequest::new("s-7", "rumah di medan"))
		.await
		.expect_err("Expected malformed filter.");

	assert!(matches!(err, Error::MalformedFilter { .. }));
	assert_eq!(err.kind(), "malformed_filter");
	assert!(stub.requests_to("/query_listing").is_empty());
}

#[tokio::test]
async fn vector_mode_skips_filter_extraction() {
	let stub = stub("Rumah A\nLink: https://x/listing/1").await;
	let chat = ScriptedChat::new(&["Rumah di medan", "1", "Hasil."]);
	let assistant =
		assistant(test_config(stub.base_url()), chat.clone(), StubIndex::new(&VECTOR_ITEMS));
	let report = assistant
		.handle_turn(TurnRequest::new("s-8", "rumah di medan").with_mode(RetrievalMode::Vector))
		.await
		.expect("turn failed");

	assert_eq!(report.filter, None);
	assert_eq!(report.structured, StructuredStatus::Skipped);
	assert_eq!(report.vector_count, 2);
	assert_eq!(chat.calls().len(), 3);
	assert!(stub.requests_to("/query_listing").is_empty());
}

#[tokio::test]
async fn update_requests_get_the_fixed_reply_and_telemetry_is_posted() {
	let stub = stub("").await;
	let chat = ScriptedChat::new(&["Ubah harga listing saya", "2"]);
	let assistant = assistant(test_config(stub.base_url()), chat, StubIndex::new(&[]));
	let report = assistant
		.handle_turn(TurnRequest::new("s-9", "tolong ubah harga listing saya"))
		.await
		.expect("turn failed");

	assert_eq!(report.intent, Intent::UpdateRequest);
	assert_eq!(report.answer, prompts::UPDATE_REQUEST_REPLY);
	assert_eq!(report.response_count, 2);
	assert_eq!(report.usage.total_tokens, 240);

	stub.wait_for_chat_history(1, Duration::from_secs(2)).await.expect("Expected chat history.");

	let posted = &stub.requests_to("/chat_history")[0].body;

	assert_eq!(posted["chat_session_id"], "s-9");
	assert_eq!(posted["method"], "hybrid");
	assert_eq!(posted["input_token"], 200);
}

#[tokio::test]
async fn flushing_waits_for_every_pending_chat_history_post() {
	let stub = stub("").await;
	let chat = ScriptedChat::new(&["Ubah harga", "2", "Ubah status", "2"]);
	let assistant = assistant(test_config(stub.base_url()), chat, StubIndex::new(&[]));

	for (session, question) in [("s-10", "ubah harga"), ("s-11", "ubah status")] {
		assistant.handle_turn(TurnRequest::new(session, question)).await.expect("turn failed");
	}

	assistant.flush_history().await;

	let posted = stub.requests_to("/chat_history");

	assert_eq!(posted.len(), 2);
	assert!(posted.iter().any(|request| request.body["chat_session_id"] == "s-11"));

	assistant.flush_history().await;

	assert_eq!(stub.requests_to("/chat_history").len(), 2);
}

#[tokio::test]
async fn greeting_uses_history_and_the_user_name() {
	let stub = stub("").await;
	let chat = ScriptedChat::new(&[
		"Halo",
		"3",
		"Selamat pagi kk Sari",
		"Halo lagi",
		"3",
		"Ada yang bisa dibantu",
	]);
	let assistant = assistant(test_config(stub.base_url()), chat.clone(), StubIndex::new(&[]));

	for question in ["halo", "halo lagi"] {
		assistant
			.handle_turn(TurnRequest::new("s-10", question).with_user_name("Sari"))
			.await
			.expect("turn failed");
	}

	let calls = chat.calls();

	assert!(calls[2][0].content.contains("kk Sari"));
	assert!(calls[5][1].content.contains("AI: Selamat pagi kk Sari"));
}

#[tokio::test]
async fn blank_questions_are_rejected() {
	let stub = stub("").await;
	let assistant =
		assistant(test_config(stub.base_url()), ScriptedChat::new(&[]), StubIndex::new(&[]));
	let err = assistant
		.handle_turn(TurnRequest::new("s-11", "  "))
		.await
		.expect_err("Expected invalid request.");

	assert_eq!(err.kind(), "invalid_request");
}

fn gold(value: Value) -> Gold {
	Gold::from_value(&value).expect("Expected gold.")
}

#[tokio::test]
async fn truth_lookups_are_shared_across_concurrent_evaluations() {
	let stub = ListingStub::builder()
		.query_text("Rumah Cemara\nLink: https://x/listing/42")
		.listing(42, json!({ "data": [{ "k_tidur": 3, "alamat_ditampilkan": "Jl. Cemara, Medan" }] }))
		.delay(Duration::from_millis(30))
		.start()
		.await
		.expect("Failed to start listing stub.");
	let cfg = test_config(stub.base_url());
	let evaluator = Arc::new(Evaluator::new(&cfg, Arc::new(HttpListing)));
	let gold = gold(json!({ "keyword": "cemara", "kamar_tidur": 3 }));
	let answer = "Rumah dijual di Cemara, 2 KT\nLink: https://x/listing/42";
	let mut handles = Vec::new();

	for _ in 0..4 {
		let evaluator = evaluator.clone();
		let gold = gold.clone();

		handles.push(tokio::spawn(async move { evaluator.evaluate(answer, &gold).await }));
	}

	for handle in handles {
		let evaluation = handle.await.expect("task panicked");

		assert_eq!(evaluation.emptiness, Emptiness::HasData);
		assert_eq!(evaluation.summary.cpr_all(), Some(1.0), "Expected truth bedrooms to win.");
	}

	assert_eq!(stub.lookup_count(), 1);
}

#[tokio::test]
async fn no_result_claims_are_checked_against_the_api() {
	let stub = stub("").await;
	let cfg = test_config(stub.base_url());
	let evaluator = Evaluator::new(&cfg, Arc::new(HttpListing));
	let gold = gold(json!({ "keyword": "ringroad", "harga_max": 100000000, "kondisi": "baru" }));
	let evaluation =
		evaluator.evaluate("Maaf, saya tidak menemukan ruko yang sesuai.", &gold).await;
	let probe = &stub.requests_to("/query_listing")[0].body;

	assert_eq!(evaluation.summary.no_result_score(), Some(1.0));
	assert!(!evaluation.summary.has_items());
	assert_eq!(probe["page"], 1);
	assert_eq!(probe["paginate"], 20);
	assert!(probe.get("kondisi").is_none());
}

#[tokio::test]
async fn missing_credentials_make_the_check_inconclusive() {
	let stub = stub("").await;
	let mut cfg = test_config(stub.base_url());

	cfg.listing_api.api_token = String::new();

	let evaluator = Evaluator::new(&cfg, Arc::new(HttpListing));
	let evaluation = evaluator
		.evaluate("Maaf, tidak ada rumah yang cocok.", &gold(json!({ "keyword": "medan" })))
		.await;

	assert!(matches!(evaluation.emptiness, Emptiness::Unknown { .. }));
	assert_eq!(evaluation.summary.no_result_score(), None);
	assert!(stub.requests().is_empty());
}
