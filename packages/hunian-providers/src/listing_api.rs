use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Telemetry row appended to the chat-history endpoint after each turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryRecord {
	pub chat_session_id: String,
	pub human: String,
	pub ai: String,
	pub method: String,
	pub input_token: u64,
	pub output_token: u64,
	pub total_token: u64,
	pub response_count: u32,
	/// Milliseconds.
	pub response_time: u64,
	pub cost_usd: f64,
	pub cost_idr: f64,
}

/// Posts a filter-shaped body to the query endpoint and returns the raw response text.
pub async fn query_listings<T>(cfg: &hunian_config::ListingApi, body: &T) -> Result<String>
where
	T: Serialize + ?Sized,
{
	let client = client(cfg)?;
	let res = client
		.post(format!("{}{}", cfg.api_base, cfg.query_path))
		.headers(headers(cfg)?)
		.json(body)
		.send()
		.await
		.map_err(Error::transport(cfg.timeout_ms))?;

	res.error_for_status()
		.map_err(Error::transport(cfg.timeout_ms))?
		.text()
		.await
		.map_err(Error::transport(cfg.timeout_ms))
}

/// Looks up one listing by id. Non-JSON bodies are invalid responses.
pub async fn fetch_listing(cfg: &hunian_config::ListingApi, listing_id: u64) -> Result<Value> {
	let body = serde_json::json!({ "listing_id": listing_id });
	let text = query_listings(cfg, &body).await?;

	parse_listing_response(&text)
}

pub async fn post_chat_history(
	cfg: &hunian_config::ListingApi,
	record: &ChatHistoryRecord,
) -> Result<()> {
	let client = client(cfg)?;

	client
		.post(format!("{}{}", cfg.api_base, cfg.chat_history_path))
		.headers(headers(cfg)?)
		.json(record)
		.send()
		.await
		.map_err(Error::transport(cfg.timeout_ms))?
		.error_for_status()
		.map_err(Error::transport(cfg.timeout_ms))?;

	Ok(())
}

fn client(cfg: &hunian_config::ListingApi) -> Result<Client> {
	if !cfg.has_credentials() {
		return Err(Error::MissingCredentials);
	}

	Ok(Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?)
}

fn headers(cfg: &hunian_config::ListingApi) -> Result<HeaderMap> {
	crate::auth_headers(&cfg.api_token, &Map::new())
}

fn parse_listing_response(text: &str) -> Result<Value> {
	serde_json::from_str(text.trim()).map_err(|err| Error::InvalidResponse {
		message: format!("Listing lookup response is not JSON: {err}."),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn chat_history_record_uses_wire_keys() {
		let record = ChatHistoryRecord {
			chat_session_id: "s-1".to_string(),
			human: "rumah di medan".to_string(),
			ai: "Berikut hasilnya".to_string(),
			method: "hybrid".to_string(),
			input_token: 1_000,
			output_token: 200,
			total_token: 1_200,
			response_count: 3,
			response_time: 850,
			cost_usd: 0.00027,
			cost_idr: 4.59,
		};
		let json = serde_json::to_value(&record).expect("serialize failed");

		assert_eq!(json["chat_session_id"], "s-1");
		assert_eq!(json["response_time"], 850);
		assert_eq!(json.as_object().map(Map::len), Some(11));
	}

	#[test]
	fn listing_lookup_must_be_json() {
		assert!(parse_listing_response(" {\"data\": []} ").is_ok());

		let err = parse_listing_response("Rumah A\n-----").expect_err("Expected invalid response.");

		assert_eq!(err.kind(), "invalid_response");
	}
}
