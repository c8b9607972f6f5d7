use std::{ops::AddAssign, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
	pub role: &'static str,
	pub content: String,
}
impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: "system", content: content.into() }
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self { role: "user", content: content.into() }
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self { role: "assistant", content: content.into() }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenUsage {
	pub prompt_tokens: u64,
	pub completion_tokens: u64,
	pub total_tokens: u64,
}
impl AddAssign for TokenUsage {
	fn add_assign(&mut self, other: Self) {
		self.prompt_tokens += other.prompt_tokens;
		self.completion_tokens += other.completion_tokens;
		self.total_tokens += other.total_tokens;
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
	pub content: String,
	pub usage: TokenUsage,
}

/// One chat completion call. Failures are returned, never retried.
pub async fn complete(
	cfg: &hunian_config::LlmProviderConfig,
	messages: &[ChatMessage],
) -> Result<Completion> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await
		.map_err(Error::transport(cfg.timeout_ms))?;
	let json: Value = res
		.error_for_status()
		.map_err(Error::transport(cfg.timeout_ms))?
		.json()
		.await
		.map_err(Error::transport(cfg.timeout_ms))?;

	parse_completion_response(json)
}

fn parse_completion_response(json: Value) -> Result<Completion> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})?;
	let usage = match json.get("usage") {
		Some(usage) => serde_json::from_value::<TokenUsage>(usage.clone()).unwrap_or_default(),
		None => TokenUsage::default(),
	};

	Ok(Completion { content: content.trim().to_string(), usage })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_and_usage() {
		let json = serde_json::json!({
			"choices": [{ "message": { "role": "assistant", "content": " 1\n" } }],
			"usage": { "prompt_tokens": 12, "completion_tokens": 1, "total_tokens": 13 }
		});
		let parsed = parse_completion_response(json).expect("parse failed");

		assert_eq!(parsed.content, "1");
		assert_eq!(parsed.usage.total_tokens, 13);
	}

	#[test]
	fn missing_usage_counts_as_zero() {
		let json = serde_json::json!({ "choices": [{ "message": { "content": "Halo" } }] });
		let parsed = parse_completion_response(json).expect("parse failed");

		assert_eq!(parsed.usage, TokenUsage::default());
	}

	#[test]
	fn missing_content_is_invalid() {
		let err = parse_completion_response(serde_json::json!({ "choices": [] }))
			.expect_err("Expected invalid response.");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn usage_accumulates() {
		let mut total = TokenUsage::default();

		total += TokenUsage { prompt_tokens: 10, completion_tokens: 2, total_tokens: 12 };
		total += TokenUsage { prompt_tokens: 5, completion_tokens: 1, total_tokens: 6 };

		assert_eq!(total, TokenUsage { prompt_tokens: 15, completion_tokens: 3, total_tokens: 18 });
	}
}
