//! Parsing of generated chat answers: item splitting, no-result claims and listing links.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use unicode_segmentation::UnicodeSegmentation;

use crate::extract::ExtractedFields;

const MIN_ITEM_CHARS: usize = 10;
const SHORT_ITEM_CHARS: usize = 120;
const TITLE_FALLBACK_GRAPHEMES: usize = 80;

static LINKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").expect("link regex"));
static ITEM_START: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?m)^\s*(?:\d+[.)]\s+|\*\s+)").expect("item start regex"));
static LINK_LABEL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)(?:^|\n)\s*-\s*\*\*Link:\*\*|\n\s*Link:").expect("link label regex")
});
static NO_RESULT_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	[
		r"\bmaaf\b.*\btidak (?:menemukan|ada)\b",
		r"\btidak (?:menemukan|ada)\b.*\b(?:data|hasil)\b",
		r"\bbelum ada\b.*\b(?:data|hasil)\b",
		r"\bno results?\b",
		r"\bno listings?\b",
		r"\bnot found\b",
		r"\bdata (?:tidak|nggak|gak) ditemukan\b",
		r"\bhasil pencarian\b.*\bkosong\b",
		r"\bbelum tersedia\b",
		r"\btidak ada\b.*\b(?:rumah|listing|properti|unit)\b",
		r"\bsemua\s+listing\b.*(?:\bdi atas\b|\blebih dari\b|>)",
		r"\bbelum ditemukan\b",
		r"\btidak tersedia\b.*\b(?:rumah|listing|properti|unit)\b",
	]
	.iter()
	.map(|pattern| Regex::new(pattern).expect("no-result regex"))
	.collect()
});
static NEGATIVE_TONE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\b(?:tidak|nggak|gak|bukan)\b").expect("negative tone regex"));
static EMPHASIS: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("emphasis regex"));
static LISTING_PATH_ID: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"/listing/(\d+)").expect("listing path regex"));
static TRAILING_ID: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"/(\d+)(?:\D|$)").expect("trailing id regex"));

/// Splits a multi-listing answer into items using link count, list markers and link labels.
pub fn split_listings(answer: &str) -> Vec<String> {
	let text = answer.trim_matches('\n');

	if LINKS.find_iter(text).count() == 1 {
		return vec![text.to_string()];
	}

	let starts: Vec<usize> = ITEM_START.find_iter(text).map(|found| found.start()).collect();

	if starts.len() >= 2 {
		let items: Vec<String> = starts
			.iter()
			.enumerate()
			.map(|(idx, start)| {
				let end = starts.get(idx + 1).copied().unwrap_or(text.len());

				text[*start..end].trim().to_string()
			})
			.filter(|chunk| chunk.chars().count() > MIN_ITEM_CHARS)
			.collect();
		let short = items.iter().filter(|item| item.chars().count() < SHORT_ITEM_CHARS).count();

		// Many tiny chunks usually mean a bulleted attribute list inside one listing.
		if !items.is_empty() && short + 1 >= items.len() {
			return vec![text.to_string()];
		}

		return items;
	}

	let parts: Vec<&str> = LINK_LABEL.split(text).collect();

	if parts.len() > 1 {
		let rebuilt: Vec<String> = parts
			.windows(2)
			.filter_map(|pair| {
				let head = pair[0].rsplit("\n\n").next().unwrap_or_default();
				let tail = pair[1].split("\n\n").next().unwrap_or_default();
				let segment = format!("{head}\nLink:{tail}").trim().to_string();

				(segment.chars().count() > MIN_ITEM_CHARS).then_some(segment)
			})
			.collect();

		if !rebuilt.is_empty() {
			return rebuilt;
		}
	}

	vec![text.trim().to_string()]
}

/// Whether the whole answer claims that nothing matched.
pub fn looks_like_no_result(answer: &str) -> bool {
	let lower = answer.to_lowercase();

	if NO_RESULT_PHRASES.iter().any(|re| re.is_match(&lower)) {
		return true;
	}

	let fields = ExtractedFields::from_text(answer);
	let has_link = LINKS.is_match(answer);
	let has_digit = answer.chars().any(|ch| ch.is_ascii_digit());

	!has_link
		&& fields.price.is_none()
		&& fields.kamar_tidur.is_none()
		&& !has_digit
		&& NEGATIVE_TONE.is_match(&lower)
}

/// Short label for an item: the first emphasised span, else the first non-empty line.
pub fn title_snippet(item: &str) -> String {
	let raw = match EMPHASIS.captures(item).and_then(|caps| caps.get(1)) {
		Some(found) => found.as_str().to_string(),
		None => item
			.lines()
			.map(str::trim)
			.find(|line| !line.is_empty())
			.unwrap_or_default()
			.graphemes(true)
			.take(TITLE_FALLBACK_GRAPHEMES)
			.collect(),
	};

	raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn parse_listing_id(link: &str) -> Option<u64> {
	[&*LISTING_PATH_ID, &*TRAILING_ID].into_iter().find_map(|re| {
		re.captures(link).and_then(|caps| caps.get(1)).and_then(|id| id.as_str().parse().ok())
	})
}

/// Whether a listing API response body carries no rows.
pub fn response_is_empty(body: &str) -> bool {
	let trimmed = body.trim();

	if trimmed.is_empty() {
		return true;
	}

	match serde_json::from_str::<Value>(trimmed) {
		Ok(Value::Null) => true,
		Ok(Value::String(text)) => text.trim().is_empty(),
		Ok(Value::Array(rows)) => rows.is_empty(),
		Ok(Value::Object(map)) => {
			let empty_rows = |key: &str| matches!(map.get(key), Some(Value::Array(rows)) if rows.is_empty());
			let zero_count = match map.get("count") {
				Some(Value::Number(count)) => count.as_f64() == Some(0.0),
				Some(Value::String(count)) => count.trim() == "0",
				_ => false,
			};

			map.is_empty() || empty_rows("data") || empty_rows("rows") || zero_count
		},
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn single_link_answer_is_one_item() {
		let answer = "1. Rumah A\n2. Detail lain yang panjang\nLink: https://x/listing/1";

		assert_eq!(split_listings(answer).len(), 1);
	}

	#[test]
	fn numbered_listings_split_into_items() {
		let long = "x".repeat(130);
		let answer = format!(
			"Berikut hasilnya:\n1. Rumah A {long} https://x/listing/1\n2. Rumah B {long} https://x/listing/2\n3. Rumah C {long} https://x/listing/3"
		);
		let items = split_listings(&answer);

		assert_eq!(items.len(), 3);
		assert!(items[1].starts_with("2. Rumah B"));
	}

	#[test]
	fn short_bullets_stay_one_item() {
		let answer = "* Harga: Rp 1 M ok\n* Kamar tidur: 3 ok\n* LT 120 m2 ok sip\nhttps://a/1 https://a/2";

		assert_eq!(split_listings(answer), vec![answer.to_string()]);
	}

	#[test]
	fn link_labels_split_unnumbered_listings() {
		let answer = "Rumah Cemara dijual\n- **Link:** https://x/listing/1\n\nRuko Ringroad disewa\n- **Link:** https://x/listing/2";
		let items = split_listings(answer);

		assert_eq!(items.len(), 2);
		assert!(items[0].starts_with("Rumah Cemara dijual"));
		assert!(items[1].contains("https://x/listing/2"));
	}

	#[test]
	fn no_result_phrases_are_detected() {
		assert!(looks_like_no_result("Maaf, saya tidak menemukan rumah yang sesuai."));
		assert!(looks_like_no_result("No results for that query."));
		assert!(looks_like_no_result("Wah, sepertinya bukan yang Anda cari."));
		assert!(!looks_like_no_result("Rumah dijual Rp 850 juta, 3 KT. https://x/listing/1"));
	}

	#[test]
	fn titles_prefer_emphasis() {
		assert_eq!(title_snippet("1. *Rumah   Cemara*\nLT 120"), "Rumah Cemara");
		assert_eq!(title_snippet("\n  Ruko Ringroad \nLT 120"), "Ruko Ringroad");
	}

	#[test]
	fn listing_ids_come_from_link_paths() {
		assert_eq!(parse_listing_id("https://x.id/listing/42?ref=chat"), Some(42));
		assert_eq!(parse_listing_id("https://x.id/p/77/rumah"), Some(77));
		assert_eq!(parse_listing_id("https://x.id/about"), None);
	}

	#[test]
	fn empty_response_shapes() {
		for body in ["", "  ", "null", "[]", "{}", "\"\"", r#"{"data": []}"#, r#"{"count": "0"}"#]
		{
			assert!(response_is_empty(body), "Expected {body:?} to be empty.");
		}

		assert!(!response_is_empty("Rumah A\n-----\nRumah B"));
		assert!(!response_is_empty(r#"{"data": [{"id": 1}]}"#));
	}
}
