//! Candidate listing blocks and their identity keys.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

const HEAD_KEY_GRAPHEMES: usize = 120;

static BLOCK_DELIMITER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"-{5,}\s*").expect("block delimiter regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").expect("link regex"));

/// Splits a listing API response into trimmed, non-empty blocks.
pub fn split_blocks(text: &str) -> Vec<String> {
	BLOCK_DELIMITER
		.split(text)
		.map(str::trim)
		.filter(|block| !block.is_empty())
		.map(ToString::to_string)
		.collect()
}

pub fn first_link(text: &str) -> Option<&str> {
	LINK.find(text)
		.map(|found| found.as_str().trim_end_matches(['.', ',', ')', ']', '*']))
		.filter(|link| !link.is_empty())
}

/// Identity key: the first embedded link, else the lowercased first line cut to 120 graphemes.
pub fn identity_key(text: &str) -> String {
	match first_link(text) {
		Some(link) => link.to_string(),
		None => head_key(text),
	}
}

fn head_key(text: &str) -> String {
	let first_line = text.trim().lines().next().unwrap_or_default();
	let head: String = first_line.graphemes(true).take(HEAD_KEY_GRAPHEMES).collect();

	head.trim().to_lowercase()
}

/// Removes key-equal duplicates. The first occurrence wins and order is preserved.
pub fn dedupe<S>(items: impl IntoIterator<Item = S>) -> Vec<String>
where
	S: AsRef<str>,
{
	let mut seen = HashSet::new();

	items
		.into_iter()
		.filter_map(|item| {
			let item = item.as_ref();

			seen.insert(identity_key(item)).then(|| item.to_string())
		})
		.collect()
}
