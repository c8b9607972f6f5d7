//! Structured-first Top-N selection across the listing API and the vector index.

use std::collections::HashSet;

use serde::Serialize;

use crate::{filter::Filter, listing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
	Structured,
	Semantic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
	pub source: Source,
	pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
	pub items: Vec<Candidate>,
	pub structured_count: usize,
	pub vector_count: usize,
}
impl Selection {
	pub fn selected_count(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// Selected items joined by a blank line.
	pub fn text(&self) -> String {
		self.items.iter().map(|item| item.text.as_str()).collect::<Vec<_>>().join("\n\n")
	}
}

/// Fills up to `target_n` items from structured blocks first, then from vector items.
///
/// Both sources share one identity key set, so a vector item that is key-equal to a chosen
/// structured block is skipped. No reranking is applied.
pub fn select<S>(structured_text: &str, vector_items: &[S], target_n: usize) -> Selection
where
	S: AsRef<str>,
{
	let structured = listing::dedupe(listing::split_blocks(structured_text));
	let semantic = listing::dedupe(vector_items);
	let mut seen = HashSet::new();
	let mut selection = Selection::default();

	for (source, texts) in [(Source::Structured, structured), (Source::Semantic, semantic)] {
		for text in texts {
			if selection.items.len() >= target_n {
				return selection;
			}
			if !seen.insert(listing::identity_key(&text)) {
				continue;
			}

			match source {
				Source::Structured => selection.structured_count += 1,
				Source::Semantic => selection.vector_count += 1,
			}

			selection.items.push(Candidate { source, text });
		}
	}

	selection
}

/// Vector items may back-fill unless a hard filter produced no structured blocks.
pub fn vector_fallback_allowed(filter: &Filter, structured_blocks: usize) -> bool {
	!(filter.is_hard() && structured_blocks == 0)
}
