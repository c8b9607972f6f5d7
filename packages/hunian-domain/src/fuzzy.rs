//! Fuzzy text matching on a 0-100 scale.

use std::collections::BTreeSet;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Lowercases, strips accents and collapses whitespace.
pub fn normalize(text: &str) -> String {
	collapse_whitespace(&strip_accents(&text.to_lowercase()))
}

/// Like [`normalize`], but every run of non-alphanumeric characters becomes one space.
pub fn normalize_for_words(text: &str) -> String {
	let replaced: String = strip_accents(&text.to_lowercase())
		.chars()
		.map(|ch| if ch.is_ascii_lowercase() || ch.is_ascii_digit() { ch } else { ' ' })
		.collect();

	collapse_whitespace(&replaced)
}

/// Whole-word containment after word normalization.
pub fn word_in(text: &str, word: &str) -> bool {
	let word = normalize_for_words(word);

	if word.is_empty() {
		return false;
	}

	format!(" {} ", normalize_for_words(text)).contains(&format!(" {word} "))
}

/// Spelling variants of a keyword: as-is, hyphenated, spaced and joined.
pub fn keyword_variants(keyword: &str) -> BTreeSet<String> {
	let base = normalize(keyword);

	BTreeSet::from([
		base.replace(' ', "-"),
		base.replace('-', " "),
		base.replace([' ', '-'], ""),
		base,
	])
}

/// True when any variant of `keyword` or an alias scores at least `threshold` against `text`.
pub fn contains_keyword(text: &str, keyword: &str, aliases: &[String], threshold: f64) -> bool {
	if keyword.trim().is_empty() {
		return true;
	}

	let text = normalize(text);

	std::iter::once(keyword)
		.chain(aliases.iter().map(String::as_str).filter(|alias| !alias.trim().is_empty()))
		.flat_map(keyword_variants)
		.any(|variant| best_score(&text, &variant) >= threshold)
}

/// True when every phrase scores at least `threshold` against `text`.
pub fn contains_phrases<S>(text: &str, phrases: &[S], threshold: f64) -> bool
where
	S: AsRef<str>,
{
	let phrases: Vec<&str> =
		phrases.iter().map(|p| p.as_ref().trim()).filter(|p| !p.is_empty()).collect();

	if text.trim().is_empty() || phrases.is_empty() {
		return false;
	}

	let text = normalize(text);

	phrases.iter().all(|phrase| best_score(&text, &normalize(phrase)) >= threshold)
}

/// Splits a comma, semicolon or pipe separated list into trimmed, non-empty parts.
pub fn split_list(raw: &str) -> Vec<String> {
	raw.split([',', ';', '|'])
		.map(str::trim)
		.filter(|part| !part.is_empty())
		.map(ToString::to_string)
		.collect()
}

pub fn best_score(a: &str, b: &str) -> f64 {
	token_set_ratio(a, b).max(partial_ratio(a, b))
}

/// Indel similarity: `200 * lcs / (len_a + len_b)`.
pub fn ratio(a: &str, b: &str) -> f64 {
	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();

	ratio_chars(&a, &b)
}

/// Best [`ratio`] of the shorter string against any equally long window of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
	let a: Vec<char> = a.chars().collect();
	let b: Vec<char> = b.chars().collect();
	let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

	if short.is_empty() {
		return if long.is_empty() { 100.0 } else { 0.0 };
	}
	if long.windows(short.len()).any(|window| window == short.as_slice()) {
		return 100.0;
	}

	let mut best = 0.0_f64;

	for len in 1..short.len() {
		best = best.max(ratio_chars(&short, &long[..len]));
		best = best.max(ratio_chars(&short, &long[long.len() - len..]));
	}
	for window in long.windows(short.len()) {
		best = best.max(ratio_chars(&short, window));

		if best >= 100.0 {
			break;
		}
	}

	best
}

/// Token set comparison on whitespace-separated tokens.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
	let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
	let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

	if tokens_a.is_empty() || tokens_b.is_empty() {
		return 0.0;
	}

	let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
	let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
	let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

	if !intersection.is_empty() && (only_a.is_empty() || only_b.is_empty()) {
		return 100.0;
	}

	let sect = intersection.join(" ");
	let combined_a = join_non_empty(&sect, &only_a.join(" "));
	let combined_b = join_non_empty(&sect, &only_b.join(" "));

	ratio(&sect, &combined_a).max(ratio(&sect, &combined_b)).max(ratio(&combined_a, &combined_b))
}

fn join_non_empty(head: &str, tail: &str) -> String {
	match (head.is_empty(), tail.is_empty()) {
		(true, _) => tail.to_string(),
		(_, true) => head.to_string(),
		_ => format!("{head} {tail}"),
	}
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
	let total = a.len() + b.len();

	if total == 0 {
		return 100.0;
	}

	200.0 * lcs_len(a, b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
	let mut row = vec![0_usize; b.len() + 1];

	for ca in a {
		let mut diagonal = 0;

		for (j, cb) in b.iter().enumerate() {
			let above = row[j + 1];

			row[j + 1] = if ca == cb { diagonal + 1 } else { above.max(row[j]) };
			diagonal = above;
		}
	}

	row[b.len()]
}

fn strip_accents(text: &str) -> String {
	text.nfkd().filter(|ch| !is_combining_mark(*ch)).collect()
}

fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalization_strips_accents_and_case() {
		assert_eq!(normalize("  Café   Médan "), "cafe medan");
		assert_eq!(normalize_for_words("Jl. Cemara-Asri, No.5"), "jl cemara asri no 5");
	}

	#[test]
	fn ratio_matches_indel_similarity() {
		assert_eq!(ratio("", ""), 100.0);
		assert_eq!(ratio("medan", "medan"), 100.0);
		assert!((ratio("abcd", "abce") - 75.0).abs() < 1e-9);
	}

	#[test]
	fn partial_ratio_finds_substrings() {
		assert_eq!(partial_ratio("rumah di medan johor", "medan"), 100.0);
		assert!(partial_ratio("rumah di medn johor", "medan") >= 80.0);
		assert_eq!(partial_ratio("", "medan"), 0.0);
	}

	#[test]
	fn token_set_ratio_ignores_order_and_extra_tokens() {
		assert_eq!(token_set_ratio("cemara asri medan", "medan cemara"), 100.0);
		assert_eq!(token_set_ratio("", "medan"), 0.0);
		assert!(token_set_ratio("kolam renang", "taman bermain") < 60.0);
	}

	#[test]
	fn keyword_variants_cover_spacing() {
		let variants = keyword_variants("Ring Road");

		assert!(variants.contains("ring road"));
		assert!(variants.contains("ring-road"));
		assert!(variants.contains("ringroad"));
	}

	#[test]
	fn keyword_matching_is_case_insensitive_and_uses_variants() {
		assert!(contains_keyword("Rumah dijual di MEDAN kota", "medan", &[], 85.0));
		assert!(contains_keyword("Dekat jalan Ringroad", "ring road", &[], 85.0));
		assert!(contains_keyword("Apapun", "", &[], 85.0));
		assert!(!contains_keyword("Rumah di Binjai", "cemara", &[], 85.0));
		assert!(contains_keyword("Rumah di Binjai", "cemara", &["binjai".to_string()], 85.0));
	}

	#[test]
	fn phrases_must_all_match() {
		let text = "Dekat sekolah, ada kolam renang dan carport luas.";

		assert!(contains_phrases(text, &["kolam renang", "carport"], 80.0));
		assert!(!contains_phrases(text, &["kolam renang", "lapangan golf"], 80.0));
		assert!(!contains_phrases("", &["kolam"], 80.0));
		assert!(!contains_phrases::<&str>(text, &[], 80.0));
	}

	#[test]
	fn whole_word_containment() {
		assert!(word_in("Jl. Medan-Binjai KM 12", "binjai"));
		assert!(!word_in("Jl. Medanku", "medan"));
		assert!(!word_in("Medan", "  "));
	}

	#[test]
	fn lists_split_on_separators() {
		assert_eq!(split_list(" a, b;c | |"), vec!["a", "b", "c"]);
	}
}
