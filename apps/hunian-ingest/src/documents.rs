//! Listing rows from `listings.json` joined with their `page_content/*.txt` files.

use std::{
	fs,
	path::{Path, PathBuf},
};

use color_eyre::eyre;
use serde_json::{Map, Value};

use hunian_storage::qdrant::ListingDocument;

const CONTENT_DIR: &str = "page_content";
const LISTINGS_FILE: &str = "listings.json";
const DROPPED_KEYS: [&str; 2] = ["page_content", "page_content_path"];

#[derive(Debug, Default)]
pub struct Prepared {
	pub documents: Vec<ListingDocument>,
	pub skipped: usize,
}

pub fn load_rows(embeds_dir: &Path) -> color_eyre::Result<Vec<Map<String, Value>>> {
	let path = embeds_dir.join(LISTINGS_FILE);
	let raw = fs::read_to_string(&path)
		.map_err(|err| eyre::eyre!("Failed to read {}: {err}", path.display()))?;
	let Value::Array(rows) = serde_json::from_str(&raw)? else {
		return Err(eyre::eyre!("{} must hold an array of objects.", path.display()));
	};

	Ok(rows
		.into_iter()
		.filter_map(|row| match row {
			Value::Object(row) => Some(row),
			_ => None,
		})
		.collect())
}

/// Builds one document per usable row. Rows without an id, a text file or text are skipped.
pub fn prepare(embeds_dir: &Path, rows: Vec<Map<String, Value>>) -> Prepared {
	let mut prepared = Prepared::default();

	for row in rows {
		match document(embeds_dir, row) {
			Ok(document) => prepared.documents.push(document),
			Err(reason) => {
				tracing::warn!(%reason, "Listing row skipped.");

				prepared.skipped += 1;
			},
		}
	}

	prepared
}

fn document(embeds_dir: &Path, row: Map<String, Value>) -> Result<ListingDocument, String> {
	let listing_id = listing_id(&row).ok_or_else(|| "row has no listing_id or id".to_string())?;
	let path = content_path(embeds_dir, &row)
		.ok_or_else(|| format!("no page content file for listing {listing_id}"))?;
	let text = fs::read_to_string(&path)
		.map_err(|err| format!("failed to read {}: {err}", path.display()))?;
	let page_content = text.trim();

	if page_content.is_empty() {
		return Err(format!("page content for listing {listing_id} is empty"));
	}

	Ok(ListingDocument {
		listing_id,
		page_content: page_content.to_string(),
		metadata: metadata(row),
	})
}

fn listing_id(row: &Map<String, Value>) -> Option<String> {
	["listing_id", "id"].iter().find_map(|key| match row.get(*key) {
		Some(Value::String(id)) if !id.trim().is_empty() => Some(id.trim().to_string()),
		Some(Value::Number(id)) => Some(id.to_string()),
		_ => None,
	})
}

/// Resolution order: the basename of `page_content_path`, `listing-<id>.txt`, then a title slug.
pub fn content_path(embeds_dir: &Path, row: &Map<String, Value>) -> Option<PathBuf> {
	let dir = embeds_dir.join(CONTENT_DIR);
	let from_path = row
		.get("page_content_path")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|raw| !raw.is_empty())
		.and_then(|raw| raw.rsplit(['/', '\\']).next())
		.map(|name| dir.join(name));
	let from_id = listing_id(row).map(|id| dir.join(format!("listing-{id}.txt")));
	let from_title = row
		.get("title")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|title| !title.is_empty())
		.map(|title| dir.join(format!("{}.txt", slug(title))));

	[from_path, from_id, from_title].into_iter().flatten().find(|path| path.is_file())
}

fn slug(title: &str) -> String {
	let slug: String =
		title.chars().map(|ch| if ch.is_alphanumeric() { ch } else { '-' }).collect();

	slug.trim_matches('-').to_string()
}

/// Scalar row fields, with `long` stored as `lon` and the page content keys removed.
fn metadata(row: Map<String, Value>) -> Map<String, Value> {
	let has_lon = row.contains_key("lon");
	let mut out = Map::new();

	for (key, value) in row {
		if DROPPED_KEYS.contains(&key.as_str()) || !is_scalar(&value) {
			continue;
		}

		let key = if key == "long" && !has_lon { "lon".to_string() } else { key };

		out.insert(key, value);
	}

	out
}

fn is_scalar(value: &Value) -> bool {
	matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn embeds_dir(files: &[(&str, &str)]) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("hunian-ingest-{}", uuid::Uuid::new_v4()));

		fs::create_dir_all(dir.join(CONTENT_DIR)).expect("create failed");

		for (name, text) in files {
			fs::write(dir.join(CONTENT_DIR).join(name), text).expect("write failed");
		}

		dir
	}

	fn row(value: Value) -> Map<String, Value> {
		match value {
			Value::Object(row) => row,
			_ => panic!("Expected object."),
		}
	}

	#[test]
	fn content_files_resolve_in_order() {
		let dir = embeds_dir(&[
			("custom.txt", "A"),
			("listing-7.txt", "B"),
			("Rumah-Cemara-Asri.txt", "C"),
		]);
		let by_path = row(json!({
			"id": 7,
			"page_content_path": "storage://app/embeds/page_content/custom.txt"
		}));
		let by_id =
			row(json!({ "listing_id": "7", "page_content_path": "storage://x/missing.txt" }));
		let by_title = row(json!({ "title": "Rumah Cemara Asri!" }));

		assert!(content_path(&dir, &by_path).is_some_and(|path| path.ends_with("custom.txt")));
		assert!(content_path(&dir, &by_id).is_some_and(|path| path.ends_with("listing-7.txt")));
		assert!(
			content_path(&dir, &by_title)
				.is_some_and(|path| path.ends_with("Rumah-Cemara-Asri.txt"))
		);

		fs::remove_dir_all(&dir).expect("cleanup failed");
	}

	#[test]
	fn unusable_rows_are_skipped_and_metadata_is_cleaned() {
		let dir = embeds_dir(&[("listing-1.txt", "  Rumah di Medan \n"), ("listing-2.txt", "   ")]);
		let rows = vec![
			row(json!({
				"listing_id": 1,
				"lat": 3.59,
				"long": 98.67,
				"tags": ["a"],
				"page_content_path": "listing-1.txt"
			})),
			row(json!({ "listing_id": 2 })),
			row(json!({ "listing_id": 3 })),
			row(json!({ "title": "tanpa id" })),
		];
		let prepared = prepare(&dir, rows);

		assert_eq!(prepared.skipped, 3);
		assert_eq!(prepared.documents.len(), 1);

		let document = &prepared.documents[0];

		assert_eq!(document.listing_id, "1");
		assert_eq!(document.page_content, "Rumah di Medan");
		assert_eq!(document.metadata.get("lon"), Some(&json!(98.67)));
		assert!(!document.metadata.contains_key("long"));
		assert!(!document.metadata.contains_key("tags"));
		assert!(!document.metadata.contains_key("page_content_path"));

		fs::remove_dir_all(&dir).expect("cleanup failed");
	}
}
