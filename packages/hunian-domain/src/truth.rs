//! Authoritative listing fields fetched from the listing API by listing id.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::fuzzy;

const MARKER_KEYS: [&str; 4] = ["alamat_ditampilkan", "keyword", "total_harga_listing", "k_tidur"];
const TITLE_KEYS: [&str; 4] = ["judul", "title", "nama", "judul_listing"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TruthRecord {
	pub price: Option<u64>,
	pub kamar_tidur: Option<u32>,
	pub luas_bangunan: Option<u32>,
	pub luas_tanah: Option<u32>,
	pub jumlah_tingkat: Option<u32>,
	pub jenis_properti: Option<u8>,
	pub tipe_listing: Option<u8>,
	pub mata_angin: Option<String>,
	pub keywords: Vec<String>,
	pub alamat: Option<String>,
	pub info_tambahan: Option<String>,
	pub title: Option<String>,
}
impl TruthRecord {
	/// Reads a listing lookup response. Returns `None` when no listing object can be found.
	pub fn from_json(value: &Value) -> Option<Self> {
		let listing = resolve_listing(value.as_object()?);

		Some(Self {
			price: number(listing, "total_harga_listing").map(|n| n.round() as u64),
			kamar_tidur: count(listing, "k_tidur"),
			luas_bangunan: count(listing, "bangunan_luas"),
			luas_tanah: count(listing, "tanah_luas"),
			jumlah_tingkat: count(listing, "bangunan_tingkat"),
			jenis_properti: count(listing, "jenis_properti").and_then(|n| u8::try_from(n).ok()),
			tipe_listing: count(listing, "tipe_listing").and_then(|n| u8::try_from(n).ok()),
			mata_angin: text(listing, "arah_site").map(|direction| direction.to_lowercase()),
			keywords: match listing.get("keyword") {
				Some(Value::String(raw)) => fuzzy::split_list(raw),
				Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
				_ => Vec::new(),
			},
			alamat: text(listing, "alamat_ditampilkan"),
			info_tambahan: match listing.get("info_tambahan") {
				Some(Value::Array(items)) => {
					let parts: Vec<String> = items.iter().filter_map(value_text).collect();

					if parts.is_empty() { None } else { Some(parts.join(" \n ")) }
				},
				_ => text(listing, "info_tambahan"),
			},
			title: TITLE_KEYS.iter().find_map(|key| text(listing, key)),
		})
	}

	/// Extra-information text followed by the title, used for free-text amenity checks.
	pub fn supplementary_text(&self) -> String {
		[self.info_tambahan.as_deref(), self.title.as_deref()]
			.into_iter()
			.flatten()
			.collect::<Vec<_>>()
			.join(" \n ")
	}
}

fn resolve_listing(root: &Map<String, Value>) -> &Map<String, Value> {
	if MARKER_KEYS.iter().any(|key| root.contains_key(*key)) {
		return root;
	}

	match root.get("data") {
		Some(Value::Object(data)) => return data,
		Some(Value::Array(rows)) =>
			if let Some(Value::Object(first)) = rows.first() {
				return first;
			},
		_ => {},
	}

	match root.get("listing") {
		Some(Value::Object(listing)) => listing,
		_ => root,
	}
}

fn value_text(value: &Value) -> Option<String> {
	let raw = match value {
		Value::String(raw) => raw.trim().to_string(),
		Value::Number(number) => number.to_string(),
		_ => return None,
	};

	if raw.is_empty() { None } else { Some(raw) }
}

fn text(listing: &Map<String, Value>, key: &str) -> Option<String> {
	listing.get(key).and_then(value_text)
}

fn number(listing: &Map<String, Value>, key: &str) -> Option<f64> {
	let parsed = match listing.get(key)? {
		Value::Number(number) => number.as_f64(),
		Value::String(raw) => raw.trim().parse::<f64>().ok(),
		_ => None,
	};

	parsed.filter(|n| n.is_finite() && *n >= 0.0)
}

fn count(listing: &Map<String, Value>, key: &str) -> Option<u32> {
	number(listing, key).and_then(|n| u32::try_from(n.round() as u64).ok())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn record_is_read_from_data_array() {
		let response = json!({
			"status": "ok",
			"data": [{
				"total_harga_listing": "850000000",
				"k_tidur": 3,
				"bangunan_luas": 120,
				"tanah_luas": 150.0,
				"bangunan_tingkat": 2,
				"jenis_properti": 1,
				"tipe_listing": 1,
				"arah_site": " Timur ",
				"keyword": "cemara, cemara asri",
				"alamat_ditampilkan": "Jl. Cemara Asri, Medan",
				"info_tambahan": ["Kolam renang", " ", "Carport 2 mobil"],
				"title": "Rumah Cemara Asri"
			}]
		});
		let record = TruthRecord::from_json(&response).expect("Expected truth record.");

		assert_eq!(record.price, Some(850_000_000));
		assert_eq!(record.kamar_tidur, Some(3));
		assert_eq!(record.luas_tanah, Some(150));
		assert_eq!(record.mata_angin.as_deref(), Some("timur"));
		assert_eq!(record.keywords, vec!["cemara", "cemara asri"]);
		assert_eq!(
			record.supplementary_text(),
			"Kolam renang \n Carport 2 mobil \n Rumah Cemara Asri"
		);
	}

	#[test]
	fn marker_keys_mark_the_root_as_the_listing() {
		let response = json!({ "k_tidur": 2, "data": { "k_tidur": 9 } });
		let record = TruthRecord::from_json(&response).expect("Expected truth record.");

		assert_eq!(record.kamar_tidur, Some(2));
	}

	#[test]
	fn nested_listing_object_is_resolved() {
		let response = json!({ "listing": { "judul": "Ruko Ringroad", "tipe_listing": "2" } });
		let record = TruthRecord::from_json(&response).expect("Expected truth record.");

		assert_eq!(record.title.as_deref(), Some("Ruko Ringroad"));
		assert_eq!(record.tipe_listing, Some(2));
	}

	#[test]
	fn non_object_response_has_no_record() {
		assert!(TruthRecord::from_json(&json!([1, 2])).is_none());
		assert!(TruthRecord::from_json(&Value::Null).is_none());
	}
}
