//! Sparse structured search filter shared by the extractor, the listing API and the evaluator.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};

use crate::{Error, Result};

const PAGING_KEYS: [&str; 3] = ["page", "paginate", "is_hard_filter"];

static DOT_GROUPED: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\d{1,3}(?:\.\d{3})+(?:,\d+)?$").expect("dot grouping regex")
});
static COMMA_GROUPED: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^\d{1,3}(?:,\d{3})+(?:\.\d+)?$").expect("comma grouping regex")
});
static DECIMAL_COMMA: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\d+,\d+$").expect("decimal comma regex"));

/// A field is present only when it carries a non-null, non-blank value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
	pub alamat: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
	pub keyword: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u64")]
	pub harga_min: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u64")]
	pub harga_max: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u32")]
	pub kamar_tidur: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_f64")]
	pub lebar_bangunan: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u32")]
	pub luas_bangunan: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u32")]
	pub jumlah_tingkat: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u32")]
	pub luas_tanah: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
	pub kondisi: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u8")]
	pub tipe_listing: Option<u8>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u8")]
	pub jenis_properti: Option<u8>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_text")]
	pub mata_angin: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
	pub is_hard_filter: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u32")]
	pub page: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_u32")]
	pub paginate: Option<u32>,
}
impl Filter {
	/// Parses a language-model reply that should hold one JSON object.
	pub fn from_reply(content: &str) -> Result<Self> {
		let start = content.find('{');
		let end = content.rfind('}');
		let (Some(start), Some(end)) = (start, end) else {
			return Err(Error::MalformedFilter {
				message: "Reply does not contain a JSON object.".to_string(),
			});
		};

		if end < start {
			return Err(Error::MalformedFilter {
				message: "Reply does not contain a JSON object.".to_string(),
			});
		}

		let filter: Filter = serde_json::from_str(&content[start..=end])
			.map_err(|err| Error::MalformedFilter { message: err.to_string() })?;

		Ok(filter.normalized())
	}

	pub fn from_value(value: Value) -> Result<Self> {
		if !value.is_object() {
			return Err(Error::MalformedFilter {
				message: "Filter must be a JSON object.".to_string(),
			});
		}

		let filter: Filter = serde_json::from_value(value)
			.map_err(|err| Error::MalformedFilter { message: err.to_string() })?;

		Ok(filter.normalized())
	}

	/// Trims text fields and drops blank ones. Applying it twice is the same as applying it once.
	pub fn normalized(&self) -> Self {
		let mut out = self.clone();

		for field in [&mut out.alamat, &mut out.keyword, &mut out.kondisi, &mut out.mata_angin] {
			*field = field.take().and_then(non_blank);
		}

		if out.lebar_bangunan.is_some_and(|value| !value.is_finite()) {
			out.lebar_bangunan = None;
		}

		out
	}

	/// Hard filters carry a price, bedroom or area bound.
	pub fn is_hard(&self) -> bool {
		self.harga_min.is_some()
			|| self.harga_max.is_some()
			|| self.kamar_tidur.is_some()
			|| self.luas_bangunan.is_some()
			|| self.luas_tanah.is_some()
	}

	/// Normalized filter fields with paging and the derived hard flag removed.
	pub fn search_fields(&self) -> Map<String, Value> {
		let mut map = match serde_json::to_value(self.normalized()) {
			Ok(Value::Object(map)) => map,
			_ => Map::new(),
		};

		for key in PAGING_KEYS {
			map.remove(key);
		}

		map
	}

	/// Payload used to check whether the listing API has any rows for these constraints.
	pub fn probe_payload(&self) -> Self {
		let mut out = self.normalized();

		out.kondisi = None;
		out.is_hard_filter = None;

		out
	}

	pub fn to_json_string(&self) -> String {
		serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
	}
}

/// How the previous turn's filter is compared with the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Continuity {
	/// Every previous field appears with an equal value in the current filter.
	#[default]
	Subset,
	/// Both filters carry exactly the same fields and values.
	Exact,
}
impl Continuity {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim() {
			"subset" => Some(Self::Subset),
			"exact" => Some(Self::Exact),
			_ => None,
		}
	}

	pub fn continues(self, previous: &Filter, current: &Filter) -> bool {
		let previous = previous.search_fields();

		if previous.is_empty() {
			return false;
		}

		let current = current.search_fields();

		match self {
			Self::Subset => previous.iter().all(|(key, value)| current.get(key) == Some(value)),
			Self::Exact => previous == current,
		}
	}
}

/// Page to request for `current`: one past the previous page when the search continues, else 1.
///
/// A page carried on `current` is ignored.
pub fn next_page(previous: Option<&Filter>, current: &Filter, continuity: Continuity) -> u32 {
	match previous {
		Some(previous) if continuity.continues(previous, current) =>
			previous.page.filter(|page| *page > 0).unwrap_or(1).saturating_add(1),
		_ => 1,
	}
}

fn non_blank(text: String) -> Option<String> {
	let trimmed = text.trim();

	if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(text)) => Ok(non_blank(text)),
		Some(Value::Number(number)) => Ok(Some(number.to_string())),
		Some(Value::Array(items)) if items.is_empty() => Ok(None),
		Some(other) => Err(D::Error::custom(format!("expected text, found {other}"))),
	}
}

fn number_from_value(value: Value) -> std::result::Result<Option<f64>, String> {
	match value {
		Value::Null => Ok(None),
		Value::Number(number) =>
			number.as_f64().map(Some).ok_or_else(|| format!("unsupported number {number}")),
		Value::String(text) => {
			let cleaned: String =
				text.trim().chars().filter(|ch| !matches!(ch, '_' | ' ')).collect();

			if cleaned.is_empty() {
				return Ok(None);
			}

			ungrouped(&cleaned)
				.parse::<f64>()
				.map(Some)
				.map_err(|_| format!("expected a number, found {text:?}"))
		},
		Value::Array(items) if items.is_empty() => Ok(None),
		other => Err(format!("expected a number, found {other}")),
	}
}

/// Rewrites `800.000.000` and `1.250,5` (Indonesian) or `800,000,000` grouping into plain decimals.
fn ungrouped(digits: &str) -> String {
	if DOT_GROUPED.is_match(digits) {
		digits.replace('.', "").replace(',', ".")
	} else if COMMA_GROUPED.is_match(digits) {
		digits.replace(',', "")
	} else if DECIMAL_COMMA.is_match(digits) {
		digits.replace(',', ".")
	} else {
		digits.to_string()
	}
}

pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
	D: Deserializer<'de>,
{
	let Some(value) = Option::<Value>::deserialize(deserializer)? else {
		return Ok(None);
	};
	let number = number_from_value(value).map_err(D::Error::custom)?;

	match number {
		Some(number) if !number.is_finite() || number < 0.0 =>
			Err(D::Error::custom(format!("expected a non-negative number, found {number}"))),
		other => Ok(other),
	}
}

pub(crate) fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(lenient_f64(deserializer)?.map(|number| number.round() as u64))
}

pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
	D: Deserializer<'de>,
{
	match lenient_u64(deserializer)? {
		None => Ok(None),
		Some(number) => u32::try_from(number)
			.map(Some)
			.map_err(|_| D::Error::custom(format!("number {number} is out of range"))),
	}
}

pub(crate) fn lenient_u8<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
	D: Deserializer<'de>,
{
	match lenient_u64(deserializer)? {
		None => Ok(None),
		Some(number) => u8::try_from(number)
			.map(Some)
			.map_err(|_| D::Error::custom(format!("code {number} is out of range"))),
	}
}

pub(crate) fn lenient_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<Value>::deserialize(deserializer)? {
		None | Some(Value::Null) => Ok(None),
		Some(Value::Bool(flag)) => Ok(Some(flag)),
		Some(Value::Number(number)) => Ok(Some(number.as_f64().is_some_and(|n| n != 0.0))),
		Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
			"" => Ok(None),
			"true" | "1" | "yes" => Ok(Some(true)),
			"false" | "0" | "no" => Ok(Some(false)),
			_ => Err(D::Error::custom(format!("expected a boolean, found {text:?}"))),
		},
		Some(other) => Err(D::Error::custom(format!("expected a boolean, found {other}"))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ringroad(harga_max: u64, page: Option<u32>) -> Filter {
		Filter {
			keyword: Some("ringroad".to_string()),
			harga_max: Some(harga_max),
			page,
			..Default::default()
		}
	}

	#[test]
	fn reply_parsing_coerces_strings_and_drops_blanks() {
		let reply = "```json\n{\"keyword\": \" cemara \", \"alamat\": \"\", \"harga_max\": \"800000000\", \"kamar_tidur\": 3, \"is_hard_filter\": \"TRUE\", \"kondisi\": null}\n```";
		let filter = Filter::from_reply(reply).expect("Expected filter to parse.");

		assert_eq!(filter.keyword.as_deref(), Some("cemara"));
		assert_eq!(filter.alamat, None);
		assert_eq!(filter.harga_max, Some(800_000_000));
		assert_eq!(filter.kamar_tidur, Some(3));
		assert_eq!(filter.is_hard_filter, Some(true));
		assert_eq!(filter.kondisi, None);
	}

	#[test]
	fn grouped_number_strings_are_coerced() {
		let reply = r#"{
			"keyword": "medan",
			"harga_min": "150,000,000",
			"harga_max": "800.000.000",
			"lebar_bangunan": "4,5",
			"luas_tanah": "1.250"
		}"#;
		let filter = Filter::from_reply(reply).expect("Expected filter to parse.");
		let plain = Filter::from_reply(r#"{"lebar_bangunan": "6.5"}"#)
			.expect("Expected filter to parse.");

		assert_eq!(filter.harga_min, Some(150_000_000));
		assert_eq!(filter.harga_max, Some(800_000_000));
		assert_eq!(filter.lebar_bangunan, Some(4.5));
		assert_eq!(filter.luas_tanah, Some(1_250));
		assert_eq!(plain.lebar_bangunan, Some(6.5));
		assert!(Filter::from_reply(r#"{"harga_max": "8.00.0"}"#).is_err());
	}

	#[test]
	fn reply_without_object_is_malformed() {
		let err = Filter::from_reply("Maaf, saya tidak mengerti.").expect_err("Expected error.");

		assert!(matches!(err, Error::MalformedFilter { .. }));
	}

	#[test]
	fn reply_with_uncoercible_field_is_malformed() {
		let err = Filter::from_reply("{\"harga_max\": \"murah\"}").expect_err("Expected error.");

		assert!(matches!(err, Error::MalformedFilter { .. }));
	}

	#[test]
	fn normalization_is_idempotent() {
		let filter = Filter {
			keyword: Some("  medan ".to_string()),
			alamat: Some("   ".to_string()),
			mata_angin: Some("Timur".to_string()),
			lebar_bangunan: Some(f64::NAN),
			..Default::default()
		};
		let once = filter.normalized();

		assert_eq!(once.keyword.as_deref(), Some("medan"));
		assert_eq!(once.alamat, None);
		assert_eq!(once.lebar_bangunan, None);
		assert_eq!(once.normalized(), once);
	}

	#[test]
	fn hard_filter_requires_price_bedroom_or_area() {
		assert!(!Filter { keyword: Some("medan".into()), ..Default::default() }.is_hard());
		assert!(!Filter { lebar_bangunan: Some(6.0), ..Default::default() }.is_hard());
		assert!(Filter { harga_min: Some(1), ..Default::default() }.is_hard());
		assert!(Filter { luas_tanah: Some(100), ..Default::default() }.is_hard());
	}

	#[test]
	fn identical_filter_advances_to_next_page() {
		let previous = ringroad(800_000_000, Some(1));
		let current = ringroad(800_000_000, None);

		assert_eq!(next_page(Some(&previous), &current, Continuity::Subset), 2);
		assert_eq!(next_page(Some(&previous), &current, Continuity::Exact), 2);
	}

	#[test]
	fn changed_filter_resets_to_first_page() {
		let previous = ringroad(800_000_000, Some(3));
		let current = ringroad(500_000_000, None);

		assert_eq!(next_page(Some(&previous), &current, Continuity::Subset), 1);
	}

	#[test]
	fn changed_filter_ignores_an_echoed_page() {
		let previous = ringroad(800_000_000, Some(3));
		let current = ringroad(500_000_000, Some(3));

		assert_eq!(next_page(Some(&previous), &current, Continuity::Subset), 1);
		assert_eq!(next_page(None, &current, Continuity::Exact), 1);
	}

	#[test]
	fn subset_continuity_ignores_paging_and_hard_flag() {
		let mut previous = ringroad(800_000_000, Some(2));

		previous.paginate = Some(20);
		previous.is_hard_filter = Some(true);

		let mut current = ringroad(800_000_000, None);

		current.kamar_tidur = Some(3);

		assert_eq!(next_page(Some(&previous), &current, Continuity::Subset), 3);
		assert_eq!(next_page(Some(&previous), &current, Continuity::Exact), 1);
	}

	#[test]
	fn empty_previous_filter_never_advances() {
		let previous = Filter { page: Some(4), paginate: Some(20), ..Default::default() };
		let current = ringroad(800_000_000, None);

		assert_eq!(next_page(Some(&previous), &current, Continuity::Subset), 1);
		assert_eq!(next_page(None, &current, Continuity::Subset), 1);
	}

	#[test]
	fn probe_payload_drops_condition_and_hard_flag() {
		let filter = Filter {
			kondisi: Some("baru".into()),
			is_hard_filter: Some(false),
			keyword: Some("medan".into()),
			..Default::default()
		};
		let probe = filter.probe_payload();

		assert_eq!(probe.kondisi, None);
		assert_eq!(probe.is_hard_filter, None);
		assert_eq!(probe.keyword.as_deref(), Some("medan"));
	}

	#[test]
	fn serialization_is_sparse() {
		let filter = ringroad(800_000_000, None);

		assert_eq!(filter.to_json_string(), r#"{"keyword":"ringroad","harga_max":800000000}"#);
	}
}
