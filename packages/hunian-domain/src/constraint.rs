//! Gold constraint sets and per-item predicate evaluation.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
	Error, Result, attributes::Condition, extract::ExtractedFields, filter::Filter, fuzzy,
	truth::TruthRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
	Keyword,
	HargaMin,
	HargaMax,
	KamarTidur,
	LebarBangunan,
	LuasBangunan,
	JumlahTingkat,
	LuasTanah,
	Kondisi,
	JenisProperti,
	TipeListing,
	MataAngin,
	InfoLainnya,
}

/// Pass/fail per evaluated constraint. Constraints absent from the gold set are not present.
pub type Predicates = BTreeMap<Constraint, bool>;

/// Hand-labelled expected constraints for one question.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gold {
	pub filter: Filter,
	pub info_lainnya: Vec<String>,
}
impl Gold {
	pub fn from_value(value: &Value) -> Result<Self> {
		let Some(object) = value.as_object() else {
			return Err(Error::MalformedGold {
				message: "Gold constraints must be a JSON object.".to_string(),
			});
		};
		let mut fields: Map<String, Value> = object.clone();

		if let Some(outer) = fields.remove("luar_bangunan")
			&& !fields.contains_key("luas_bangunan")
		{
			fields.insert("luas_bangunan".to_string(), outer);
		}

		let info_lainnya = match fields.remove("info_lainnya") {
			None | Some(Value::Null) => Vec::new(),
			Some(Value::String(raw)) => fuzzy::split_list(&raw),
			Some(Value::Array(items)) => items
				.iter()
				.filter_map(|item| match item {
					Value::String(text) => Some(text.trim().to_string()),
					Value::Number(number) => Some(number.to_string()),
					_ => None,
				})
				.filter(|phrase| !phrase.is_empty())
				.collect(),
			Some(other) =>
				return Err(Error::MalformedGold {
					message: format!("info_lainnya must be text or a list, found {other}."),
				}),
		};
		let filter = Filter::from_value(Value::Object(fields)).map_err(|err| match err {
			Error::MalformedFilter { message } | Error::MalformedGold { message } =>
				Error::MalformedGold { message },
		})?;

		Ok(Self { filter, info_lainnya })
	}

	/// Number of constraints this gold set evaluates.
	pub fn constraint_count(&self) -> usize {
		let f = &self.filter;

		[
			f.keyword.is_some(),
			f.harga_min.is_some(),
			f.harga_max.is_some(),
			f.kamar_tidur.is_some(),
			f.lebar_bangunan.is_some(),
			f.luas_bangunan.is_some(),
			f.jumlah_tingkat.is_some(),
			f.luas_tanah.is_some(),
			f.kondisi.is_some(),
			f.jenis_properti.is_some(),
			f.tipe_listing.is_some(),
			f.mata_angin.is_some(),
			!self.info_lainnya.is_empty(),
		]
		.into_iter()
		.filter(|present| *present)
		.count()
	}
}

/// Fuzzy score thresholds on the 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
	pub keyword: f64,
	pub address: f64,
	pub phrase: f64,
}
impl Default for MatchThresholds {
	fn default() -> Self {
		Self { keyword: 85.0, address: 70.0, phrase: 80.0 }
	}
}

/// Evaluates every gold constraint against one answer item. Missing extracted values fail.
pub fn evaluate(
	gold: &Gold,
	fields: &ExtractedFields,
	item_text: &str,
	truth: Option<&TruthRecord>,
	thresholds: MatchThresholds,
) -> Predicates {
	let g = &gold.filter;
	let mut predicates = Predicates::new();

	if let Some(keyword) = &g.keyword {
		predicates
			.insert(Constraint::Keyword, keyword_matches(item_text, keyword, truth, thresholds));
	}
	if let Some(min) = g.harga_min {
		predicates.insert(Constraint::HargaMin, fields.price.is_some_and(|price| price >= min));
	}
	if let Some(max) = g.harga_max {
		predicates.insert(Constraint::HargaMax, fields.price.is_some_and(|price| price <= max));
	}
	if let Some(min) = g.kamar_tidur {
		predicates.insert(Constraint::KamarTidur, fields.kamar_tidur.is_some_and(|v| v >= min));
	}
	if let Some(min) = g.lebar_bangunan {
		predicates
			.insert(Constraint::LebarBangunan, fields.lebar_bangunan.is_some_and(|v| v >= min));
	}
	if let Some(min) = g.luas_bangunan {
		predicates.insert(Constraint::LuasBangunan, fields.luas_bangunan.is_some_and(|v| v >= min));
	}
	if let Some(floors) = g.jumlah_tingkat {
		predicates.insert(Constraint::JumlahTingkat, fields.jumlah_tingkat == Some(floors));
	}
	if let Some(min) = g.luas_tanah {
		predicates.insert(Constraint::LuasTanah, fields.luas_tanah.is_some_and(|v| v >= min));
	}
	if let Some(condition) = &g.kondisi {
		let expected = Condition::from_label(condition);

		predicates.insert(
			Constraint::Kondisi,
			fields.kondisi.is_some_and(|found| Some(found) == expected),
		);
	}
	if let Some(code) = g.jenis_properti {
		predicates.insert(
			Constraint::JenisProperti,
			fields.jenis_properti.map(|kind| kind.code()) == Some(code),
		);
	}
	if let Some(code) = g.tipe_listing {
		predicates.insert(
			Constraint::TipeListing,
			fields.tipe_listing.map(|kind| kind.code()) == Some(code),
		);
	}
	if let Some(direction) = &g.mata_angin {
		let expected = direction.trim().to_lowercase();

		predicates.insert(
			Constraint::MataAngin,
			fields
				.mata_angin
				.as_deref()
				.is_some_and(|found| found.trim().to_lowercase() == expected),
		);
	}
	if !gold.info_lainnya.is_empty() {
		let text = truth.map(TruthRecord::supplementary_text).unwrap_or_default();

		let found = !text.is_empty()
			&& fuzzy::contains_phrases(&text, &gold.info_lainnya, thresholds.phrase);

		predicates.insert(Constraint::InfoLainnya, found);
	}

	predicates
}

/// Answer text first, then truth aliases, then the truth address.
fn keyword_matches(
	item_text: &str,
	keyword: &str,
	truth: Option<&TruthRecord>,
	thresholds: MatchThresholds,
) -> bool {
	if fuzzy::contains_keyword(item_text, keyword, &[], thresholds.keyword) {
		return true;
	}

	let Some(truth) = truth else {
		return false;
	};
	let normalized = fuzzy::normalize(keyword);

	if truth
		.keywords
		.iter()
		.any(|alias| fuzzy::best_score(&normalized, &fuzzy::normalize(alias)) >= thresholds.keyword)
	{
		return true;
	}

	truth.alamat.as_deref().is_some_and(|address| {
		fuzzy::word_in(address, keyword)
			|| fuzzy::contains_keyword(address, keyword, &[], thresholds.address)
	})
}
