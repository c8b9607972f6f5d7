//! Pattern-based attribute extraction from free-text answer items.
//!
//! Every extractor is best effort: a field that cannot be found is `None`, never an error.

use std::{str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::{
	attributes::{Condition, ListingType, PropertyType},
	truth::TruthRecord,
};

const FACING_CONTEXT_CHARS: usize = 60;

static PRICE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\brp\.?\s*([0-9][0-9.,]*)(?:\s*(juta|jt|miliar|milyar|m)\b)?")
		.expect("price regex")
});
static BEDROOMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	compile_all(&[
		r"(?i)kamar\s*tidur[:\s]*([0-9]+)",
		r"(?i)\b([0-9]+)\s*kamar\s*tidur\b",
		r"(?i)\bKT[:\s-]*([0-9]+)\b",
		r"(?i)\b([0-9]+)\s*KT\b",
		r"(?i)\b([0-9]+)\s*(?:BR|Bed|Bedroom)s?\b",
	])
});
static BUILDING_AREA: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	compile_all(&[
		r"\bLB[:\s-]*([0-9]+)\s*m?\s*2?\b",
		r"[Ll]uas\s*[Bb]angunan[:\s-]*([0-9]+)\s*m",
		r"[Bb]uilding\s*[Aa]rea[:\s-]*([0-9]+)\s*m",
	])
});
static LAND_AREA: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	compile_all(&[
		r"\bLT[:\s-]*([0-9]+)\s*m?\s*2?\b",
		r"[Ll]uas\s*[Tt]anah[:\s-]*([0-9]+)\s*m",
		r"[Ll]and\s*[Aa]rea[:\s-]*([0-9]+)\s*m",
	])
});
static BUILDING_WIDTH: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	compile_all(&[
		r"[Ll]ebar(?:\s*[Bb]angunan)?[:\s-]*([0-9]+(?:\.[0-9]+)?)\s*m?\b",
		r"\b([0-9]+(?:\.[0-9]+)?)\s*x\s*[0-9]+(?:\.[0-9]+)?\b",
	])
});
static FLOORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
	compile_all(&[
		r"[Jj]umlah\s*[Tt]ingkat[:\s-]*([0-9]+)",
		r"\b([0-9]+)\s*[Tt]ingkat\b",
		r"\b([0-9]+)\s*[Ll]antai\b",
	])
});
static CONDITIONS: LazyLock<Vec<(Condition, Regex)>> = LazyLock::new(|| {
	compile_tagged(&[
		(Condition::New, r"\b(?:baru|brand new|new)\b"),
		(Condition::Empty, r"\b(?:kosong|unfurnished|tanpa perabot|empty)\b"),
		(
			Condition::FullFurnished,
			r"\b(?:full furnished|fully furnished|lengkap perabot|fullfurnished)\b",
		),
		(
			Condition::NonFurnished,
			r"\b(?:non furnished|semi furnished|partial furnished|semi-furnished)\b",
		),
	])
});
static PROPERTY_TYPES: LazyLock<Vec<(PropertyType, Regex)>> = LazyLock::new(|| {
	compile_tagged(&[
		(PropertyType::Shophouse, r"\b(?:ruko|rumah\s*toko)\b"),
		(PropertyType::Apartment, r"\b(?:apart(?:e)?men(?:t)?|apartment|condo(?:minium)?)\b"),
		(PropertyType::Warehouse, r"\b(?:gudang|warehouse)\b"),
		(PropertyType::Building, r"\b(?:gedung|perkantoran|office\s+building)\b"),
		(PropertyType::Land, r"\b(?:tanah\s*dijual|lahan|kav?ling|tanah\s*kapling)\b"),
	])
});
static BARE_LAND: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\btanah\b").expect("bare land regex"));
static LAND_AS_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"luas\s*tanah|lt[:\s-]*\d|sertifikat\s*tanah|shm|m2").expect("land attribute regex")
});
static HOUSE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\b(?:rumah|house)\b").expect("house regex"));
static LISTING_TYPES: LazyLock<Vec<(ListingType, Regex)>> = LazyLock::new(|| {
	compile_tagged(&[
		(ListingType::Auction, r"\b(?:lelang|auction)\b"),
		(ListingType::Sale, r"\b(?:dijual|for sale)\b"),
		(
			ListingType::Rent,
			r"\b(?:disewa(?:kan)?|sewa|for rent|rent|kontrakan|dikontrakk?an)\b",
		),
	])
});
static FACING: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?:hadap|menghadap|facing|orientasi)[:\s]*[a-z\- ]+").expect("facing regex")
});
static DIRECTIONS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
	compile_tagged(&[
		("timur laut", r"\b(?:timur[- ]?laut|north-?east)\b"),
		("tenggara", r"\b(?:tenggara|south-?east)\b"),
		("barat daya", r"\b(?:barat[- ]?daya|south-?west)\b"),
		("barat laut", r"\b(?:barat[- ]?laut|north-?west)\b"),
		("utara", r"\b(?:utara|north)\b"),
		("timur", r"\b(?:timur|east)\b"),
		("selatan", r"\b(?:selatan|south)\b"),
		("barat", r"\b(?:barat|west)\b"),
	])
});
static DIRECTION_ABBREVIATIONS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
	compile_tagged(&[
		("timur laut", r"\bne\b"),
		("tenggara", r"\bse\b"),
		("barat daya", r"\bsw\b"),
		("barat laut", r"\bnw\b"),
		("utara", r"\bn\b"),
		("timur", r"\be\b"),
		("selatan", r"\bs\b"),
		("barat", r"\bw\b"),
	])
});

/// Attributes parsed out of one answer item, optionally overlaid with a truth record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedFields {
	pub price: Option<u64>,
	pub kamar_tidur: Option<u32>,
	pub luas_bangunan: Option<u32>,
	pub luas_tanah: Option<u32>,
	pub lebar_bangunan: Option<f64>,
	pub jumlah_tingkat: Option<u32>,
	pub kondisi: Option<Condition>,
	pub jenis_properti: Option<PropertyType>,
	pub tipe_listing: Option<ListingType>,
	pub mata_angin: Option<String>,
}
impl ExtractedFields {
	pub fn from_text(text: &str) -> Self {
		let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
		let lower = text.to_lowercase();

		Self {
			price: extract_price(&text),
			kamar_tidur: first_capture(&BEDROOMS, &text),
			luas_bangunan: first_capture(&BUILDING_AREA, &text),
			luas_tanah: first_capture(&LAND_AREA, &text),
			lebar_bangunan: first_capture(&BUILDING_WIDTH, &text),
			jumlah_tingkat: first_capture(&FLOORS, &text),
			kondisi: first_tag(&CONDITIONS, &lower),
			jenis_properti: infer_property_type(&lower),
			tipe_listing: first_tag(&LISTING_TYPES, &lower),
			mata_angin: extract_direction(&lower),
		}
	}

	/// Truth values replace extracted ones wherever the record carries them.
	pub fn with_truth(mut self, truth: &TruthRecord) -> Self {
		if let Some(price) = truth.price {
			self.price = Some(price);
		}
		if let Some(bedrooms) = truth.kamar_tidur {
			self.kamar_tidur = Some(bedrooms);
		}
		if let Some(area) = truth.luas_bangunan {
			self.luas_bangunan = Some(area);
		}
		if let Some(area) = truth.luas_tanah {
			self.luas_tanah = Some(area);
		}
		if let Some(floors) = truth.jumlah_tingkat {
			self.jumlah_tingkat = Some(floors);
		}
		if let Some(kind) = truth.jenis_properti.and_then(PropertyType::from_code) {
			self.jenis_properti = Some(kind);
		}
		if let Some(kind) = truth.tipe_listing.and_then(ListingType::from_code) {
			self.tipe_listing = Some(kind);
		}
		if let Some(direction) = &truth.mata_angin {
			self.mata_angin = Some(direction.clone());
		}

		self
	}
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
	patterns.iter().map(|pattern| Regex::new(pattern).expect("extraction regex")).collect()
}

fn compile_tagged<T>(patterns: &[(T, &str)]) -> Vec<(T, Regex)>
where
	T: Copy,
{
	patterns
		.iter()
		.map(|(tag, pattern)| (*tag, Regex::new(pattern).expect("extraction regex")))
		.collect()
}

fn first_capture<T>(patterns: &[Regex], text: &str) -> Option<T>
where
	T: FromStr,
{
	patterns.iter().find_map(|re| {
		re.captures(text).and_then(|caps| caps.get(1)).and_then(|m| m.as_str().parse().ok())
	})
}

fn first_tag<T>(patterns: &[(T, Regex)], text: &str) -> Option<T>
where
	T: Copy,
{
	patterns.iter().find(|(_, re)| re.is_match(text)).map(|(tag, _)| *tag)
}

fn extract_price(text: &str) -> Option<u64> {
	let caps = PRICE.captures(text)?;
	let number = caps.get(1)?.as_str();

	match caps.get(2) {
		Some(unit) => scale_price(number, unit.as_str()),
		None => number.chars().filter(char::is_ascii_digit).collect::<String>().parse().ok(),
	}
}

/// "1,2 M" is 1.2 billion; "1.500 juta" uses the separator for thousands.
fn scale_price(number: &str, unit: &str) -> Option<u64> {
	let multiplier = match unit.to_lowercase().as_str() {
		"juta" | "jt" => 1_000_000.0,
		_ => 1_000_000_000.0,
	};
	let number = number.trim_end_matches(['.', ',']);
	let separators: Vec<usize> = number.match_indices(['.', ',']).map(|(idx, _)| idx).collect();
	let decimal = match separators.as_slice() {
		[] => number.to_string(),
		[idx] if number.len() - idx - 1 != 3 => number.replace(',', "."),
		_ => number.replace(['.', ','], ""),
	};
	let value: f64 = decimal.parse().ok()?;

	Some((value * multiplier).round() as u64)
}

fn infer_property_type(lower: &str) -> Option<PropertyType> {
	if let Some(kind) = first_tag(&PROPERTY_TYPES, lower) {
		return Some(kind);
	}
	if BARE_LAND.is_match(lower) && !LAND_AS_ATTRIBUTE.is_match(lower) {
		return Some(PropertyType::Land);
	}
	if HOUSE.is_match(lower) {
		return Some(PropertyType::House);
	}

	None
}

/// Single-letter abbreviations only count inside a facing phrase such as "hadap: n".
fn extract_direction(lower: &str) -> Option<String> {
	let facing = FACING.find(lower).map(|found| {
		let tail = &lower[found.start()..];
		let end = tail.char_indices().nth(FACING_CONTEXT_CHARS).map_or(tail.len(), |(idx, _)| idx);

		&tail[..end]
	});
	let context = facing.unwrap_or(lower);
	let abbreviations: &[(&str, Regex)] =
		if facing.is_some() { DIRECTION_ABBREVIATIONS.as_slice() } else { &[] };

	first_tag(&DIRECTIONS, context).or_else(|| first_tag(abbreviations, context)).map(String::from)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn prices_read_digits_or_scaled_units() {
		assert_eq!(extract_price("Harga Rp 850.000.000,- nego"), Some(850_000_000));
		assert_eq!(extract_price("Harga: Rp. 1,2 M"), Some(1_200_000_000));
		assert_eq!(extract_price("hanya rp 750 juta"), Some(750_000_000));
		assert_eq!(extract_price("Rp 1.500 jt"), Some(1_500_000_000));
		assert_eq!(extract_price("Rp 500 m2"), Some(500));
		assert_eq!(extract_price("harga hubungi kami"), None);
	}

	#[test]
	fn numeric_attributes_follow_pattern_order() {
		let fields = ExtractedFields::from_text(
			"Rumah 2 lantai, KT: 3, LB 120 m2, LT: 150m2, lebar 8.5 m, 3 bedrooms",
		);

		assert_eq!(fields.kamar_tidur, Some(3));
		assert_eq!(fields.luas_bangunan, Some(120));
		assert_eq!(fields.luas_tanah, Some(150));
		assert_eq!(fields.lebar_bangunan, Some(8.5));
		assert_eq!(fields.jumlah_tingkat, Some(2));
	}

	#[test]
	fn dimensions_give_width_when_no_label_exists() {
		let fields = ExtractedFields::from_text("Tanah ukuran 6 x 20 siap bangun");

		assert_eq!(fields.lebar_bangunan, Some(6.0));
	}

	#[test]
	fn condition_property_and_listing_type_from_cues() {
		let fields = ExtractedFields::from_text("Ruko dijual, kondisi Full Furnished");

		assert_eq!(fields.kondisi, Some(Condition::FullFurnished));
		assert_eq!(fields.jenis_properti, Some(PropertyType::Shophouse));
		assert_eq!(fields.tipe_listing, Some(ListingType::Sale));
	}

	#[test]
	fn land_needs_context_when_tanah_is_an_attribute() {
		assert_eq!(
			ExtractedFields::from_text("Rumah dengan luas tanah 200 m2").jenis_properti,
			Some(PropertyType::House)
		);
		assert_eq!(
			ExtractedFields::from_text("Tanah strategis pinggir jalan").jenis_properti,
			Some(PropertyType::Land)
		);
		assert_eq!(
			ExtractedFields::from_text("Kavling siap bangun").jenis_properti,
			Some(PropertyType::Land)
		);
	}

	#[test]
	fn listing_type_prefers_auction_then_sale_then_rent() {
		assert_eq!(
			ExtractedFields::from_text("Rumah lelang, bisa disewakan").tipe_listing,
			Some(ListingType::Auction)
		);
		assert_eq!(
			ExtractedFields::from_text("Rumah disewakan per tahun").tipe_listing,
			Some(ListingType::Rent)
		);
	}

	#[test]
	fn compound_directions_win_over_single_ones() {
		assert_eq!(extract_direction("rumah hadap barat laut").as_deref(), Some("barat laut"));
		assert_eq!(extract_direction("menghadap timur-laut").as_deref(), Some("timur laut"));
		assert_eq!(extract_direction("view ke arah selatan").as_deref(), Some("selatan"));
	}

	#[test]
	fn direction_abbreviations_need_facing_context() {
		assert_eq!(extract_direction("facing: ne, dekat tol").as_deref(), Some("timur laut"));
		assert_eq!(extract_direction("blok s no 5"), None);
	}

	#[test]
	fn missing_fields_stay_empty() {
		assert_eq!(ExtractedFields::from_text("Hubungi kami untuk info."), ExtractedFields::default());
	}
}
