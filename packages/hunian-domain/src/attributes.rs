use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
	#[serde(rename = "baru")]
	New,
	#[serde(rename = "kosong")]
	Empty,
	#[serde(rename = "full furnished")]
	FullFurnished,
	#[serde(rename = "non furnished")]
	NonFurnished,
}
impl Condition {
	pub const ALL: [Self; 4] = [Self::New, Self::Empty, Self::FullFurnished, Self::NonFurnished];

	pub fn label(self) -> &'static str {
		match self {
			Self::New => "baru",
			Self::Empty => "kosong",
			Self::FullFurnished => "full furnished",
			Self::NonFurnished => "non furnished",
		}
	}

	pub fn from_label(raw: &str) -> Option<Self> {
		let raw = raw.trim().to_lowercase();

		Self::ALL.into_iter().find(|condition| condition.label() == raw)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
	Sale,
	Rent,
	Auction,
}
impl ListingType {
	pub fn code(self) -> u8 {
		match self {
			Self::Sale => 1,
			Self::Rent => 2,
			Self::Auction => 3,
		}
	}

	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			1 => Some(Self::Sale),
			2 => Some(Self::Rent),
			3 => Some(Self::Auction),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
	House,
	Shophouse,
	Land,
	Apartment,
	Warehouse,
	Building,
}
impl PropertyType {
	pub fn code(self) -> u8 {
		match self {
			Self::House => 1,
			Self::Shophouse => 2,
			Self::Land => 3,
			Self::Apartment => 4,
			Self::Warehouse => 5,
			Self::Building => 6,
		}
	}

	pub fn from_code(code: u8) -> Option<Self> {
		match code {
			1 => Some(Self::House),
			2 => Some(Self::Shophouse),
			3 => Some(Self::Land),
			4 => Some(Self::Apartment),
			5 => Some(Self::Warehouse),
			6 => Some(Self::Building),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn condition_labels_are_case_insensitive() {
		assert_eq!(Condition::from_label(" Full Furnished "), Some(Condition::FullFurnished));
		assert_eq!(Condition::from_label("semi"), None);
	}

	#[test]
	fn codes_round_trip_and_reject_unknown_values() {
		for code in 1..=6 {
			assert_eq!(PropertyType::from_code(code).map(PropertyType::code), Some(code));
		}

		assert_eq!(PropertyType::from_code(7), None);
		assert_eq!(ListingType::from_code(0), None);
		assert_eq!(ListingType::from_code(3), Some(ListingType::Auction));
	}
}
