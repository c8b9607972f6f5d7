use time::{OffsetDateTime, UtcOffset, macros::offset};

/// Western Indonesia Time.
pub const WIB: UtcOffset = offset!(+7);

/// Part of day used to greet the user, in Indonesian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
	Pagi,
	Siang,
	Sore,
	Malam,
}
impl DayPart {
	pub fn from_hour(hour: u8) -> Self {
		match hour {
			5..=10 => Self::Pagi,
			11..=14 => Self::Siang,
			15..=17 => Self::Sore,
			_ => Self::Malam,
		}
	}

	pub fn at(instant: OffsetDateTime) -> Self {
		Self::from_hour(instant.to_offset(WIB).hour())
	}

	pub fn now() -> Self {
		Self::at(OffsetDateTime::now_utc())
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pagi => "Pagi",
			Self::Siang => "Siang",
			Self::Sore => "Sore",
			Self::Malam => "Malam",
		}
	}
}
