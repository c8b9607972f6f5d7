use serde::Serialize;

/// Turn category chosen by the classifier model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Search,
	UpdateRequest,
	Greeting,
	OffTopic,
}
impl Intent {
	/// Reads the first digit of a classifier reply. Anything unrecognized is off topic.
	pub fn parse(reply: &str) -> Self {
		match reply.chars().find(char::is_ascii_digit) {
			Some('1') => Self::Search,
			Some('2') => Self::UpdateRequest,
			Some('3') => Self::Greeting,
			_ => Self::OffTopic,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Search => "search",
			Self::UpdateRequest => "update_request",
			Self::Greeting => "greeting",
			Self::OffTopic => "off_topic",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifier_replies_map_to_intents() {
		assert_eq!(Intent::parse("1"), Intent::Search);
		assert_eq!(Intent::parse(" Kategori: 2\n"), Intent::UpdateRequest);
		assert_eq!(Intent::parse("3."), Intent::Greeting);
		assert_eq!(Intent::parse("4"), Intent::OffTopic);
		assert_eq!(Intent::parse("tidak tahu"), Intent::OffTopic);
	}
}
