//! Scoring datasets: a JSON array, a `{ name, items }` object, or JSON lines.

use std::{fs, path::Path};

use color_eyre::eyre;
use serde::Deserialize;
use serde_json::{Map, Value};

use hunian_domain::constraint::Gold;

#[derive(Debug, Clone)]
pub struct DatasetItem {
	pub id: String,
	pub question: Option<String>,
	pub answer: String,
	pub gold: Gold,
	/// Gold constraints as parsed, kept for the audit sheets.
	pub gold_json: Value,
}

#[derive(Debug, Clone)]
pub struct Dataset {
	pub name: String,
	pub items: Vec<DatasetItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
	id: Option<Value>,
	question: Option<String>,
	#[serde(default)]
	answer: Option<String>,
	#[serde(default)]
	gold: Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDataset {
	Items(Vec<RawItem>),
	Named { name: Option<String>, items: Vec<RawItem> },
}

pub fn load(path: &Path) -> color_eyre::Result<Dataset> {
	let raw = fs::read_to_string(path)?;
	let default_name =
		path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default();

	parse(&raw, &default_name)
}

pub fn parse(raw: &str, default_name: &str) -> color_eyre::Result<Dataset> {
	let (name, raw_items) = match serde_json::from_str::<RawDataset>(raw.trim()) {
		Ok(RawDataset::Items(items)) => (None, items),
		Ok(RawDataset::Named { name, items }) => (name, items),
		Err(_) => (None, parse_lines(raw)?),
	};
	let mut items = Vec::with_capacity(raw_items.len());

	for (offset, raw_item) in raw_items.into_iter().enumerate() {
		let answer = raw_item.answer.unwrap_or_default();

		if answer.trim().is_empty() && is_blank(&raw_item.gold) {
			continue;
		}

		let gold_json = parse_gold(&raw_item.gold)
			.map_err(|message| eyre::eyre!("Item {}: {message}", offset + 1))?;
		let gold = Gold::from_value(&gold_json)
			.map_err(|err| eyre::eyre!("Item {}: {err}", offset + 1))?;
		let id = match raw_item.id {
			Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_string(),
			Some(Value::Number(id)) => id.to_string(),
			_ => (offset + 1).to_string(),
		};

		items.push(DatasetItem { id, question: raw_item.question, answer, gold, gold_json });
	}

	if items.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one item."));
	}

	Ok(Dataset { name: name.unwrap_or_else(|| default_name.to_string()), items })
}

fn parse_lines(raw: &str) -> color_eyre::Result<Vec<RawItem>> {
	raw.lines()
		.enumerate()
		.filter(|(_, line)| !line.trim().is_empty())
		.map(|(offset, line)| {
			serde_json::from_str(line)
				.map_err(|err| eyre::eyre!("Line {} is not a dataset item: {err}", offset + 1))
		})
		.collect()
}

fn is_blank(value: &Value) -> bool {
	match value {
		Value::Null => true,
		Value::String(text) => text.trim().is_empty(),
		_ => false,
	}
}

/// Gold constraints from an object, or from a string holding a JSON or dict literal.
pub fn parse_gold(value: &Value) -> Result<Value, String> {
	let text = match value {
		Value::Object(_) => return Ok(value.clone()),
		Value::Null => return Ok(Value::Object(Map::new())),
		Value::String(text) => text.trim(),
		other => return Err(format!("gold must be an object or a string, found {other}.")),
	};

	if text.is_empty() {
		return Ok(Value::Object(Map::new()));
	}

	let parsed = match serde_json::from_str::<Value>(text) {
		Ok(parsed) => parsed,
		Err(_) => {
			let json = literal_to_json(text)?;

			serde_json::from_str(&json).map_err(|err| format!("gold is not a dict literal: {err}."))?
		},
	};

	if parsed.is_object() { Ok(parsed) } else { Err("gold must describe an object.".to_string()) }
}

/// Rewrites a dict literal with single-quoted strings, `True`/`False`/`None`, tuples and trailing
/// commas into JSON text.
fn literal_to_json(text: &str) -> Result<String, String> {
	let mut out = String::with_capacity(text.len());
	let mut chars = text.chars().peekable();

	while let Some(ch) = chars.next() {
		match ch {
			'\'' | '"' => {
				let mut literal = String::new();
				let mut closed = false;

				while let Some(next) = chars.next() {
					match next {
						'\\' => match chars.next() {
							Some('n') => literal.push('\n'),
							Some('t') => literal.push('\t'),
							Some(escaped) => literal.push(escaped),
							None => break,
						},
						_ if next == ch => {
							closed = true;

							break;
						},
						_ => literal.push(next),
					}
				}

				if !closed {
					return Err("gold has an unterminated string.".to_string());
				}

				out.push_str(&serde_json::to_string(&literal).map_err(|err| err.to_string())?);
			},
			'}' | ']' | ')' => {
				if out.trim_end().ends_with(',') {
					let keep = out.trim_end().len() - 1;

					out.truncate(keep);
				}

				out.push(if ch == ')' { ']' } else { ch });
			},
			'(' => out.push('['),
			_ if ch.is_ascii_alphabetic() || ch == '_' => {
				let mut word = ch.to_string();

				while let Some(next) = chars.peek().copied()
					&& (next.is_ascii_alphanumeric() || next == '_')
				{
					word.push(next);
					chars.next();
				}

				out.push_str(match word.as_str() {
					"True" => "true",
					"False" => "false",
					"None" => "null",
					_ => return Err(format!("gold has an unsupported token {word}.")),
				});
			},
			_ => out.push(ch),
		}
	}

	Ok(out)
}
