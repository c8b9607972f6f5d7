//! Runs benchmark questions through the assistant and records answers for later scoring.

use std::{fs, path::Path};

use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use hunian_service::{Assistant, RetrievalMode, TurnRequest};

#[derive(Debug, Clone, Deserialize)]
pub struct CollectQuestion {
	pub id: Option<Value>,
	pub question: String,
	#[serde(default)]
	pub gold: Value,
}

/// One collected answer. The layout is a scoring dataset line plus turn telemetry.
#[derive(Debug, Clone, Serialize)]
pub struct CollectedRow {
	pub id: String,
	pub question: String,
	pub answer: String,
	pub gold: Value,
	pub method: &'static str,
	pub intent: &'static str,
	pub rewritten_question: String,
	pub structured_count: usize,
	pub vector_count: usize,
	pub selected_count: usize,
	pub input_token: u64,
	pub output_token: u64,
	pub total_token: u64,
	pub response_count: u32,
	pub response_time: u64,
	pub cost_usd: f64,
	pub cost_idr: f64,
}

pub fn load_questions(path: &Path) -> color_eyre::Result<Vec<CollectQuestion>> {
	parse_questions(&fs::read_to_string(path)?)
}

pub fn parse_questions(raw: &str) -> color_eyre::Result<Vec<CollectQuestion>> {
	let questions: Vec<CollectQuestion> = match serde_json::from_str(raw.trim()) {
		Ok(questions) => questions,
		Err(_) => raw
			.lines()
			.enumerate()
			.filter(|(_, line)| !line.trim().is_empty())
			.map(|(offset, line)| {
				serde_json::from_str(line)
					.map_err(|err| eyre::eyre!("Line {} is not a question: {err}", offset + 1))
			})
			.collect::<color_eyre::Result<_>>()?,
	};

	if questions.is_empty() {
		return Err(eyre::eyre!("Question file must include at least one question."));
	}

	Ok(questions)
}

/// Asks each question in a fresh session. Failed turns are logged and left out.
///
/// Returns once every chat-history append for the collected turns has finished.
pub async fn collect(
	assistant: &Assistant,
	questions: Vec<CollectQuestion>,
	mode: RetrievalMode,
	run_id: &str,
) -> Vec<CollectedRow> {
	let mut rows = Vec::with_capacity(questions.len());

	for (offset, question) in questions.into_iter().enumerate() {
		let id = match question.id {
			Some(Value::String(id)) if !id.trim().is_empty() => id,
			Some(Value::Number(id)) => id.to_string(),
			_ => (offset + 1).to_string(),
		};
		let session_id = format!("collect-{run_id}-{}", offset + 1);
		let request = TurnRequest::new(session_id, question.question.clone()).with_mode(mode);

		match assistant.handle_turn(request).await {
			Ok(report) => rows.push(CollectedRow {
				id,
				question: question.question,
				answer: report.answer,
				gold: question.gold,
				method: report.method.as_str(),
				intent: report.intent.as_str(),
				rewritten_question: report.rewritten_question,
				structured_count: report.structured_count,
				vector_count: report.vector_count,
				selected_count: report.selected_count,
				input_token: report.usage.prompt_tokens,
				output_token: report.usage.completion_tokens,
				total_token: report.usage.total_tokens,
				response_count: report.response_count,
				response_time: report.elapsed_ms,
				cost_usd: report.cost_usd,
				cost_idr: report.cost_idr,
			}),
			Err(err) => {
				tracing::error!(
					id = %id,
					error = %err,
					kind = err.kind(),
					"Question collection failed."
				);
			},
		}
	}

	assistant.flush_history().await;

	rows
}

pub fn write_rows(path: &Path, rows: &[CollectedRow]) -> color_eyre::Result<()> {
	let mut out = String::new();

	for row in rows {
		out.push_str(&serde_json::to_string(row)?);
		out.push('\n');
	}

	if let Some(parent) = path.parent()
		&& !parent.as_os_str().is_empty()
	{
		fs::create_dir_all(parent)?;
	}

	fs::write(path, out)?;

	Ok(())
}
