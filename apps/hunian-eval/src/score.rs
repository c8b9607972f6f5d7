//! Batch scoring of stored answers against gold constraints.

use std::{path::PathBuf, sync::Arc};

use color_eyre::eyre;
use serde::Serialize;
use tokio::{sync::Semaphore, task::JoinSet};

use hunian_config::Config;
use hunian_domain::scoring::{Classification, QuestionSummary, RunReport, RunScorer};
use hunian_service::{Evaluator, ListingSource, QuestionEvaluation};

use crate::{
	audit::{AuditSheets, QuestionRow, RunMeta},
	dataset::Dataset,
};

#[derive(Debug, Clone)]
pub struct ScoreOptions {
	pub threshold: f64,
	pub concurrency: usize,
	pub audit_dir: Option<PathBuf>,
}
impl ScoreOptions {
	/// Command-line values win over the `[evaluation]` section.
	pub fn resolve(
		cfg: &Config,
		threshold: Option<f64>,
		concurrency: Option<usize>,
		audit_dir: Option<PathBuf>,
	) -> color_eyre::Result<Self> {
		let threshold = threshold.unwrap_or(cfg.evaluation.cpr_threshold);

		if !(0.0..=1.0).contains(&threshold) {
			return Err(eyre::eyre!("--threshold must be between 0.0 and 1.0."));
		}

		Ok(Self {
			threshold,
			concurrency: concurrency.unwrap_or(cfg.evaluation.concurrency).max(1),
			audit_dir: audit_dir.or_else(|| cfg.evaluation.audit_dir.clone()),
		})
	}
}

#[derive(Debug, Serialize)]
pub struct ScoreOutput {
	pub run_id: String,
	pub run_ts: String,
	pub dataset: String,
	pub threshold: f64,
	pub summary: RunReport,
	pub questions: Vec<QuestionReport>,
}

#[derive(Debug, Serialize)]
pub struct QuestionReport {
	pub q_index: usize,
	pub id: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub question: Option<String>,
	pub classification: Classification,
	pub api_note: String,
	pub summary: QuestionSummary,
}

/// Evaluates every item with bounded concurrency, then aggregates in dataset order.
pub async fn score_dataset(
	cfg: &Config,
	dataset: Dataset,
	options: &ScoreOptions,
	listing: Arc<dyn ListingSource>,
	meta: RunMeta,
) -> color_eyre::Result<ScoreOutput> {
	let evaluator = Arc::new(Evaluator::new(cfg, listing));
	let evaluations = evaluate_all(&evaluator, &dataset, options.concurrency).await?;
	let audit = match &options.audit_dir {
		Some(dir) => Some(AuditSheets::open(dir)?),
		None => None,
	};
	let mut scorer = RunScorer::new(options.threshold);
	let mut questions = Vec::with_capacity(dataset.items.len());

	for ((offset, evaluation), item) in evaluations.into_iter().zip(dataset.items) {
		let q_index = offset + 1;
		let classification = scorer.add(&evaluation.summary, evaluation.emptiness.ground_truth());

		tracing::info!(
			q_index,
			label = classification.label.as_str(),
			ground_truth = classification.ground_truth.label(),
			cpr_all = evaluation.summary.cpr_all(),
			api_note = %evaluation.api_note,
			"Question scored."
		);

		if let Some(audit) = &audit {
			audit.append_question(
				&meta,
				&QuestionRow {
					q_index,
					summary: &evaluation.summary,
					classification: &classification,
					api_note: &evaluation.api_note,
					answer: &item.answer,
					gold_json: item.gold_json.to_string(),
				},
			)?;
		}

		questions.push(QuestionReport {
			q_index,
			id: item.id,
			question: item.question,
			classification,
			api_note: evaluation.api_note,
			summary: evaluation.summary,
		});
	}

	let summary = scorer.finish();

	if let Some(audit) = &audit {
		audit.append_run(&meta, &summary)?;

		tracing::info!(run_id = %meta.run_id, "Audit sheets appended.");
	}

	Ok(ScoreOutput {
		run_id: meta.run_id,
		run_ts: meta.run_ts,
		dataset: meta.dataset,
		threshold: options.threshold,
		summary,
		questions,
	})
}

async fn evaluate_all(
	evaluator: &Arc<Evaluator>,
	dataset: &Dataset,
	concurrency: usize,
) -> color_eyre::Result<Vec<(usize, QuestionEvaluation)>> {
	let semaphore = Arc::new(Semaphore::new(concurrency));
	let mut tasks = JoinSet::new();

	for (offset, item) in dataset.items.iter().enumerate() {
		let evaluator = evaluator.clone();
		let semaphore = semaphore.clone();
		let answer = item.answer.clone();
		let gold = item.gold.clone();

		tasks.spawn(async move {
			let _permit = semaphore.acquire_owned().await?;
			let evaluation = evaluator.evaluate(&answer, &gold).await;

			Ok::<_, tokio::sync::AcquireError>((offset, evaluation))
		});
	}

	let mut evaluations = Vec::with_capacity(dataset.items.len());

	while let Some(joined) = tasks.join_next().await {
		evaluations.push(joined??);
	}

	evaluations.sort_by_key(|(offset, _)| *offset);

	Ok(evaluations)
}
