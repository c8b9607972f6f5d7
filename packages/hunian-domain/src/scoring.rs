//! Per-question summaries, confusion classification and run-level aggregation.

use serde::Serialize;

use crate::{
	answer,
	constraint::{self, Gold, MatchThresholds, Predicates},
	extract::ExtractedFields,
	listing,
	truth::TruthRecord,
};

const CPR_AT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemScore {
	/// 1-based position within the answer.
	pub index: usize,
	pub title: String,
	pub link: Option<String>,
	pub listing_id: Option<u64>,
	pub fields: ExtractedFields,
	pub predicates: Predicates,
	pub per_constraint_accuracy: f64,
	pub strict_success: bool,
}
impl ItemScore {
	pub fn new(
		index: usize,
		title: String,
		link: Option<String>,
		listing_id: Option<u64>,
		fields: ExtractedFields,
		predicates: Predicates,
	) -> Self {
		let passed = predicates.values().filter(|passed| **passed).count();
		let total = predicates.len();
		let per_constraint_accuracy = ratio(passed, total);
		let strict_success = total > 0 && passed == total;

		Self {
			index,
			title,
			link,
			listing_id,
			fields,
			predicates,
			per_constraint_accuracy,
			strict_success,
		}
	}

	/// Extracts fields from one answer item, overlays the truth record and checks the gold set.
	pub fn evaluate(
		index: usize,
		item_text: &str,
		gold: &Gold,
		truth: Option<&TruthRecord>,
		thresholds: MatchThresholds,
	) -> Self {
		let link = listing::first_link(item_text).map(ToString::to_string);
		let listing_id = link.as_deref().and_then(answer::parse_listing_id);
		let extracted = ExtractedFields::from_text(item_text);
		let fields = match truth {
			Some(truth) => extracted.with_truth(truth),
			None => extracted,
		};
		let predicates = constraint::evaluate(gold, &fields, item_text, truth, thresholds);

		Self::new(index, answer::title_snippet(item_text), link, listing_id, fields, predicates)
	}
}

/// Outcome of checking the listing API for rows matching a gold filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emptiness {
	Empty,
	HasData,
	/// The check failed or could not run.
	Unknown { reason: String },
}
impl Emptiness {
	pub fn note(&self) -> String {
		match self {
			Self::Empty => "API empty".to_string(),
			Self::HasData => "API has data".to_string(),
			Self::Unknown { reason } => reason.clone(),
		}
	}

	pub fn ground_truth(&self) -> GroundTruth {
		match self {
			Self::Empty => GroundTruth::Negative,
			Self::HasData => GroundTruth::Positive,
			Self::Unknown { .. } => GroundTruth::Unknown,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GroundTruth {
	#[serde(rename = "Pos")]
	Positive,
	#[serde(rename = "Neg")]
	Negative,
	Unknown,
}
impl GroundTruth {
	pub fn label(self) -> &'static str {
		match self {
			Self::Positive => "Pos",
			Self::Negative => "Neg",
			Self::Unknown => "Unknown",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoResultSummary {
	/// 1.0 when the API agrees nothing matches, 0.0 when it has rows, `None` when inconclusive.
	pub score: Option<f64>,
	pub note: String,
}
impl NoResultSummary {
	pub fn from_emptiness(emptiness: &Emptiness) -> Self {
		let score = match emptiness {
			Emptiness::Empty => Some(1.0),
			Emptiness::HasData => Some(0.0),
			Emptiness::Unknown { .. } => None,
		};

		Self { score, note: emptiness.note() }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemsSummary {
	pub items: Vec<ItemScore>,
	pub avg_pca: f64,
	pub precision: f64,
	pub recall: f64,
	pub f1: f64,
	pub cpr_all: f64,
	pub cpr_at_5: f64,
	pub constraints_total: usize,
	pub constraints_correct: usize,
}
impl ItemsSummary {
	pub fn from_items(items: Vec<ItemScore>) -> Self {
		let strict = items.iter().filter(|item| item.strict_success).count();
		let head = items.len().min(CPR_AT);
		let strict_head = items.iter().take(head).filter(|item| item.strict_success).count();
		let constraints_total: usize = items.iter().map(|item| item.predicates.len()).sum();
		let constraints_correct: usize = items
			.iter()
			.map(|item| item.predicates.values().filter(|passed| **passed).count())
			.sum();
		let avg_pca = if items.is_empty() {
			0.0
		} else {
			items.iter().map(|item| item.per_constraint_accuracy).sum::<f64>() / items.len() as f64
		};
		// Every gold constraint is an expected positive, so false positives cannot occur.
		let precision = if constraints_correct > 0 { 1.0 } else { 0.0 };
		let recall = ratio(constraints_correct, constraints_total);
		let f1 = harmonic_mean(precision, recall);

		Self {
			cpr_all: ratio(strict, items.len()),
			cpr_at_5: ratio(strict_head, head),
			items,
			avg_pca,
			precision,
			recall,
			f1,
			constraints_total,
			constraints_correct,
		}
	}
}

/// A question is scored through exactly one branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "branch", rename_all = "snake_case")]
pub enum QuestionSummary {
	NoResult(NoResultSummary),
	Items(ItemsSummary),
}
impl QuestionSummary {
	pub fn has_items(&self) -> bool {
		matches!(self, Self::Items(_))
	}

	pub fn no_result_claim(&self) -> bool {
		matches!(self, Self::NoResult(_))
	}

	pub fn no_result_score(&self) -> Option<f64> {
		match self {
			Self::NoResult(summary) => summary.score,
			Self::Items(_) => None,
		}
	}

	pub fn items(&self) -> &[ItemScore] {
		match self {
			Self::NoResult(_) => &[],
			Self::Items(summary) => &summary.items,
		}
	}

	pub fn cpr_all(&self) -> Option<f64> {
		match self {
			Self::NoResult(_) => None,
			Self::Items(summary) => Some(summary.cpr_all),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConfusionLabel {
	#[serde(rename = "TP")]
	TruePositive,
	#[serde(rename = "FP")]
	FalsePositive,
	#[serde(rename = "FN")]
	FalseNegative,
	#[serde(rename = "TN")]
	TrueNegative,
	#[serde(rename = "UNK")]
	Unknown,
}
impl ConfusionLabel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::TruePositive => "TP",
			Self::FalsePositive => "FP",
			Self::FalseNegative => "FN",
			Self::TrueNegative => "TN",
			Self::Unknown => "UNK",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
	pub label: ConfusionLabel,
	pub ground_truth: GroundTruth,
	pub predicted_positive: bool,
	pub threshold: f64,
}

/// Positive prediction: items whose CPR@All reaches `threshold`. Negative prediction: a
/// conclusively checked no-result claim.
pub fn classify(
	ground_truth: GroundTruth,
	summary: &QuestionSummary,
	threshold: f64,
) -> Classification {
	let predicted_positive = summary.cpr_all().is_some_and(|cpr| cpr >= threshold);
	let predicted_negative = summary.no_result_claim() && summary.no_result_score().is_some();
	let label = match ground_truth {
		GroundTruth::Unknown => ConfusionLabel::Unknown,
		GroundTruth::Positive if predicted_positive => ConfusionLabel::TruePositive,
		GroundTruth::Positive => ConfusionLabel::FalseNegative,
		GroundTruth::Negative if predicted_negative => ConfusionLabel::TrueNegative,
		GroundTruth::Negative => ConfusionLabel::FalsePositive,
	};

	Classification { label, ground_truth, predicted_positive, threshold }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
	#[serde(rename = "TP")]
	pub tp: usize,
	#[serde(rename = "FP")]
	pub fp: usize,
	#[serde(rename = "FN")]
	pub fn_: usize,
	#[serde(rename = "TN")]
	pub tn: usize,
	#[serde(rename = "UNK")]
	pub unk: usize,
}
impl ConfusionCounts {
	pub fn record(&mut self, label: ConfusionLabel) {
		match label {
			ConfusionLabel::TruePositive => self.tp += 1,
			ConfusionLabel::FalsePositive => self.fp += 1,
			ConfusionLabel::FalseNegative => self.fn_ += 1,
			ConfusionLabel::TrueNegative => self.tn += 1,
			ConfusionLabel::Unknown => self.unk += 1,
		}
	}

	pub fn total(&self) -> usize {
		self.tp + self.fp + self.fn_ + self.tn + self.unk
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
	pub threshold: f64,
	pub total_questions: usize,
	pub total_with_items: usize,
	pub total_no_result_conclusive: usize,
	pub macro_avg_pca: Option<f64>,
	pub macro_avg_precision: Option<f64>,
	pub macro_avg_recall: Option<f64>,
	pub macro_avg_f1: Option<f64>,
	pub micro_accuracy: Option<f64>,
	pub avg_no_result_score: Option<f64>,
	pub confusion: ConfusionCounts,
	pub cm_precision: f64,
	pub cm_recall: f64,
	pub cm_f1: f64,
	pub cm_accuracy: f64,
}

/// Accumulates per-question summaries into corpus-level metrics.
#[derive(Debug, Clone, Default)]
pub struct RunScorer {
	threshold: f64,
	questions: usize,
	pca: Vec<f64>,
	precision: Vec<f64>,
	recall: Vec<f64>,
	f1: Vec<f64>,
	micro_correct: usize,
	micro_total: usize,
	no_result_scores: Vec<f64>,
	confusion: ConfusionCounts,
}
impl RunScorer {
	pub fn new(threshold: f64) -> Self {
		Self { threshold, ..Default::default() }
	}

	pub fn threshold(&self) -> f64 {
		self.threshold
	}

	/// Classifies the question, records it and returns its classification.
	pub fn add(&mut self, summary: &QuestionSummary, ground_truth: GroundTruth) -> Classification {
		let classification = classify(ground_truth, summary, self.threshold);

		self.questions += 1;
		self.confusion.record(classification.label);

		match summary {
			QuestionSummary::Items(items) => {
				self.pca.push(items.avg_pca);
				self.precision.push(items.precision);
				self.recall.push(items.recall);
				self.f1.push(items.f1);
				self.micro_correct += items.constraints_correct;
				self.micro_total += items.constraints_total;
			},
			QuestionSummary::NoResult(no_result) =>
				if let Some(score) = no_result.score {
					self.no_result_scores.push(score);
				},
		}

		classification
	}

	pub fn finish(&self) -> RunReport {
		let c = self.confusion;
		let cm_precision = ratio(c.tp, c.tp + c.fp);
		let cm_recall = ratio(c.tp, c.tp + c.fn_);

		RunReport {
			threshold: self.threshold,
			total_questions: self.questions,
			total_with_items: self.pca.len(),
			total_no_result_conclusive: self.no_result_scores.len(),
			macro_avg_pca: mean(&self.pca),
			macro_avg_precision: mean(&self.precision),
			macro_avg_recall: mean(&self.recall),
			macro_avg_f1: mean(&self.f1),
			micro_accuracy: (self.micro_total > 0)
				.then(|| self.micro_correct as f64 / self.micro_total as f64),
			avg_no_result_score: mean(&self.no_result_scores),
			confusion: c,
			cm_precision,
			cm_recall,
			cm_f1: harmonic_mean(cm_precision, cm_recall),
			cm_accuracy: ratio(c.tp + c.tn, c.tp + c.tn + c.fp + c.fn_),
		}
	}
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
	if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

fn harmonic_mean(a: f64, b: f64) -> f64 {
	if a + b > 0.0 { 2.0 * a * b / (a + b) } else { 0.0 }
}

fn mean(values: &[f64]) -> Option<f64> {
	(!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::constraint::Constraint;

	fn item(index: usize, results: &[(Constraint, bool)]) -> ItemScore {
		ItemScore::new(
			index,
			format!("Item {index}"),
			None,
			None,
			ExtractedFields::default(),
			results.iter().copied().collect(),
		)
	}

	fn items_summary(strict: usize, failing: usize) -> QuestionSummary {
		let items = (0..strict)
			.map(|idx| item(idx + 1, &[(Constraint::Keyword, true)]))
			.chain((0..failing).map(|idx| {
				item(strict + idx + 1, &[(Constraint::Keyword, true), (Constraint::HargaMax, false)])
			}))
			.collect();

		QuestionSummary::Items(ItemsSummary::from_items(items))
	}

	#[test]
	fn item_scores_count_passed_constraints() {
		let partial = item(1, &[(Constraint::Keyword, true), (Constraint::HargaMax, false)]);
		let empty = item(2, &[]);

		assert_eq!(partial.per_constraint_accuracy, 0.5);
		assert!(!partial.strict_success);
		assert_eq!(empty.per_constraint_accuracy, 0.0);
		assert!(!empty.strict_success);
	}

	#[test]
	fn items_summary_computes_cpr_and_item_level_metrics() {
		let QuestionSummary::Items(summary) = items_summary(4, 3) else {
			panic!("Expected items summary.");
		};

		assert!((summary.cpr_all - 4.0 / 7.0).abs() < 1e-9);
		assert!((summary.cpr_at_5 - 0.8).abs() < 1e-9);
		assert_eq!(summary.constraints_total, 10);
		assert_eq!(summary.constraints_correct, 7);
		assert_eq!(summary.precision, 1.0);
		assert!((summary.recall - 0.7).abs() < 1e-9);
	}

	#[test]
	fn classification_follows_ground_truth_and_threshold() {
		let strong = items_summary(4, 1);
		let weak = items_summary(1, 4);
		let claimed_empty = QuestionSummary::NoResult(NoResultSummary::from_emptiness(&Emptiness::Empty));
		let inconclusive = QuestionSummary::NoResult(NoResultSummary::from_emptiness(
			&Emptiness::Unknown { reason: "API timeout".to_string() },
		));

		assert_eq!(classify(GroundTruth::Positive, &strong, 0.6).label, ConfusionLabel::TruePositive);
		assert_eq!(classify(GroundTruth::Positive, &weak, 0.6).label, ConfusionLabel::FalseNegative);
		assert_eq!(
			classify(GroundTruth::Negative, &claimed_empty, 0.6).label,
			ConfusionLabel::TrueNegative
		);
		assert_eq!(
			classify(GroundTruth::Negative, &inconclusive, 0.6).label,
			ConfusionLabel::FalsePositive
		);
		assert_eq!(classify(GroundTruth::Negative, &strong, 0.6).label, ConfusionLabel::FalsePositive);
		assert_eq!(classify(GroundTruth::Unknown, &strong, 0.6).label, ConfusionLabel::Unknown);
	}

	#[test]
	fn run_report_excludes_unknown_from_confusion_metrics() {
		let mut scorer = RunScorer::new(0.6);

		scorer.add(&items_summary(5, 0), GroundTruth::Positive);
		scorer.add(&items_summary(0, 2), GroundTruth::Positive);
		scorer.add(
			&QuestionSummary::NoResult(NoResultSummary::from_emptiness(&Emptiness::Empty)),
			GroundTruth::Negative,
		);
		scorer.add(&items_summary(3, 0), GroundTruth::Unknown);

		let report = scorer.finish();

		assert_eq!(report.total_questions, 4);
		assert_eq!(report.total_with_items, 3);
		assert_eq!(report.total_no_result_conclusive, 1);
		assert_eq!(report.avg_no_result_score, Some(1.0));
		assert_eq!(report.confusion, ConfusionCounts { tp: 1, fp: 0, fn_: 1, tn: 1, unk: 1 });
		assert_eq!(report.confusion.total(), 4);
		assert_eq!(report.cm_precision, 1.0);
		assert_eq!(report.cm_recall, 0.5);
		assert!((report.cm_accuracy - 2.0 / 3.0).abs() < 1e-9);
		assert!((report.micro_accuracy.expect("Expected micro accuracy.") - 10.0 / 12.0).abs() < 1e-9);
	}

	#[test]
	fn empty_run_has_no_macro_metrics() {
		let report = RunScorer::new(0.6).finish();

		assert_eq!(report.macro_avg_pca, None);
		assert_eq!(report.micro_accuracy, None);
		assert_eq!(report.cm_f1, 0.0);
	}
}
