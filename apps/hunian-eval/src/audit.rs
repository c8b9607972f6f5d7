//! Audit rows appended to the `per_question`, `per_item` and `global_runs` sheets.

use std::path::Path;

use hunian_domain::scoring::{Classification, ItemScore, QuestionSummary, RunReport};
use hunian_storage::audit::AuditSheet;

pub const PER_QUESTION_HEADER: [&str; 23] = [
	"run_id",
	"run_ts",
	"dataset",
	"q_index",
	"has_items",
	"no_result_claim",
	"api_note",
	"items_count",
	"avg_pca",
	"precision",
	"recall",
	"f1",
	"cpr_all",
	"cpr_at_5",
	"constraints_total",
	"constraints_correct",
	"no_result_score",
	"cm_label",
	"cm_gt",
	"cm_pred",
	"cm_threshold",
	"answer_excerpt",
	"gold_json",
];
pub const PER_ITEM_HEADER: [&str; 21] = [
	"run_id",
	"run_ts",
	"dataset",
	"q_index",
	"item_idx",
	"title",
	"link",
	"listing_id",
	"per_constraint_accuracy",
	"strict_success",
	"price",
	"kamar_tidur",
	"luas_bangunan",
	"luas_tanah",
	"lebar_bangunan",
	"jumlah_tingkat",
	"kondisi",
	"jenis_properti",
	"tipe_listing",
	"mata_angin",
	"pred_json",
];
pub const GLOBAL_RUNS_HEADER: [&str; 22] = [
	"run_id",
	"run_ts",
	"dataset",
	"threshold_t",
	"total_questions",
	"total_with_items",
	"total_no_result_conclusive",
	"macro_avg_pca",
	"macro_avg_precision",
	"macro_avg_recall",
	"macro_avg_f1",
	"micro_accuracy",
	"avg_no_result_score",
	"TP",
	"FP",
	"FN",
	"TN",
	"UNK",
	"cm_precision",
	"cm_recall",
	"cm_f1",
	"cm_accuracy",
];

const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct RunMeta {
	pub run_id: String,
	pub run_ts: String,
	pub dataset: String,
}

/// One scored question as it is written to the audit sheets.
pub struct QuestionRow<'a> {
	pub q_index: usize,
	pub summary: &'a QuestionSummary,
	pub classification: &'a Classification,
	pub api_note: &'a str,
	pub answer: &'a str,
	pub gold_json: String,
}

pub struct AuditSheets {
	per_question: AuditSheet,
	per_item: AuditSheet,
	global_runs: AuditSheet,
}
impl AuditSheets {
	pub fn open(dir: &Path) -> hunian_storage::Result<Self> {
		Ok(Self {
			per_question: AuditSheet::open(dir, "per_question", &PER_QUESTION_HEADER)?,
			per_item: AuditSheet::open(dir, "per_item", &PER_ITEM_HEADER)?,
			global_runs: AuditSheet::open(dir, "global_runs", &GLOBAL_RUNS_HEADER)?,
		})
	}

	pub fn append_question(
		&self,
		meta: &RunMeta,
		row: &QuestionRow<'_>,
	) -> hunian_storage::Result<()> {
		self.per_question.append(question_record(meta, row))?;

		for item in row.summary.items() {
			self.per_item.append(item_record(meta, row.q_index, item))?;
		}

		Ok(())
	}

	pub fn append_run(&self, meta: &RunMeta, report: &RunReport) -> hunian_storage::Result<()> {
		self.global_runs.append(run_record(meta, report))
	}
}

pub fn question_record(meta: &RunMeta, row: &QuestionRow<'_>) -> Vec<String> {
	let items = match row.summary {
		QuestionSummary::Items(items) => Some(items),
		QuestionSummary::NoResult(_) => None,
	};
	let classification = row.classification;

	vec![
		meta.run_id.clone(),
		meta.run_ts.clone(),
		meta.dataset.clone(),
		row.q_index.to_string(),
		row.summary.has_items().to_string(),
		row.summary.no_result_claim().to_string(),
		row.api_note.to_string(),
		row.summary.items().len().to_string(),
		optional(items.map(|items| items.avg_pca)),
		optional(items.map(|items| items.precision)),
		optional(items.map(|items| items.recall)),
		optional(items.map(|items| items.f1)),
		optional(items.map(|items| items.cpr_all)),
		optional(items.map(|items| items.cpr_at_5)),
		items.map(|items| items.constraints_total.to_string()).unwrap_or_default(),
		items.map(|items| items.constraints_correct.to_string()).unwrap_or_default(),
		optional(row.summary.no_result_score()),
		classification.label.as_str().to_string(),
		classification.ground_truth.label().to_string(),
		if classification.predicted_positive { "Pos" } else { "Neg" }.to_string(),
		classification.threshold.to_string(),
		excerpt(row.answer),
		row.gold_json.clone(),
	]
}

pub fn item_record(meta: &RunMeta, q_index: usize, item: &ItemScore) -> Vec<String> {
	let fields = &item.fields;

	vec![
		meta.run_id.clone(),
		meta.run_ts.clone(),
		meta.dataset.clone(),
		q_index.to_string(),
		item.index.to_string(),
		item.title.clone(),
		item.link.clone().unwrap_or_default(),
		optional(item.listing_id),
		item.per_constraint_accuracy.to_string(),
		item.strict_success.to_string(),
		optional(fields.price),
		optional(fields.kamar_tidur),
		optional(fields.luas_bangunan),
		optional(fields.luas_tanah),
		optional(fields.lebar_bangunan),
		optional(fields.jumlah_tingkat),
		fields.kondisi.map(|kondisi| kondisi.label().to_string()).unwrap_or_default(),
		optional(fields.jenis_properti.map(|kind| kind.code())),
		optional(fields.tipe_listing.map(|kind| kind.code())),
		fields.mata_angin.clone().unwrap_or_default(),
		serde_json::to_string(&item.predicates).unwrap_or_else(|_| "{}".to_string()),
	]
}

pub fn run_record(meta: &RunMeta, report: &RunReport) -> Vec<String> {
	let c = report.confusion;

	vec![
		meta.run_id.clone(),
		meta.run_ts.clone(),
		meta.dataset.clone(),
		report.threshold.to_string(),
		report.total_questions.to_string(),
		report.total_with_items.to_string(),
		report.total_no_result_conclusive.to_string(),
		optional(report.macro_avg_pca),
		optional(report.macro_avg_precision),
		optional(report.macro_avg_recall),
		optional(report.macro_avg_f1),
		optional(report.micro_accuracy),
		optional(report.avg_no_result_score),
		c.tp.to_string(),
		c.fp.to_string(),
		c.fn_.to_string(),
		c.tn.to_string(),
		c.unk.to_string(),
		report.cm_precision.to_string(),
		report.cm_recall.to_string(),
		report.cm_f1.to_string(),
		report.cm_accuracy.to_string(),
	]
}

/// First 200 characters of the answer with whitespace runs collapsed.
pub fn excerpt(answer: &str) -> String {
	answer.split_whitespace().collect::<Vec<_>>().join(" ").chars().take(EXCERPT_CHARS).collect()
}

fn optional<T: ToString>(value: Option<T>) -> String {
	value.map(|value| value.to_string()).unwrap_or_default()
}
