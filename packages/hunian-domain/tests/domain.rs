use serde_json::json;

use hunian_domain::{
	answer,
	constraint::{Constraint, Gold, MatchThresholds},
	filter::{self, Continuity, Filter},
	fusion, listing,
	scoring::{
		ConfusionLabel, Emptiness, GroundTruth, ItemScore, ItemsSummary, NoResultSummary,
		QuestionSummary, RunScorer,
	},
	truth::TruthRecord,
};

fn gold(value: serde_json::Value) -> Gold {
	Gold::from_value(&value).expect("Expected gold to parse.")
}

fn score_answer(answer_text: &str, gold: &Gold) -> QuestionSummary {
	let items = answer::split_listings(answer_text)
		.iter()
		.enumerate()
		.map(|(idx, item)| ItemScore::evaluate(idx + 1, item, gold, None, MatchThresholds::default()))
		.collect();

	QuestionSummary::Items(ItemsSummary::from_items(items))
}

#[test]
fn ringroad_follow_up_advances_the_page() {
	let previous = Filter::from_value(json!({
		"keyword": "ringroad",
		"harga_max": 800000000,
		"page": 1
	}))
	.expect("Expected previous filter.");
	let same = Filter::from_reply(r#"{"keyword": "ringroad", "harga_max": 800000000}"#)
		.expect("Expected current filter.");
	let cheaper = Filter::from_reply(r#"{"keyword": "ringroad", "harga_max": 500000000}"#)
		.expect("Expected current filter.");

	assert_eq!(filter::next_page(Some(&previous), &same, Continuity::Subset), 2);
	assert_eq!(filter::next_page(Some(&previous), &cheaper, Continuity::Subset), 1);
}

#[test]
fn changed_search_starts_at_page_one_even_when_the_page_is_echoed() {
	let previous = Filter::from_value(json!({
		"keyword": "ringroad",
		"harga_max": 800000000,
		"page": 3
	}))
	.expect("Expected previous filter.");
	let changed =
		Filter::from_reply(r#"{"keyword": "ringroad", "harga_max": 500000000, "page": 3}"#)
			.expect("Expected current filter.");
	let priced = Filter::from_reply(r#"{"keyword": "medan", "harga_max": "800.000.000"}"#)
		.expect("Expected grouped price to parse.");

	assert_eq!(filter::next_page(Some(&previous), &changed, Continuity::Subset), 1);
	assert_eq!(priced.harga_max, Some(800_000_000));
}

#[test]
fn fused_listings_come_from_structured_search_when_supply_suffices() {
	let structured = (1..=7)
		.map(|id| format!("Rumah {id}\nLink: https://x/listing/{id}"))
		.collect::<Vec<_>>()
		.join("\n---------\n");
	let vector = ["Ruko A", "Ruko B", "Ruko C"];
	let selection = fusion::select(&structured, &vector, 5);
	let expected: Vec<String> = listing::split_blocks(&structured).into_iter().take(5).collect();

	assert_eq!(
		selection.items.iter().map(|item| item.text.clone()).collect::<Vec<_>>(),
		expected
	);
	assert_eq!(selection.vector_count, 0);
}

#[test]
fn dedupe_is_idempotent_across_mixed_candidates() {
	let candidates = [
		"Rumah A https://x/listing/1",
		"Rumah A lagi https://x/listing/1",
		"Ruko tanpa link",
		"RUKO TANPA LINK",
		"Gudang https://x/listing/9",
	];
	let once = listing::dedupe(candidates);

	assert_eq!(once.len(), 3);
	assert_eq!(listing::dedupe(&once), once);
}

#[test]
fn cemara_listing_satisfies_every_gold_constraint() {
	let gold = gold(json!({ "keyword": "cemara", "tipe_listing": 1, "jenis_properti": 1 }));
	let answer_text = "Rumah dijual di Cemara Asri, 3 kamar tidur, harga Rp 1,2 M.\nLink: https://x/listing/42";
	let summary = score_answer(answer_text, &gold);
	let item = &summary.items()[0];

	assert_eq!(summary.items().len(), 1);
	assert_eq!(item.listing_id, Some(42));
	assert!(item.predicates.values().all(|passed| *passed));
	assert_eq!(item.predicates.len(), 3);
	assert!(item.strict_success);
	assert_eq!(item.per_constraint_accuracy, 1.0);
}

#[test]
fn price_above_gold_maximum_fails_the_item() {
	let gold = gold(json!({ "keyword": "medan", "harga_max": 800000000 }));
	let summary =
		score_answer("Rumah di Medan, harga Rp 900.000.000\nLink: https://x/listing/7", &gold);
	let item = &summary.items()[0];

	assert!(item.predicates[&Constraint::Keyword]);
	assert!(!item.predicates[&Constraint::HargaMax]);
	assert!(!item.strict_success);
}

#[test]
fn truth_record_overrides_extracted_price() {
	let gold = gold(json!({ "harga_max": 800000000 }));
	let truth = TruthRecord { price: Some(750_000_000), ..Default::default() };
	let item = ItemScore::evaluate(
		1,
		"Rumah di Medan, harga Rp 900.000.000\nLink: https://x/listing/7",
		&gold,
		Some(&truth),
		MatchThresholds::default(),
	);

	assert_eq!(item.fields.price, Some(750_000_000));
	assert!(item.strict_success);
}

#[test]
fn no_result_claims_never_carry_items() {
	let claim = "Maaf, saya tidak menemukan rumah yang sesuai kriteria Anda.";

	assert!(answer::looks_like_no_result(claim));

	for emptiness in
		[Emptiness::Empty, Emptiness::HasData, Emptiness::Unknown { reason: "API timeout".into() }]
	{
		let summary = QuestionSummary::NoResult(NoResultSummary::from_emptiness(&emptiness));

		assert_eq!(summary.has_items(), !summary.no_result_claim());
		assert!(summary.items().is_empty());
	}
}

#[test]
fn confusion_counts_cover_every_question() {
	let gold = gold(json!({ "keyword": "medan" }));
	let hit = score_answer("Rumah di Medan https://x/listing/1", &gold);
	let miss = score_answer("Rumah di Binjai https://x/listing/2", &gold);
	let claim = QuestionSummary::NoResult(NoResultSummary::from_emptiness(&Emptiness::Empty));
	let mut scorer = RunScorer::new(0.60);
	let labels = [
		scorer.add(&hit, GroundTruth::Positive).label,
		scorer.add(&miss, GroundTruth::Positive).label,
		scorer.add(&claim, GroundTruth::Negative).label,
		scorer.add(&hit, GroundTruth::Negative).label,
		scorer.add(&miss, GroundTruth::Unknown).label,
	];
	let report = scorer.finish();

	assert_eq!(
		labels,
		[
			ConfusionLabel::TruePositive,
			ConfusionLabel::FalseNegative,
			ConfusionLabel::TrueNegative,
			ConfusionLabel::FalsePositive,
			ConfusionLabel::Unknown,
		]
	);
	assert_eq!(report.confusion.total(), report.total_questions);
	assert_eq!(report.total_with_items, 4);
}
