//! Scores stored answers against gold constraints, with live truth lookups and emptiness probes.

use std::{
	collections::HashMap,
	sync::{Arc, Mutex},
};

use serde::Serialize;
use tokio::sync::OnceCell;

use hunian_config::Config;
use hunian_domain::{
	answer,
	constraint::{Gold, MatchThresholds},
	listing,
	scoring::{Emptiness, ItemScore, ItemsSummary, NoResultSummary, QuestionSummary},
	truth::TruthRecord,
};

use crate::ListingSource;

/// Read-through cache of truth records keyed by listing id.
///
/// Concurrent lookups of one id share a single request. Failed lookups are not cached.
#[derive(Default)]
pub struct TruthCache {
	slots: Mutex<HashMap<u64, Arc<OnceCell<Option<TruthRecord>>>>>,
}
impl TruthCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn get_or_fetch<F, Fut, E>(
		&self,
		listing_id: u64,
		fetch: F,
	) -> Result<Option<TruthRecord>, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<Option<TruthRecord>, E>>,
	{
		let slot = {
			let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());

			slots.entry(listing_id).or_default().clone()
		};

		slot.get_or_try_init(fetch).await.cloned()
	}

	pub fn len(&self) -> usize {
		self.slots
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.values()
			.filter(|slot| slot.initialized())
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionEvaluation {
	pub summary: QuestionSummary,
	/// Whether the listing API has rows for the gold filter.
	#[serde(skip)]
	pub emptiness: Emptiness,
	pub api_note: String,
}

pub struct Evaluator {
	api: hunian_config::ListingApi,
	page_size: u32,
	thresholds: MatchThresholds,
	listing: Arc<dyn ListingSource>,
	truth: TruthCache,
}
impl Evaluator {
	pub fn new(cfg: &Config, listing: Arc<dyn ListingSource>) -> Self {
		Self {
			api: cfg.listing_api.clone(),
			page_size: cfg.retrieval.page_size,
			thresholds: MatchThresholds {
				keyword: cfg.evaluation.keyword_threshold,
				address: cfg.evaluation.address_threshold,
				phrase: cfg.evaluation.phrase_threshold,
			},
			listing,
			truth: TruthCache::new(),
		}
	}

	/// Scores one answer through exactly one branch: the no-result claim or its items.
	pub async fn evaluate(&self, answer_text: &str, gold: &Gold) -> QuestionEvaluation {
		let emptiness = self.probe(gold).await;
		let summary = if answer::looks_like_no_result(answer_text) {
			QuestionSummary::NoResult(NoResultSummary::from_emptiness(&emptiness))
		} else {
			let mut items = Vec::new();

			for (offset, item_text) in answer::split_listings(answer_text).iter().enumerate() {
				let truth = self.truth_for(item_text).await;

				items.push(ItemScore::evaluate(
					offset + 1,
					item_text,
					gold,
					truth.as_ref(),
					self.thresholds,
				));
			}

			QuestionSummary::Items(ItemsSummary::from_items(items))
		};

		QuestionEvaluation { summary, api_note: emptiness.note(), emptiness }
	}

	/// Asks the listing API whether the gold filter matches anything.
	pub async fn probe(&self, gold: &Gold) -> Emptiness {
		if !self.api.has_credentials() {
			return Emptiness::Unknown { reason: "API credentials missing".to_string() };
		}

		let mut payload = gold.filter.probe_payload();

		payload.page = Some(payload.page.unwrap_or(1));
		payload.paginate = Some(self.page_size);

		let body = match serde_json::to_value(&payload) {
			Ok(body) => body,
			Err(err) => return Emptiness::Unknown { reason: format!("API check skipped: {err}") },
		};

		match self.listing.query(&self.api, &body).await {
			Ok(text) if answer::response_is_empty(&text) => Emptiness::Empty,
			Ok(_) => Emptiness::HasData,
			Err(err) => {
				tracing::warn!(error = %err, "Ground truth probe failed.");

				Emptiness::Unknown { reason: format!("API check failed: {}", err.kind()) }
			},
		}
	}

	/// Truth record for the listing an item links to, if any can be fetched.
	pub async fn truth_for(&self, item_text: &str) -> Option<TruthRecord> {
		let listing_id = listing::first_link(item_text).and_then(answer::parse_listing_id)?;

		if !self.api.has_credentials() {
			return None;
		}

		let fetched = self
			.truth
			.get_or_fetch(listing_id, || async {
				let value = self.listing.fetch_listing(&self.api, listing_id).await?;

				Ok::<_, hunian_providers::Error>(TruthRecord::from_json(&value))
			})
			.await;

		match fetched {
			Ok(record) => record,
			Err(err) => {
				tracing::warn!(listing_id, error = %err, "Truth lookup failed.");

				None
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn failed_lookups_are_retried() {
		let cache = TruthCache::new();
		let failed: Result<Option<TruthRecord>, &str> =
			cache.get_or_fetch(7, || async { Err("offline") }).await;
		let fetched: Result<Option<TruthRecord>, &str> = cache
			.get_or_fetch(7, || async {
				Ok(Some(TruthRecord { kamar_tidur: Some(3), ..Default::default() }))
			})
			.await;

		assert!(failed.is_err());
		assert_eq!(fetched.ok().flatten().and_then(|record| record.kamar_tidur), Some(3));
		assert_eq!(cache.len(), 1);
	}
}
