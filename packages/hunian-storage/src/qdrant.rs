pub const DENSE_VECTOR_NAME: &str = "dense";
pub const PAGE_CONTENT_KEY: &str = "page_content";
pub const LISTING_ID_KEY: &str = "listing_id";

use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, Query, QueryPointsBuilder,
		UpsertPointsBuilder, Value, Vector, VectorParamsBuilder, VectorsConfigBuilder,
		value::Kind,
	},
};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::{Error, Result};

/// One listing's page content ready for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDocument {
	pub listing_id: String,
	pub page_content: String,
	pub metadata: Map<String, JsonValue>,
}

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &hunian_config::Vector) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection with a named cosine dense vector. Returns whether it was created.
	pub async fn ensure_collection(&self) -> Result<bool> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(false);
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(vectors_config),
			)
			.await?;

		tracing::info!(collection = %self.collection, "Vector collection created.");

		Ok(true)
	}

	/// Nearest page contents in relevance order. Points without text are skipped.
	pub async fn search_dense(
		&self,
		vector: Vec<f32>,
		limit: u64,
		score_threshold: f32,
	) -> Result<Vec<String>> {
		self.check_dim(vector.len())?;

		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.limit(limit)
			.with_payload(true)
			.score_threshold(score_threshold);
		let response = self.client.query(search).await?;

		Ok(response
			.result
			.iter()
			.filter_map(|point| payload_text(&point.payload, PAGE_CONTENT_KEY))
			.collect())
	}

	pub async fn upsert_documents(
		&self,
		documents: &[ListingDocument],
		vectors: Vec<Vec<f32>>,
	) -> Result<usize> {
		if documents.len() != vectors.len() {
			return Err(Error::InvalidArgument(
				"Document count does not match vector count.".to_string(),
			));
		}
		if documents.is_empty() {
			return Ok(0);
		}

		let mut points = Vec::with_capacity(documents.len());

		for (document, vector) in documents.iter().zip(vectors) {
			self.check_dim(vector.len())?;

			let mut payload = Payload::new();

			for (key, value) in &document.metadata {
				payload.insert(key.as_str(), value.clone());
			}

			payload.insert(PAGE_CONTENT_KEY, document.page_content.clone());
			payload.insert(LISTING_ID_KEY, document.listing_id.clone());

			let mut vector_map = HashMap::new();

			vector_map.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector));
			points.push(PointStruct::new(
				point_id(&document.listing_id).to_string(),
				vector_map,
				payload,
			));
		}

		let count = points.len();

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		Ok(count)
	}

	fn check_dim(&self, len: usize) -> Result<()> {
		if len != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"Vector dimension {len} does not match {}.",
				self.vector_dim
			)));
		}

		Ok(())
	}
}

/// Stable point id so re-ingesting a listing overwrites its previous point.
pub fn point_id(listing_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("listing:{listing_id}").as_bytes())
}

fn payload_text(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => {
			let trimmed = text.trim();

			if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
		},
		_ => None,
	}
}
