mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Evaluation, ListingApi, LlmProviderConfig, Providers,
	Retrieval, Service, Session, Telemetry, Vector,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.listing_api.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "listing_api.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, path) in [
		("listing_api.query_path", &cfg.listing_api.query_path),
		("listing_api.chat_history_path", &cfg.listing_api.chat_history_path),
	] {
		if !path.starts_with('/') {
			return Err(Error::Validation { message: format!("{label} must start with '/'.") });
		}
	}
	for (label, key) in
		[("llm", &cfg.providers.llm.api_key), ("embedding", &cfg.providers.embedding.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if !cfg.providers.llm.temperature.is_finite() || cfg.providers.llm.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number, zero or greater."
				.to_string(),
		});
	}
	if cfg.providers.llm.timeout_ms == 0 || cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "Provider timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.vector.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match vector.vector_dim.".to_string(),
		});
	}
	if cfg.vector.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "vector.collection must be non-empty.".to_string(),
		});
	}
	if cfg.vector.fetch_k == 0 {
		return Err(Error::Validation {
			message: "vector.fetch_k must be greater than zero.".to_string(),
		});
	}
	if cfg.vector.max_results == 0 {
		return Err(Error::Validation {
			message: "vector.max_results must be greater than zero.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.vector.score_threshold) {
		return Err(Error::Validation {
			message: "vector.score_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}
	if cfg.retrieval.target_n == 0 {
		return Err(Error::Validation {
			message: "retrieval.target_n must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.page_size == 0 {
		return Err(Error::Validation {
			message: "retrieval.page_size must be greater than zero.".to_string(),
		});
	}
	if !matches!(cfg.retrieval.continuity.as_str(), "subset" | "exact") {
		return Err(Error::Validation {
			message: "retrieval.continuity must be one of subset or exact.".to_string(),
		});
	}
	if cfg.retrieval.history_turns == 0 {
		return Err(Error::Validation {
			message: "retrieval.history_turns must be greater than zero.".to_string(),
		});
	}
	if cfg.session.max_messages < 2 {
		return Err(Error::Validation {
			message: "session.max_messages must be at least 2.".to_string(),
		});
	}
	if cfg.session.idle_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "session.idle_ttl_secs must be greater than zero.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&cfg.evaluation.cpr_threshold) {
		return Err(Error::Validation {
			message: "evaluation.cpr_threshold must be in the range 0.0-1.0.".to_string(),
		});
	}

	for (label, value) in [
		("evaluation.keyword_threshold", cfg.evaluation.keyword_threshold),
		("evaluation.address_threshold", cfg.evaluation.address_threshold),
		("evaluation.phrase_threshold", cfg.evaluation.phrase_threshold),
	] {
		if !(0.0..=100.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0-100."),
			});
		}
	}

	if cfg.evaluation.concurrency == 0 {
		return Err(Error::Validation {
			message: "evaluation.concurrency must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("telemetry.input_usd_per_mtok", cfg.telemetry.input_usd_per_mtok),
		("telemetry.output_usd_per_mtok", cfg.telemetry.output_usd_per_mtok),
		("telemetry.idr_per_usd", cfg.telemetry.idr_per_usd),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number, zero or greater."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in [
		&mut cfg.listing_api.api_base,
		&mut cfg.providers.llm.api_base,
		&mut cfg.providers.embedding.api_base,
	] {
		let trimmed = api_base.trim().trim_end_matches('/').to_string();

		*api_base = trimmed;
	}

	if cfg
		.evaluation
		.audit_dir
		.as_deref()
		.map(|dir| dir.as_os_str().to_string_lossy().trim().is_empty())
		.unwrap_or(false)
	{
		cfg.evaluation.audit_dir = None;
	}
}
