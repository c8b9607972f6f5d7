use serde::Serialize;

use hunian_providers::llm::{Completion, TokenUsage};

/// Token totals across every model call of one turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TurnUsage {
	pub tokens: TokenUsage,
	pub response_count: u32,
}
impl TurnUsage {
	pub fn record(&mut self, completion: &Completion) {
		self.tokens += completion.usage;
		self.response_count += 1;
	}

	pub fn cost(&self, cfg: &hunian_config::Telemetry) -> Cost {
		let usd = self.tokens.prompt_tokens as f64 / 1_000_000.0 * cfg.input_usd_per_mtok
			+ self.tokens.completion_tokens as f64 / 1_000_000.0 * cfg.output_usd_per_mtok;

		Cost { usd, idr: usd * cfg.idr_per_usd }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Cost {
	pub usd: f64,
	pub idr: f64,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cost_follows_token_prices() {
		let cfg = hunian_config::Telemetry {
			input_usd_per_mtok: 0.15,
			output_usd_per_mtok: 0.60,
			idr_per_usd: 17_000.0,
		};
		let mut usage = TurnUsage::default();

		for (prompt, completion) in [(600_000, 100_000), (400_000, 0)] {
			usage.record(&Completion {
				content: String::new(),
				usage: TokenUsage {
					prompt_tokens: prompt,
					completion_tokens: completion,
					total_tokens: prompt + completion,
				},
			});
		}

		let cost = usage.cost(&cfg);

		assert_eq!(usage.response_count, 2);
		assert_eq!(usage.tokens.total_tokens, 1_100_000);
		assert!((cost.usd - 0.21).abs() < 1e-9);
		assert!((cost.idr - 3_570.0).abs() < 1e-6);
	}
}
