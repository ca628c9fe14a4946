//! Price sheet for computing LLM call cost, keyed by model name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-1000-token pricing for one model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ModelPrice {
    pub prompt_per_1k: f64,
    pub response_per_1k: f64,
}

/// `model name -> price` lookup, loaded from YAML (`--price-table`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceTable {
    #[serde(flatten)]
    models: HashMap<String, ModelPrice>,
}

impl PriceTable {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parse_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Parse a TOML price sheet, for operators who keep pricing alongside
    /// other local tool config rather than in the recipe's own YAML.
    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Cost in currency units for `prompt_tokens`/`response_tokens` against
    /// `model`. Unknown models contribute zero cost with a caller-visible
    /// `None` so the caller can log a warning instead of charging for it.
    #[must_use]
    pub fn cost_for(&self, model: &str, prompt_tokens: u64, response_tokens: u64) -> Option<f64> {
        let price = self.models.get(model)?;
        let prompt_cost = (prompt_tokens as f64 / 1000.0) * price.prompt_per_1k;
        let response_cost = (response_tokens as f64 / 1000.0) * price.response_per_1k;
        Some(prompt_cost + response_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_computes_cost() {
        let yaml = "gpt-5:\n  prompt_per_1k: 0.01\n  response_per_1k: 0.03\n";
        let table = PriceTable::parse_yaml(yaml).unwrap();
        let cost = table.cost_for("gpt-5", 1000, 1000).unwrap();
        assert!((cost - 0.04).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_is_none() {
        let table = PriceTable::empty();
        assert!(table.cost_for("mystery-model", 100, 100).is_none());
    }

    #[test]
    fn toml_price_sheet_parses_the_same_as_yaml() {
        let toml_src = "[gpt-5]\nprompt_per_1k = 0.01\nresponse_per_1k = 0.03\n";
        let table = PriceTable::parse_toml(toml_src).unwrap();
        let cost = table.cost_for("gpt-5", 1000, 1000).unwrap();
        assert!((cost - 0.04).abs() < 1e-9);
    }
}
