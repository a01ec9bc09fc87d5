use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Token prices, in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Price assigned to models seen in interactions without an explicit entry.
    #[serde(default = "d_input_price")]
    pub default_input_per_million: f64,
    #[serde(default = "d_output_price")]
    pub default_output_per_million: f64,
    #[serde(default)]
    pub models: HashMap<String, ModelPrice>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_input_per_million: d_input_price(),
            default_output_per_million: d_output_price(),
            models: HashMap::new(),
        }
    }
}

impl PricingConfig {
    pub fn default_price(&self) -> ModelPrice {
        ModelPrice {
            input_per_million: self.default_input_per_million,
            output_per_million: self.default_output_per_million,
        }
    }
}

fn d_input_price() -> f64 {
    50.0
}

fn d_output_price() -> f64 {
    50.0
}
