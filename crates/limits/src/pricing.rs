//! Per-model token prices.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use ll_domain::config::{ModelPrice, PricingConfig};

/// One row of [`PriceTable::snapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct PricedModel {
    pub model: String,
    pub input_per_million: f64,
    pub output_per_million: f64,
    /// `true` when the price was filled in from the configured default.
    pub defaulted: bool,
}

pub struct PriceTable {
    default_price: ModelPrice,
    prices: RwLock<HashMap<String, (ModelPrice, bool)>>,
}

impl PriceTable {
    pub fn new(config: &PricingConfig) -> Self {
        let prices = config
            .models
            .iter()
            .map(|(name, price)| (name.clone(), (*price, false)))
            .collect();
        Self {
            default_price: config.default_price(),
            prices: RwLock::new(prices),
        }
    }

    pub fn get(&self, model: &str) -> Option<ModelPrice> {
        self.prices.read().get(model).map(|(p, _)| *p)
    }

    /// Give every listed model without a record the default price.
    /// Returns how many records were added.
    pub fn ensure_models_priced<I>(&self, models: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut prices = self.prices.write();
        let mut added = 0;
        for model in models {
            if !prices.contains_key(&model) {
                tracing::info!(model = %model, "assigning default price to unpriced model");
                prices.insert(model, (self.default_price, true));
                added += 1;
            }
        }
        added
    }

    /// All known prices, sorted by model name.
    pub fn snapshot(&self) -> Vec<PricedModel> {
        let mut rows: Vec<PricedModel> = self
            .prices
            .read()
            .iter()
            .map(|(model, (price, defaulted))| PricedModel {
                model: model.clone(),
                input_per_million: price.input_per_million,
                output_per_million: price.output_per_million,
                defaulted: *defaulted,
            })
            .collect();
        rows.sort_by(|a, b| a.model.cmp(&b.model));
        rows
    }
}
