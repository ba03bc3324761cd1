//! Market parameters.

use serde::{Deserialize, Serialize};

use crate::error::{MarketError, Result};

/// Default number of blocks an order stays open for matching.
pub const DEFAULT_ORDER_TTL: u64 = 5;

/// Tunable keeper parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParams {
    /// Blocks between order creation and its `start_at` height.
    pub order_ttl: u64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            order_ttl: DEFAULT_ORDER_TTL,
        }
    }
}

impl MarketParams {
    /// Returns a copy with a different order TTL.
    #[must_use]
    pub const fn with_order_ttl(mut self, order_ttl: u64) -> Self {
        self.order_ttl = order_ttl;
        self
    }

    /// Parses and validates parameters from JSON. Missing fields take their
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidParams` on malformed JSON or invalid
    /// values.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| MarketError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Checks parameter values.
    ///
    /// # Errors
    ///
    /// Returns `MarketError::InvalidParams` if `order_ttl` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.order_ttl == 0 {
            return Err(MarketError::InvalidParams(
                "order_ttl must be at least one block".into(),
            ));
        }
        Ok(())
    }
}
