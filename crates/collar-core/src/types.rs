use serde::{Deserialize, Serialize};

/// Per-share prices and payoffs, in the acquirer's trading currency.
pub type Price = f64;

/// Rates and premiums expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Acquirer shares issued per target share.
pub type ExchangeRatio = f64;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

/// A per-share value difference reported in the three forms deal teams quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueDelta {
    /// Per target share.
    pub per_share: Price,
    /// Across all target shares outstanding.
    pub total_equity: Price,
    /// Relative to the target's pre-announcement share price.
    pub relative: Rate,
}

impl ValueDelta {
    pub fn new(per_share: Price, target_shares: u64, target_price: Price) -> Self {
        ValueDelta {
            per_share,
            total_equity: per_share * target_shares as f64,
            relative: per_share / target_price,
        }
    }
}
