use crate::types::{ExchangeRatio, Price};

/// Consideration per target share with no collar: the signing exchange ratio
/// applied to every simulated price.
pub fn baseline(prices: &[Price], base_exchange_ratio: ExchangeRatio) -> Vec<Price> {
    prices.iter().map(|p| p * base_exchange_ratio).collect()
}
