use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CollarError;
use crate::simulation::config::{require_positive, SimulationConfig};
use crate::types::{ExchangeRatio, Price};
use crate::CollarResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Contractual collar terms as negotiated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum CollarTerms {
    /// Fixed exchange ratio inside `[lower_bound, upper_bound]`; the dollar
    /// value is pinned once the acquirer's price leaves the band. A `null` or
    /// missing `upper_bound` leaves the band open above.
    Fex {
        lower_bound: Price,
        #[serde(default = "unbounded", deserialize_with = "upper_price")]
        upper_bound: Price,
    },
    /// Fixed dollar value `base_price` inside the band
    /// `[base_price / upper_ratio, base_price / lower_ratio]`; the exchange
    /// ratio is pinned at `upper_ratio` / `lower_ratio` outside it.
    Fp {
        base_price: Price,
        upper_ratio: ExchangeRatio,
        lower_ratio: ExchangeRatio,
    },
}

/// Acquirer price range inside which the collar does not bind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub lower: Price,
    /// Serialised as `null` when the band is open above.
    #[serde(default = "unbounded", deserialize_with = "upper_price")]
    pub upper: Price,
}

fn unbounded() -> Price {
    f64::INFINITY
}

/// JSON has no infinity: `null` stands for an unbounded upper price.
fn upper_price<'de, D>(deserializer: D) -> Result<Price, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Price>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

impl PriceBand {
    pub fn contains(&self, price: Price) -> bool {
        price >= self.lower && price <= self.upper
    }
}

/// Share counts used to turn an exchange ratio into new acquirer shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareCounts {
    pub acquirer: u64,
    pub target: u64,
}

impl From<&SimulationConfig> for ShareCounts {
    fn from(config: &SimulationConfig) -> Self {
        ShareCounts {
            acquirer: config.acquirer_shares,
            target: config.target_shares,
        }
    }
}

/// Per-simulation output of a collar applied to effective prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollarPayoffs {
    /// Consideration per target share.
    pub payoff: Vec<Price>,
    pub exchange_ratio: Vec<ExchangeRatio>,
    /// New acquirer shares issued to target holders.
    pub emission: Vec<u64>,
    /// Target holders' fraction of the combined company.
    pub target_stake: Vec<f64>,
}

/// One point of a deterministic payoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffCurvePoint {
    pub price: Price,
    pub payoff: Price,
    pub exchange_ratio: ExchangeRatio,
    pub in_band: bool,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Maps an effective acquirer price to the consideration paid per target share.
pub trait CollarPayoffModel: Send + Sync {
    /// Price range in which the collar does not bind.
    fn band(&self) -> PriceBand;

    /// Consideration per target share at acquirer price `price`.
    fn payoff_at(&self, price: Price) -> Price;

    /// Exchange ratio that delivers `payoff` at `price`.
    fn exchange_ratio_at(&self, price: Price, payoff: Price) -> ExchangeRatio;

    /// Apply the collar to every effective price.
    ///
    /// Fails when the new share count does not fit in a `u64`.
    fn apply(&self, prices: &[Price], shares: ShareCounts) -> CollarResult<CollarPayoffs> {
        let mut out = CollarPayoffs {
            payoff: Vec::with_capacity(prices.len()),
            exchange_ratio: Vec::with_capacity(prices.len()),
            emission: Vec::with_capacity(prices.len()),
            target_stake: Vec::with_capacity(prices.len()),
        };
        for &price in prices {
            let payoff = self.payoff_at(price);
            let ratio = self.exchange_ratio_at(price, payoff);
            let issued = (shares.target as f64 * ratio).round();
            if !issued.is_finite() || issued < 0.0 || issued >= u64::MAX as f64 {
                return Err(CollarError::NumericalError {
                    context: format!("new shares issued at acquirer price {price}"),
                    value: issued,
                });
            }
            let emission = issued as u64;
            let stake = issued / (shares.acquirer as f64 + issued);
            out.payoff.push(payoff);
            out.exchange_ratio.push(ratio);
            out.emission.push(emission);
            out.target_stake.push(stake);
        }
        Ok(out)
    }
}

/// Fixed-exchange-ratio collar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedExchangeCollar {
    pub lower_bound: Price,
    pub upper_bound: Price,
    pub base_exchange_ratio: ExchangeRatio,
}

impl CollarPayoffModel for FixedExchangeCollar {
    fn band(&self) -> PriceBand {
        PriceBand {
            lower: self.lower_bound,
            upper: self.upper_bound,
        }
    }

    fn payoff_at(&self, price: Price) -> Price {
        if price < self.lower_bound {
            self.lower_bound * self.base_exchange_ratio
        } else if price > self.upper_bound {
            self.upper_bound * self.base_exchange_ratio
        } else {
            price * self.base_exchange_ratio
        }
    }

    fn exchange_ratio_at(&self, price: Price, payoff: Price) -> ExchangeRatio {
        if self.band().contains(price) {
            self.base_exchange_ratio
        } else {
            payoff / price
        }
    }
}

/// Fixed-price collar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPriceCollar {
    pub base_price: Price,
    pub upper_ratio: ExchangeRatio,
    pub lower_ratio: ExchangeRatio,
}

impl CollarPayoffModel for FixedPriceCollar {
    fn band(&self) -> PriceBand {
        PriceBand {
            lower: self.base_price / self.upper_ratio,
            upper: self.base_price / self.lower_ratio,
        }
    }

    fn payoff_at(&self, price: Price) -> Price {
        let band = self.band();
        if price < band.lower {
            price * self.upper_ratio
        } else if price > band.upper {
            price * self.lower_ratio
        } else {
            self.base_price
        }
    }

    fn exchange_ratio_at(&self, price: Price, payoff: Price) -> ExchangeRatio {
        payoff / price
    }
}

impl CollarTerms {
    pub fn validate(&self) -> CollarResult<()> {
        match *self {
            CollarTerms::Fex {
                lower_bound,
                upper_bound,
            } => {
                if !lower_bound.is_finite() || lower_bound < 0.0 {
                    return Err(CollarError::invalid(
                        "lower_bound",
                        "Must be a finite, non-negative price",
                    ));
                }
                if upper_bound.is_nan() {
                    return Err(CollarError::invalid("upper_bound", "Must be a number"));
                }
                if lower_bound > upper_bound {
                    return Err(CollarError::invalid(
                        "lower_bound",
                        format!("Lower bound {lower_bound} exceeds upper bound {upper_bound}"),
                    ));
                }
            }
            CollarTerms::Fp {
                base_price,
                upper_ratio,
                lower_ratio,
            } => {
                require_positive("base_price", base_price)?;
                require_positive("upper_ratio", upper_ratio)?;
                require_positive("lower_ratio", lower_ratio)?;
                if upper_ratio <= lower_ratio {
                    return Err(CollarError::invalid(
                        "upper_ratio",
                        format!("Upper ratio {upper_ratio} must exceed lower ratio {lower_ratio}"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build the payoff model. FEX terms need the signing exchange ratio.
    pub fn model(&self, base_exchange_ratio: ExchangeRatio) -> Box<dyn CollarPayoffModel> {
        match *self {
            CollarTerms::Fex {
                lower_bound,
                upper_bound,
            } => Box::new(FixedExchangeCollar {
                lower_bound,
                upper_bound,
                base_exchange_ratio,
            }),
            CollarTerms::Fp {
                base_price,
                upper_ratio,
                lower_ratio,
            } => Box::new(FixedPriceCollar {
                base_price,
                upper_ratio,
                lower_ratio,
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CollarTerms::Fex { .. } => "fixed exchange ratio",
            CollarTerms::Fp { .. } => "fixed price",
        }
    }
}

/// Evaluate a collar on an arbitrary price grid.
pub fn payoff_curve(model: &dyn CollarPayoffModel, prices: &[Price]) -> Vec<PayoffCurvePoint> {
    let band = model.band();
    prices
        .iter()
        .map(|&price| {
            let payoff = model.payoff_at(price);
            PayoffCurvePoint {
                price,
                payoff,
                exchange_ratio: model.exchange_ratio_at(price, payoff),
                in_band: band.contains(price),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHARES: ShareCounts = ShareCounts {
        acquirer: 1_000_000,
        target: 400_000,
    };

    fn fex() -> FixedExchangeCollar {
        FixedExchangeCollar {
            lower_bound: 90.0,
            upper_bound: 110.0,
            base_exchange_ratio: 0.5,
        }
    }

    fn fp() -> FixedPriceCollar {
        FixedPriceCollar {
            base_price: 50.0,
            upper_ratio: 0.625,
            lower_ratio: 0.4,
        }
    }

    // --- FEX ---

    #[test]
    fn test_fex_inside_band_floats_with_price() {
        let c = fex();
        assert_eq!(c.payoff_at(100.0), 50.0);
        assert_eq!(c.exchange_ratio_at(100.0, 50.0), 0.5);
    }

    #[test]
    fn test_fex_pins_payoff_outside_band() {
        let c = fex();
        assert_eq!(c.payoff_at(70.0), 45.0);
        assert_eq!(c.payoff_at(120.0), 55.0);
        assert!((c.exchange_ratio_at(120.0, 55.0) - 55.0 / 120.0).abs() < 1e-15);
        assert!((c.exchange_ratio_at(70.0, 45.0) - 45.0 / 70.0).abs() < 1e-15);
    }

    #[test]
    fn test_fex_continuous_at_bounds() {
        let c = fex();
        for bound in [c.lower_bound, c.upper_bound] {
            assert_eq!(c.payoff_at(bound), bound * c.base_exchange_ratio);
            let below = c.payoff_at(bound - 1e-9);
            let above = c.payoff_at(bound + 1e-9);
            assert!((below - above).abs() < 1e-8);
            assert_eq!(c.exchange_ratio_at(bound, c.payoff_at(bound)), 0.5);
        }
    }

    // --- FP ---

    #[test]
    fn test_fp_band_derived_from_ratios() {
        let band = fp().band();
        assert_eq!(band.lower, 80.0);
        assert_eq!(band.upper, 125.0);
    }

    #[test]
    fn test_fp_inside_band_pins_dollar_value() {
        let c = fp();
        for price in [80.0, 95.0, 110.0, 125.0] {
            assert_eq!(c.payoff_at(price), 50.0);
            assert!((c.exchange_ratio_at(price, 50.0) - 50.0 / price).abs() < 1e-15);
        }
    }

    #[test]
    fn test_fp_outside_band_pins_ratio() {
        let c = fp();
        assert_eq!(c.payoff_at(64.0), 40.0);
        assert!((c.payoff_at(150.0) - 60.0).abs() < 1e-12);
        assert!((c.exchange_ratio_at(64.0, 40.0) - 0.625).abs() < 1e-15);
        assert!((c.exchange_ratio_at(150.0, 60.0) - 0.4).abs() < 1e-15);
    }

    #[test]
    fn test_fp_continuous_at_derived_bounds() {
        let c = fp();
        let band = c.band();
        assert!((band.lower * c.upper_ratio - c.base_price).abs() < 1e-12);
        assert!((band.upper * c.lower_ratio - c.base_price).abs() < 1e-12);
        assert!((c.payoff_at(band.lower - 1e-9) - c.base_price).abs() < 1e-8);
        assert!((c.payoff_at(band.upper + 1e-9) - c.base_price).abs() < 1e-8);
    }

    // --- Shared apply ---

    #[test]
    fn test_apply_emission_and_stake() {
        let out = fex().apply(&[100.0, 120.0], SHARES).unwrap();
        assert_eq!(out.payoff, vec![50.0, 55.0]);
        assert_eq!(out.emission[0], 200_000);
        // 400_000 * 55 / 120 = 183_333.33
        assert_eq!(out.emission[1], 183_333);
        assert!((out.target_stake[0] - 200_000.0 / 1_200_000.0).abs() < 1e-15);
        assert!(out.target_stake.iter().all(|s| (0.0..1.0).contains(s)));
    }

    #[test]
    fn test_apply_preserves_length_and_order() {
        let prices = [60.0, 85.0, 100.0, 130.0, 170.0];
        let out = fp().apply(&prices, SHARES).unwrap();
        assert_eq!(out.payoff.len(), prices.len());
        assert_eq!(out.exchange_ratio.len(), prices.len());
        assert_eq!(out.emission.len(), prices.len());
        assert_eq!(out.target_stake.len(), prices.len());
    }

    #[test]
    fn test_stake_with_huge_acquirer_share_count() {
        let shares = ShareCounts {
            acquirer: u64::MAX,
            target: 1,
        };
        let out = fex().apply(&[100.0], shares).unwrap();
        assert_eq!(out.emission, vec![1]);
        assert!(out.target_stake[0] > 0.0 && out.target_stake[0] < 1e-18);
    }

    #[test]
    fn test_emission_beyond_u64_is_numerical_error() {
        let collar = FixedExchangeCollar {
            lower_bound: 90.0,
            upper_bound: 110.0,
            base_exchange_ratio: 4.0,
        };
        let shares = ShareCounts {
            acquirer: 1,
            target: u64::MAX,
        };
        assert!(matches!(
            collar.apply(&[100.0], shares),
            Err(CollarError::NumericalError { .. })
        ));
    }

    // --- Terms ---

    #[test]
    fn test_terms_build_matching_model() {
        let terms = CollarTerms::Fex {
            lower_bound: 90.0,
            upper_bound: 110.0,
        };
        let model = terms.model(0.5);
        assert_eq!(model.payoff_at(120.0), 55.0);

        let terms = CollarTerms::Fp {
            base_price: 50.0,
            upper_ratio: 0.625,
            lower_ratio: 0.4,
        };
        assert_eq!(terms.model(0.5).band(), fp().band());
    }

    #[test]
    fn test_terms_validation() {
        assert!(CollarTerms::Fex {
            lower_bound: 0.0,
            upper_bound: f64::INFINITY
        }
        .validate()
        .is_ok());
        assert!(CollarTerms::Fex {
            lower_bound: 110.0,
            upper_bound: 90.0
        }
        .validate()
        .is_err());
        assert!(CollarTerms::Fex {
            lower_bound: -1.0,
            upper_bound: 90.0
        }
        .validate()
        .is_err());
        assert!(CollarTerms::Fp {
            base_price: 50.0,
            upper_ratio: 0.4,
            lower_ratio: 0.4
        }
        .validate()
        .is_err());
        assert!(CollarTerms::Fp {
            base_price: 50.0,
            upper_ratio: 0.6,
            lower_ratio: 0.0
        }
        .validate()
        .is_err());
        assert!(CollarTerms::Fp {
            base_price: 0.0,
            upper_ratio: 0.6,
            lower_ratio: 0.4
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_terms_deserialize_tagged() {
        let terms: CollarTerms = serde_json::from_value(serde_json::json!({
            "type": "FP",
            "base_price": 50.0,
            "upper_ratio": 0.625,
            "lower_ratio": 0.4
        }))
        .unwrap();
        assert_eq!(
            terms,
            CollarTerms::Fp {
                base_price: 50.0,
                upper_ratio: 0.625,
                lower_ratio: 0.4
            }
        );
    }

    #[test]
    fn test_fex_upper_bound_null_or_missing_is_unbounded() {
        let open = CollarTerms::Fex {
            lower_bound: 0.0,
            upper_bound: f64::INFINITY,
        };
        let explicit: CollarTerms = serde_json::from_value(serde_json::json!({
            "type": "FEX", "lower_bound": 0.0, "upper_bound": null
        }))
        .unwrap();
        let missing: CollarTerms =
            serde_json::from_value(serde_json::json!({ "type": "FEX", "lower_bound": 0.0 }))
                .unwrap();
        assert_eq!(explicit, open);
        assert_eq!(missing, open);
        assert!(missing.validate().is_ok());
    }

    #[test]
    fn test_open_band_survives_json() {
        let band = PriceBand {
            lower: 0.0,
            upper: f64::INFINITY,
        };
        let json = serde_json::to_value(band).unwrap();
        assert_eq!(json["upper"], serde_json::Value::Null);
        let back: PriceBand = serde_json::from_value(json).unwrap();
        assert_eq!(back, band);
    }

    #[test]
    fn test_payoff_curve_flags_band() {
        let curve = payoff_curve(&fex(), &[80.0, 100.0, 120.0]);
        let flags: Vec<bool> = curve.iter().map(|p| p.in_band).collect();
        assert_eq!(flags, vec![false, true, false]);
        assert_eq!(curve[0].payoff, 45.0);
    }
}
