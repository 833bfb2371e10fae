use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collar::PriceBand;
use crate::error::CollarError;
use crate::simulation::SimulationConfig;
use crate::statistics::{mean, summarize, DistributionStats};
use crate::types::{Price, Rate, ValueDelta};
use crate::CollarResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which surviving deals enter the "successful payoff" distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurvivorPayoffPolicy {
    /// Only survivors paying strictly more than zero.
    #[default]
    PositiveOnly,
    /// Every surviving deal, zero payoffs included.
    IncludeZero,
}

/// Cancellation flags for one simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkawayDecision {
    pub target_cancels: bool,
    pub bidder_cancels: bool,
}

impl WalkawayDecision {
    pub fn survives(&self) -> bool {
        !self.target_cancels && !self.bidder_cancels
    }
}

/// Walkaway rights of both parties, evaluated against a collar's payoffs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkawayOverlay {
    pub target_price: Price,
    pub target_min_premium: Rate,
    pub bidder_max_premium: Rate,
    pub target_shares: u64,
    /// Prices inside the band never trigger a walkaway.
    pub band: PriceBand,
    pub policy: SurvivorPayoffPolicy,
}

/// Result of applying the overlay to every simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkawayOutcome {
    pub decisions: Vec<WalkawayDecision>,
    /// Value of the target's cancellation right, per simulation.
    pub target_option: Vec<Price>,
    /// Value of the bidder's cancellation right, per simulation.
    pub bidder_option: Vec<Price>,
    /// Payoffs of surviving deals admitted by the survivor policy.
    pub surviving_payoff: Vec<Price>,
    /// Simulations whose effective price fell outside the collar band.
    pub eligible: usize,
    pub target_cancellations: usize,
    pub bidder_cancellations: usize,
    pub survivors: usize,
    pub success_probability: f64,
    /// `mean(target option) - mean(bidder option)`.
    pub net_walkaway_value: ValueDelta,
}

impl WalkawayOutcome {
    /// Statistics of the surviving payoff distribution.
    pub fn surviving_stats(&self) -> CollarResult<DistributionStats> {
        summarize(&self.surviving_payoff, "surviving payoff")
    }
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

impl WalkawayOverlay {
    pub fn new(config: &SimulationConfig, band: PriceBand, policy: SurvivorPayoffPolicy) -> Self {
        WalkawayOverlay {
            target_price: config.target_price,
            target_min_premium: config.target_min_premium,
            bidder_max_premium: config.bidder_max_premium,
            target_shares: config.target_shares,
            band,
            policy,
        }
    }

    /// Payoff below which the target would rather cancel.
    pub fn target_threshold(&self) -> Price {
        self.target_price * (1.0 + self.target_min_premium)
    }

    /// Payoff above which the bidder would rather cancel.
    pub fn bidder_threshold(&self) -> Price {
        self.target_price * (1.0 + self.bidder_max_premium)
    }

    /// Decide cancellation for every simulation.
    ///
    /// `payoff[i]` must be the collar payoff at effective price `prices[i]`.
    pub fn apply(&self, payoff: &[Price], prices: &[Price]) -> CollarResult<WalkawayOutcome> {
        if payoff.len() != prices.len() {
            return Err(CollarError::invalid(
                "payoff",
                format!(
                    "{} payoffs for {} effective prices",
                    payoff.len(),
                    prices.len()
                ),
            ));
        }
        if payoff.is_empty() {
            return Err(CollarError::EmptyDistribution(
                "walkaway overlay needs at least one simulation".into(),
            ));
        }

        let n = payoff.len();
        let target_threshold = self.target_threshold();
        let bidder_threshold = self.bidder_threshold();

        let mut decisions = Vec::with_capacity(n);
        let mut target_option = Vec::with_capacity(n);
        let mut bidder_option = Vec::with_capacity(n);
        let mut surviving_payoff = Vec::new();
        let mut eligible = 0;

        for (&value, &price) in payoff.iter().zip(prices) {
            let (target_value, bidder_value) = if self.band.contains(price) {
                (0.0, 0.0)
            } else {
                eligible += 1;
                (
                    (target_threshold - value).max(0.0),
                    (value - bidder_threshold).max(0.0),
                )
            };
            let decision = WalkawayDecision {
                target_cancels: target_value > 0.0,
                bidder_cancels: bidder_value > 0.0,
            };
            if decision.survives() {
                let admitted = match self.policy {
                    SurvivorPayoffPolicy::PositiveOnly => value > 0.0,
                    SurvivorPayoffPolicy::IncludeZero => true,
                };
                if admitted {
                    surviving_payoff.push(value);
                }
            }
            decisions.push(decision);
            target_option.push(target_value);
            bidder_option.push(bidder_value);
        }

        let target_cancellations = decisions.iter().filter(|d| d.target_cancels).count();
        let bidder_cancellations = decisions.iter().filter(|d| d.bidder_cancels).count();
        let survivors = decisions.iter().filter(|d| d.survives()).count();

        let net_per_share =
            mean(&target_option).unwrap_or(0.0) - mean(&bidder_option).unwrap_or(0.0);

        debug!(
            simulations = n,
            eligible,
            target_cancellations,
            bidder_cancellations,
            survivors,
            "applied walkaway overlay"
        );

        Ok(WalkawayOutcome {
            decisions,
            target_option,
            bidder_option,
            surviving_payoff,
            eligible,
            target_cancellations,
            bidder_cancellations,
            survivors,
            success_probability: survivors as f64 / n as f64,
            net_walkaway_value: ValueDelta::new(
                net_per_share,
                self.target_shares,
                self.target_price,
            ),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
