use serde::{Deserialize, Serialize};

use crate::error::CollarError;
use crate::types::{ExchangeRatio, Price, Rate};
use crate::CollarResult;

/// Simulation time step, in trading days.
pub const DAY_STEP: f64 = 1.0;

/// Lowest effective price a trial may settle at: one cent.
pub const PRICE_FLOOR: Price = 0.01;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Deal and market parameters for one collar valuation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    // --- Capital structure before the deal ---
    /// Acquirer shares outstanding (NB0).
    pub acquirer_shares: u64,
    /// Target shares outstanding (NT0).
    pub target_shares: u64,

    // --- Pre-announcement prices ---
    /// Acquirer share price (SB0).
    pub acquirer_price: Price,
    /// Target share price (ST0).
    pub target_price: Price,

    // --- Acquirer price dynamics ---
    /// Daily drift of the acquirer's return (RetB).
    pub daily_drift: Rate,
    /// Daily volatility of the acquirer's return (StdB).
    pub daily_volatility: Rate,

    // --- Walkaway thresholds ---
    /// Minimum premium over `target_price` the target will accept (DP).
    pub target_min_premium: Rate,
    /// Maximum premium over `target_price` the bidder will pay (RP).
    pub bidder_max_premium: Rate,

    // --- Simulation grid ---
    /// Number of simulated paths (N).
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Days between signing and closing (T).
    pub horizon_days: u32,
    /// Trailing closing-price averaging window, in days.
    pub averaging_days: u32,

    /// Exchange ratio agreed at signing (BaseER).
    pub base_exchange_ratio: ExchangeRatio,
}

fn default_num_simulations() -> u32 {
    100_000
}

impl SimulationConfig {
    /// Number of points on the simulated time grid: `round(T / dt)`.
    pub fn grid_points(&self) -> usize {
        (self.horizon_days as f64 / DAY_STEP).round() as usize
    }

    /// Validate every invariant before any simulation work starts.
    pub fn validate(&self) -> CollarResult<()> {
        if self.acquirer_shares == 0 {
            return Err(CollarError::invalid(
                "acquirer_shares",
                "Must be a positive share count",
            ));
        }
        if self.target_shares == 0 {
            return Err(CollarError::invalid(
                "target_shares",
                "Must be a positive share count",
            ));
        }
        require_positive("acquirer_price", self.acquirer_price)?;
        require_positive("target_price", self.target_price)?;
        require_positive("base_exchange_ratio", self.base_exchange_ratio)?;
        require_finite("daily_drift", self.daily_drift)?;
        require_finite("daily_volatility", self.daily_volatility)?;
        if self.daily_volatility < 0.0 {
            return Err(CollarError::invalid(
                "daily_volatility",
                "Cannot be negative",
            ));
        }
        require_finite("target_min_premium", self.target_min_premium)?;
        require_finite("bidder_max_premium", self.bidder_max_premium)?;

        if self.num_simulations == 0 {
            return Err(CollarError::invalid(
                "num_simulations",
                "Must be at least 1",
            ));
        }
        if self.horizon_days == 0 {
            return Err(CollarError::invalid("horizon_days", "Must be at least 1"));
        }
        if self.averaging_days == 0 {
            return Err(CollarError::invalid(
                "averaging_days",
                "Must be at least 1",
            ));
        }
        if self.averaging_days > self.horizon_days
            || self.averaging_days as usize > self.grid_points()
        {
            return Err(CollarError::invalid(
                "averaging_days",
                format!(
                    "Averaging window of {} days exceeds the {}-day horizon",
                    self.averaging_days, self.horizon_days
                ),
            ));
        }
        Ok(())
    }
}

pub(crate) fn require_finite(field: &str, value: f64) -> CollarResult<()> {
    if !value.is_finite() {
        return Err(CollarError::invalid(field, "Must be a finite number"));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &str, value: f64) -> CollarResult<()> {
    require_finite(field, value)?;
    if value <= 0.0 {
        return Err(CollarError::invalid(field, "Must be positive"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
