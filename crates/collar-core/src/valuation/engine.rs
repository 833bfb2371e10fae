use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::collar::{baseline, payoff_curve, CollarTerms, PayoffCurvePoint, PriceBand};
use crate::error::CollarError;
use crate::simulation::config::require_positive;
use crate::simulation::{simulate, SimulatedPrices, SimulationConfig, PRICE_FLOOR};
use crate::statistics::{summarize, DistributionStats};
use crate::types::{with_metadata, ComputationOutput, ExchangeRatio, Price, ValueDelta};
use crate::walkaway::{SurvivorPayoffPolicy, WalkawayDecision, WalkawayOverlay};
use crate::CollarResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Optional stages of a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationOptions {
    pub include_walkaway: bool,
    pub survivor_policy: SurvivorPayoffPolicy,
}

impl Default for ValuationOptions {
    fn default() -> Self {
        ValuationOptions {
            include_walkaway: true,
            survivor_policy: SurvivorPayoffPolicy::default(),
        }
    }
}

/// Aggregates of the walkaway overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkawaySummary {
    pub target_threshold: Price,
    pub bidder_threshold: Price,
    pub eligible_simulations: usize,
    pub target_cancellations: usize,
    pub bidder_cancellations: usize,
    pub surviving_simulations: usize,
    pub success_probability: f64,
    pub survivor_policy: SurvivorPayoffPolicy,
    /// `None` when no surviving deal qualifies for the distribution.
    pub surviving_payoff: Option<DistributionStats>,
    pub net_walkaway_value: ValueDelta,
}

/// Scalar results handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationSummary {
    pub collar_type: String,
    pub band: PriceBand,
    pub num_simulations: usize,
    /// Simulations whose effective price settled at the price floor.
    pub floored_simulations: usize,
    /// Share of simulations whose effective price fell outside the band.
    pub binding_probability: f64,
    pub effective_price: DistributionStats,
    pub baseline_payoff: DistributionStats,
    pub collar_payoff: DistributionStats,
    pub exchange_ratio: DistributionStats,
    pub target_stake: DistributionStats,
    /// `mean(collar payoff) - mean(baseline payoff)`.
    pub collar_value: ValueDelta,
    pub walkaway: Option<WalkawaySummary>,
}

/// Per-simulation arrays, ordered by ascending effective price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArrays {
    pub effective_prices: Vec<Price>,
    pub baseline_payoff: Vec<Price>,
    pub collar_payoff: Vec<Price>,
    pub exchange_ratio: Vec<ExchangeRatio>,
    pub emission: Vec<u64>,
    pub target_stake: Vec<f64>,
    pub walkaway_decisions: Vec<WalkawayDecision>,
    pub surviving_payoff: Vec<Price>,
}

/// Complete result of one valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollarValuation {
    pub summary: ValuationSummary,
    pub arrays: ChartArrays,
}

/// Request-level input for a full collar valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollarValuationInput {
    pub config: SimulationConfig,
    pub terms: CollarTerms,
    #[serde(default = "default_true")]
    pub include_walkaway: bool,
    #[serde(default)]
    pub survivor_policy: SurvivorPayoffPolicy,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// Input for simulating effective prices only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSimulationInput {
    pub config: SimulationConfig,
    /// Optional seed for reproducibility.
    pub seed: Option<u64>,
}

/// Output of a price-only simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSimulationOutput {
    pub statistics: DistributionStats,
    pub floored_simulations: usize,
    pub effective_prices: Vec<Price>,
}

/// Input for a deterministic payoff curve over a price range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollarCurveInput {
    pub terms: CollarTerms,
    pub base_exchange_ratio: ExchangeRatio,
    pub min_price: Price,
    pub max_price: Price,
    #[serde(default = "default_curve_points")]
    pub points: u32,
}

fn default_curve_points() -> u32 {
    101
}

/// Payoff curve of a collar next to the uncollared baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollarCurveOutput {
    pub band: PriceBand,
    pub curve: Vec<PayoffCurvePoint>,
    pub baseline_payoff: Vec<Price>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Generator for one request: seeded when reproducibility is asked for,
/// otherwise fresh from OS entropy.
pub fn request_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Value a collar: simulate effective prices, price the uncollared baseline
/// and the collar, optionally overlay walkaway rights, and summarise.
pub fn valuate(
    config: &SimulationConfig,
    terms: &CollarTerms,
    options: ValuationOptions,
    rng: &mut StdRng,
) -> CollarResult<CollarValuation> {
    terms.validate()?;

    let SimulatedPrices {
        effective_prices,
        floored,
    } = simulate(config, rng)?;
    let n = effective_prices.len();

    let baseline_payoff = baseline(&effective_prices, config.base_exchange_ratio);
    let model = terms.model(config.base_exchange_ratio);
    let band = model.band();
    let collar = model.apply(&effective_prices, config.into())?;

    let effective_price_stats = summarize(&effective_prices, "effective price")?;
    let baseline_stats = summarize(&baseline_payoff, "baseline payoff")?;
    let collar_stats = summarize(&collar.payoff, "collar payoff")?;
    let exchange_ratio_stats = summarize(&collar.exchange_ratio, "exchange ratio")?;
    let target_stake_stats = summarize(&collar.target_stake, "target stake")?;

    let collar_value = ValueDelta::new(
        collar_stats.mean - baseline_stats.mean,
        config.target_shares,
        config.target_price,
    );
    let binding = effective_prices.iter().filter(|&&p| !band.contains(p)).count();

    let (walkaway, walkaway_decisions, surviving_payoff) = if options.include_walkaway {
        let overlay = WalkawayOverlay::new(config, band, options.survivor_policy);
        let outcome = overlay.apply(&collar.payoff, &effective_prices)?;
        let surviving_stats = match outcome.surviving_stats() {
            Ok(stats) => Some(stats),
            Err(CollarError::EmptyDistribution(reason)) => {
                warn!(%reason, "no surviving deals to summarise");
                None
            }
            Err(e) => return Err(e),
        };
        let summary = WalkawaySummary {
            target_threshold: overlay.target_threshold(),
            bidder_threshold: overlay.bidder_threshold(),
            eligible_simulations: outcome.eligible,
            target_cancellations: outcome.target_cancellations,
            bidder_cancellations: outcome.bidder_cancellations,
            surviving_simulations: outcome.survivors,
            success_probability: outcome.success_probability,
            survivor_policy: options.survivor_policy,
            surviving_payoff: surviving_stats,
            net_walkaway_value: outcome.net_walkaway_value,
        };
        (Some(summary), outcome.decisions, outcome.surviving_payoff)
    } else {
        (None, Vec::new(), Vec::new())
    };

    debug!(
        collar = terms.label(),
        simulations = n,
        floored,
        binding,
        collar_value = collar_value.per_share,
        "collar valuation complete"
    );

    Ok(CollarValuation {
        summary: ValuationSummary {
            collar_type: terms.label().to_string(),
            band,
            num_simulations: n,
            floored_simulations: floored,
            binding_probability: binding as f64 / n as f64,
            effective_price: effective_price_stats,
            baseline_payoff: baseline_stats,
            collar_payoff: collar_stats,
            exchange_ratio: exchange_ratio_stats,
            target_stake: target_stake_stats,
            collar_value,
            walkaway,
        },
        arrays: ChartArrays {
            effective_prices,
            baseline_payoff,
            collar_payoff: collar.payoff,
            exchange_ratio: collar.exchange_ratio,
            emission: collar.emission,
            target_stake: collar.target_stake,
            walkaway_decisions,
            surviving_payoff,
        },
    })
}

// ---------------------------------------------------------------------------
// Public API: request envelopes
// ---------------------------------------------------------------------------

/// Value a merger collar for one request.
///
/// Uses `input.seed` when given, otherwise a fresh entropy seed. The result is
/// wrapped in the standard envelope with methodology, assumptions, warnings
/// and metadata.
pub fn value_collar(
    input: &CollarValuationInput,
) -> CollarResult<ComputationOutput<CollarValuation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let mut rng = request_rng(input.seed);
    let options = ValuationOptions {
        include_walkaway: input.include_walkaway,
        survivor_policy: input.survivor_policy,
    };
    let valuation = valuate(&input.config, &input.terms, options, &mut rng)?;

    if let Some(message) = floor_warning(
        valuation.summary.floored_simulations,
        valuation.summary.num_simulations,
    ) {
        warnings.push(message);
    }

    if valuation.summary.binding_probability == 0.0 {
        warnings.push("Collar never binds: every effective price fell inside the band".into());
    }
    if let Some(w) = &valuation.summary.walkaway {
        if w.surviving_payoff.is_none() {
            warnings.push(
                "No successful deals: every simulation was cancelled or paid nothing".into(),
            );
        }
        if w.target_threshold > w.bidder_threshold {
            warnings.push(format!(
                "Target's minimum premium ({}) exceeds bidder's maximum ({}); \
                 both parties may cancel the same outcome",
                input.config.target_min_premium, input.config.bidder_max_premium
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo Merger Collar Valuation",
        &serde_json::json!({
            "collar": &input.terms,
            "num_simulations": input.config.num_simulations,
            "horizon_days": input.config.horizon_days,
            "averaging_days": input.config.averaging_days,
            "daily_drift": input.config.daily_drift,
            "daily_volatility": input.config.daily_volatility,
            "base_exchange_ratio": input.config.base_exchange_ratio,
            "include_walkaway": input.include_walkaway,
            "survivor_policy": input.survivor_policy,
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        valuation,
    ))
}

/// Simulate the acquirer's effective price distribution only.
pub fn simulate_prices(
    input: &PriceSimulationInput,
) -> CollarResult<ComputationOutput<PriceSimulationOutput>> {
    let start = Instant::now();
    let mut rng = request_rng(input.seed);
    let SimulatedPrices {
        effective_prices,
        floored,
    } = simulate(&input.config, &mut rng)?;
    let statistics = summarize(&effective_prices, "effective price")?;
    let warnings: Vec<String> = floor_warning(floored, effective_prices.len())
        .into_iter()
        .collect();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Acquirer Effective Price Simulation",
        &serde_json::json!({
            "acquirer_price": input.config.acquirer_price,
            "daily_drift": input.config.daily_drift,
            "daily_volatility": input.config.daily_volatility,
            "num_simulations": input.config.num_simulations,
            "horizon_days": input.config.horizon_days,
            "averaging_days": input.config.averaging_days,
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        PriceSimulationOutput {
            statistics,
            floored_simulations: floored,
            effective_prices,
        },
    ))
}

fn floor_warning(floored: usize, simulations: usize) -> Option<String> {
    (floored > 0).then(|| {
        format!(
            "{floored} of {simulations} simulated effective prices fell below \
             {PRICE_FLOOR} and were floored; volatility is high for the horizon"
        )
    })
}

/// Evaluate a collar and the uncollared baseline over an evenly spaced price range.
pub fn collar_curve(
    input: &CollarCurveInput,
) -> CollarResult<ComputationOutput<CollarCurveOutput>> {
    let start = Instant::now();

    input.terms.validate()?;
    require_positive("base_exchange_ratio", input.base_exchange_ratio)?;
    require_positive("min_price", input.min_price)?;
    require_positive("max_price", input.max_price)?;
    if input.max_price <= input.min_price {
        return Err(CollarError::invalid(
            "max_price",
            "Must be greater than min_price",
        ));
    }
    if input.points < 2 {
        return Err(CollarError::invalid("points", "Must be at least 2"));
    }

    let step = (input.max_price - input.min_price) / (input.points - 1) as f64;
    let prices: Vec<Price> = (0..input.points)
        .map(|i| input.min_price + i as f64 * step)
        .collect();

    let model = input.terms.model(input.base_exchange_ratio);
    let output = CollarCurveOutput {
        band: model.band(),
        curve: payoff_curve(model.as_ref(), &prices),
        baseline_payoff: baseline(&prices, input.base_exchange_ratio),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Collar Payoff Curve",
        &serde_json::json!({
            "collar": &input.terms,
            "base_exchange_ratio": input.base_exchange_ratio,
            "min_price": input.min_price,
            "max_price": input.max_price,
            "points": input.points,
        }),
        Vec::new(),
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
