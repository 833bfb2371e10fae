use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use statrs::distribution::Normal;
use std::time::Instant;
use tracing::{debug, warn};

use super::config::{SimulationConfig, DAY_STEP, PRICE_FLOOR};
use crate::error::CollarError;
use crate::types::Price;
use crate::CollarResult;

/// Build the simulation time grid: `points` evenly spaced days over `[0, horizon]`.
pub fn time_grid(horizon: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let last = (points - 1) as f64;
            (0..points).map(|k| k as f64 * horizon / last).collect()
        }
    }
}

/// Sorted effective prices of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPrices {
    /// One effective price per trial, ascending.
    pub effective_prices: Vec<Price>,
    /// Trials whose averaged price fell below [`PRICE_FLOOR`] and were settled there.
    pub floored: usize,
}

/// Simulate the acquirer's share price and return the effective (averaged)
/// closing price of every trial, sorted ascending.
///
/// Each trial walks a discretised arithmetic Brownian return
/// `R(t) = drift·dt·t + vol·√dt·Σε` (pinned to zero at the origin) and maps it
/// to a price via `SB0·(1 + R(t))`. The effective price is the mean of the
/// last `averaging_days` grid points. The arithmetic form can average below
/// zero on volatile paths; such trials settle at [`PRICE_FLOOR`] and are
/// counted in [`SimulatedPrices::floored`].
///
/// One sub-seed per trial is drawn from `rng` up front, so the output only
/// depends on the generator state and never on how trials are scheduled.
/// The configuration is validated here, before anything is drawn.
pub fn simulate(config: &SimulationConfig, rng: &mut StdRng) -> CollarResult<SimulatedPrices> {
    config.validate()?;
    let start = Instant::now();

    let normal = Normal::new(0.0, 1.0).map_err(|e| CollarError::InvalidInput {
        field: "innovations".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;

    let n = config.num_simulations as usize;
    let grid = time_grid(config.horizon_days as f64, config.grid_points());
    let seeds: Vec<u64> = (0..n).map(|_| rng.gen()).collect();

    let trial = |seed: u64| {
        let mut trial_rng = StdRng::seed_from_u64(seed);
        effective_price(config, &grid, &normal, &mut trial_rng)
    };

    #[cfg(feature = "parallel")]
    let raw: Vec<Price> = seeds.into_par_iter().map(trial).collect();
    #[cfg(not(feature = "parallel"))]
    let raw: Vec<Price> = seeds.into_iter().map(trial).collect();

    if let Some((idx, &bad)) = raw.iter().enumerate().find(|(_, p)| !p.is_finite()) {
        return Err(CollarError::NumericalError {
            context: format!("effective price of trial {idx}"),
            value: bad,
        });
    }

    let floored = raw.iter().filter(|&&p| p < PRICE_FLOOR).count();
    let mut effective_prices: Vec<Price> = raw.into_iter().map(floor_price).collect();
    effective_prices.sort_by(|a, b| a.total_cmp(b));

    if floored > 0 {
        warn!(
            floored,
            trials = n,
            floor = PRICE_FLOOR,
            "effective prices fell below the price floor"
        );
    }
    debug!(
        trials = n,
        grid_points = grid.len(),
        averaging_days = config.averaging_days,
        elapsed_us = start.elapsed().as_micros() as u64,
        "simulated acquirer price paths"
    );
    Ok(SimulatedPrices {
        effective_prices,
        floored,
    })
}

fn floor_price(price: Price) -> Price {
    price.max(PRICE_FLOOR)
}

/// Walk one price path and average its trailing window.
fn effective_price(
    config: &SimulationConfig,
    grid: &[f64],
    normal: &Normal,
    rng: &mut StdRng,
) -> Price {
    let window = config.averaging_days as usize;
    let window_start = grid.len() - window;
    let diffusion = config.daily_volatility * DAY_STEP.sqrt();

    let mut cumulative_shock = 0.0_f64;
    let mut window_sum = 0.0_f64;

    for (k, &t) in grid.iter().enumerate() {
        cumulative_shock += rng.sample(normal);
        let ret = if k == 0 {
            0.0
        } else {
            config.daily_drift * DAY_STEP * t + diffusion * cumulative_shock
        };
        if k >= window_start {
            window_sum += config.acquirer_price * (1.0 + ret);
        }
    }

    window_sum / window as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 42;

    fn config(vol: f64, drift: f64, horizon: u32, window: u32, n: u32) -> SimulationConfig {
        SimulationConfig {
            acquirer_shares: 1_000_000,
            target_shares: 500_000,
            acquirer_price: 100.0,
            target_price: 40.0,
            daily_drift: drift,
            daily_volatility: vol,
            target_min_premium: 0.1,
            bidder_max_premium: 0.4,
            num_simulations: n,
            horizon_days: horizon,
            averaging_days: window,
            base_exchange_ratio: 0.5,
        }
    }

    #[test]
    fn test_time_grid_spans_horizon() {
        let grid = time_grid(10.0, 10);
        assert_eq!(grid.len(), 10);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[9], 10.0);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_time_grid_single_point_is_origin() {
        assert_eq!(time_grid(1.0, 1), vec![0.0]);
    }

    #[test]
    fn test_output_length_and_order() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let prices = simulate(&config(0.02, 0.0, 60, 10, 2_000), &mut rng)
            .unwrap()
            .effective_prices;
        assert_eq!(prices.len(), 2_000);
        assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_flat_path_without_volatility() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let prices = simulate(&config(0.0, 0.0, 10, 1, 1_000), &mut rng).unwrap().effective_prices;
        assert!(prices.iter().all(|&p| p == 100.0));
    }

    #[test]
    fn test_flat_path_averaging_full_window() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let prices = simulate(&config(0.0, 0.0, 20, 20, 50), &mut rng).unwrap().effective_prices;
        assert!(prices.iter().all(|&p| p == 100.0));
    }

    #[test]
    fn test_drift_only_reaches_terminal_level() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let prices = simulate(&config(0.0, 0.02, 10, 1, 100), &mut rng).unwrap().effective_prices;
        for p in prices {
            assert!((p - 120.0).abs() < 1e-9, "p={p}");
        }
    }

    #[test]
    fn test_averaging_window_pulls_price_back_from_terminal() {
        // Linear drift: the mean over the last 5 of 10 points sits below the terminal.
        let mut rng = StdRng::seed_from_u64(SEED);
        let prices = simulate(&config(0.0, 0.02, 10, 5, 10), &mut rng).unwrap().effective_prices;
        assert!(prices[0] < 120.0 && prices[0] > 100.0, "p={}", prices[0]);
    }

    #[test]
    fn test_seeded_reproducibility() {
        let cfg = config(0.02, 0.001, 30, 5, 5_000);
        let a = simulate(&cfg, &mut StdRng::seed_from_u64(SEED)).unwrap().effective_prices;
        let b = simulate(&cfg, &mut StdRng::seed_from_u64(SEED)).unwrap().effective_prices;
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let cfg = config(0.02, 0.0, 30, 5, 500);
        let a = simulate(&cfg, &mut StdRng::seed_from_u64(1)).unwrap().effective_prices;
        let b = simulate(&cfg, &mut StdRng::seed_from_u64(2)).unwrap().effective_prices;
        assert_ne!(a, b);
    }

    #[test]
    fn test_mean_close_to_spot_without_drift() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let prices = simulate(&config(0.01, 0.0, 30, 5, 20_000), &mut rng)
            .unwrap()
            .effective_prices;
        let mean = prices.iter().sum::<f64>() / prices.len() as f64;
        assert!((mean - 100.0).abs() < 0.5, "mean={mean}");
    }

    #[test]
    fn test_invalid_config_draws_nothing() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let before: u64 = rng.clone().gen();
        let cfg = config(0.02, 0.0, 10, 11, 100);
        assert!(matches!(
            simulate(&cfg, &mut rng),
            Err(CollarError::InvalidInput { .. })
        ));
        let after: u64 = rng.gen();
        assert_eq!(before, after);
    }

    #[test]
    fn test_extreme_volatility_settles_at_price_floor() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let cfg = config(5.0, 0.0, 30, 1, 200);
        let sim = simulate(&cfg, &mut rng).unwrap();
        assert_eq!(sim.effective_prices.len(), 200);
        assert!(sim.floored > 0);
        assert!(sim.effective_prices.iter().all(|&p| p >= PRICE_FLOOR));
        let at_floor = sim
            .effective_prices
            .iter()
            .filter(|&&p| p == PRICE_FLOOR)
            .count();
        assert_eq!(at_floor, sim.floored);
    }

    #[test]
    fn test_calm_paths_never_floored() {
        let mut rng = StdRng::seed_from_u64(SEED);
        let sim = simulate(&config(0.01, 0.0, 30, 5, 5_000), &mut rng).unwrap();
        assert_eq!(sim.floored, 0);
    }

    #[test]
    fn test_matches_sequential_rebuild_from_sub_seeds() {
        let cfg = config(0.03, 0.0005, 60, 10, 3_000);
        let sim = simulate(&cfg, &mut StdRng::seed_from_u64(SEED)).unwrap();

        let mut rng = StdRng::seed_from_u64(SEED);
        let seeds: Vec<u64> = (0..3_000).map(|_| rng.gen()).collect();
        let grid = time_grid(cfg.horizon_days as f64, cfg.grid_points());
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut rebuilt: Vec<Price> = seeds
            .into_iter()
            .map(|seed| {
                let mut trial_rng = StdRng::seed_from_u64(seed);
                floor_price(effective_price(&cfg, &grid, &normal, &mut trial_rng))
            })
            .collect();
        rebuilt.sort_by(|a, b| a.total_cmp(b));

        let expected: Vec<u64> = rebuilt.iter().map(|p| p.to_bits()).collect();
        let actual: Vec<u64> = sim.effective_prices.iter().map(|p| p.to_bits()).collect();
        assert_eq!(actual, expected);
    }
}
