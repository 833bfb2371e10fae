pub mod config;
pub mod paths;

pub use config::{SimulationConfig, DAY_STEP, PRICE_FLOOR};
pub use paths::{simulate, time_grid, SimulatedPrices};
