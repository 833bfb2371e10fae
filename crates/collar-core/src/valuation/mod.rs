pub mod engine;

pub use engine::{
    collar_curve, request_rng, simulate_prices, valuate, value_collar, ChartArrays,
    CollarCurveInput, CollarCurveOutput, CollarValuation, CollarValuationInput,
    PriceSimulationInput, PriceSimulationOutput, ValuationOptions, ValuationSummary,
    WalkawaySummary,
};
