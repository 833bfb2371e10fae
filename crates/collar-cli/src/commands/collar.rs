use clap::Args;
use serde_json::Value;
use tracing::info;

use collar_core::valuation::{
    self, CollarCurveInput, CollarValuationInput, PriceSimulationInput,
};

use crate::input;

/// Arguments for a full collar valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to JSON input file ({"config": ..., "terms": ...}). A FEX
    /// `upper_bound` of null, or none at all, leaves the band open above.
    #[arg(long)]
    pub input: Option<String>,

    /// Seed for reproducible runs (overrides the input file)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of simulated paths (overrides the input file)
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Skip the walkaway overlay
    #[arg(long)]
    pub no_walkaway: bool,

    /// Include per-simulation arrays in the output
    #[arg(long)]
    pub arrays: bool,
}

/// Arguments for simulating effective prices only
#[derive(Args)]
pub struct SimulateArgs {
    /// Path to JSON input file ({"config": ...})
    #[arg(long)]
    pub input: Option<String>,

    /// Seed for reproducible runs (overrides the input file)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of simulated paths (overrides the input file)
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Include the sorted effective prices in the output
    #[arg(long)]
    pub arrays: bool,
}

/// Arguments for a deterministic payoff curve
#[derive(Args)]
pub struct CurveArgs {
    /// Path to JSON input file ({"terms": ..., "base_exchange_ratio": ..., ...})
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: CollarValuationInput =
        input::load(args.input.as_deref(), "collar valuation")?;
    if args.seed.is_some() {
        request.seed = args.seed;
    }
    if let Some(n) = args.simulations {
        request.config.num_simulations = n;
    }
    if args.no_walkaway {
        request.include_walkaway = false;
    }

    info!(
        collar = request.terms.label(),
        simulations = request.config.num_simulations,
        seeded = request.seed.is_some(),
        "valuing collar"
    );
    let result = valuation::value_collar(&request)?;
    let mut value = serde_json::to_value(result)?;
    if !args.arrays {
        strip_result_field(&mut value, "arrays");
    }
    Ok(value)
}

pub fn run_simulate(args: SimulateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: PriceSimulationInput =
        input::load(args.input.as_deref(), "price simulation")?;
    if args.seed.is_some() {
        request.seed = args.seed;
    }
    if let Some(n) = args.simulations {
        request.config.num_simulations = n;
    }

    info!(
        simulations = request.config.num_simulations,
        horizon_days = request.config.horizon_days,
        "simulating effective prices"
    );
    let result = valuation::simulate_prices(&request)?;
    let mut value = serde_json::to_value(result)?;
    if !args.arrays {
        strip_result_field(&mut value, "effective_prices");
    }
    Ok(value)
}

pub fn run_curve(args: CurveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: CollarCurveInput = input::load(args.input.as_deref(), "payoff curve")?;
    let result = valuation::collar_curve(&request)?;
    Ok(serde_json::to_value(result)?)
}

/// Drop a bulky field from the result envelope.
fn strip_result_field(value: &mut Value, field: &str) {
    if let Some(Value::Object(result)) = value.get_mut("result") {
        result.remove(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strip_result_field() {
        let mut v = json!({"result": {"summary": 1, "arrays": [1, 2, 3]}, "warnings": []});
        strip_result_field(&mut v, "arrays");
        assert_eq!(v, json!({"result": {"summary": 1}, "warnings": []}));
    }

    #[test]
    fn test_strip_missing_field_is_noop() {
        let mut v = json!({"result": {"summary": 1}});
        strip_result_field(&mut v, "arrays");
        assert_eq!(v, json!({"result": {"summary": 1}}));
    }
}
