use napi::Result as NapiResult;
use napi_derive::napi;

use collar_core::valuation::{self, CollarCurveInput, CollarValuationInput, PriceSimulationInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Collar valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn value_collar(input_json: String) -> NapiResult<String> {
    let input: CollarValuationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation::value_collar(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn simulate_prices(input_json: String) -> NapiResult<String> {
    let input: PriceSimulationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation::simulate_prices(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn collar_curve(input_json: String) -> NapiResult<String> {
    let input: CollarCurveInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = valuation::collar_curve(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
