pub mod baseline;
pub mod model;

pub use baseline::baseline;
pub use model::{
    payoff_curve, CollarPayoffModel, CollarPayoffs, CollarTerms, FixedExchangeCollar,
    FixedPriceCollar, PayoffCurvePoint, PriceBand, ShareCounts,
};
