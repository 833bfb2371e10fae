pub mod error;
pub mod types;

pub mod collar;
pub mod simulation;
pub mod statistics;
pub mod valuation;
pub mod walkaway;

pub use error::CollarError;
pub use types::*;

/// Standard result type for all collar operations
pub type CollarResult<T> = Result<T, CollarError>;
