pub mod summary;

pub use summary::{mean, percentile_sorted, summarize, DistributionStats, Percentiles};
