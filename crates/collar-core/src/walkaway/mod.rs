pub mod overlay;

pub use overlay::{SurvivorPayoffPolicy, WalkawayDecision, WalkawayOutcome, WalkawayOverlay};
