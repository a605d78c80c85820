//! Multi-factor candidate scoring

pub mod confidence_scorer;
pub mod location;

pub use confidence_scorer::{ConfidenceScorer, SearchContext};
pub use location::location_similarity;
