//! Record plausibility and data-quality validation
//!
//! # Validators
//! 1. **record_validator** - biological and chronological plausibility
//! 2. **quality_scorer** - informational completeness / precision score
//! 3. **historical_places** - place-name validity windows

pub mod historical_places;
pub mod quality_scorer;
pub mod record_validator;

pub use historical_places::{HistoricalPlaces, PlaceWindow};
pub use quality_scorer::QualityScorer;
pub use record_validator::RecordValidator;
