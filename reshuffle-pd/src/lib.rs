//! # reshuffle program director
//!
//! Picks tracks for a destination playlist by aggregating every playlist the
//! user owns, scoring each distinct track by how often and how recently it was
//! added, and drawing a temperature-weighted sample without replacement.

pub mod aggregate;
pub mod sampler;
pub mod scoring;
pub mod selector;
pub mod source;
pub mod spotify;

pub use aggregate::{AggregateRecord, Aggregation};
pub use scoring::{FrequencyRecencyScorer, Scorer, ScorerKind, SeasonalScorer};
pub use selector::Selector;
pub use source::{CachedSource, CollectionSource, CollectionWriter};
