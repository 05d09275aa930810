//! Ranks competing choices by scoring raw observations and combining the scores through a
//! declared hierarchy of weighted metrics.
//!
//! A run validates a [`model::DecisionConfig`] into an [`engine::DecisionEngine`], resolves the
//! sources it needs from a [`sources::RawTable`] and any registered fetchers, and produces an
//! [`engine::Evaluation`] holding every intermediate table and the final ranking.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod graph;
pub mod model;
pub mod report;
pub mod scorers;
pub mod sources;
pub mod table;
pub mod telemetry;
pub mod weights;

pub use engine::{evaluate, DecisionEngine, Evaluation, EvaluationOptions, Ranking};
pub use error::{DecisionError, LoadError};
