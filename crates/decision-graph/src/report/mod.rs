//! Presentation of evaluation outputs: serializable views plus plain-text and HTML renderers.

mod html;
mod summary;
pub mod views;

pub use summary::{ConfigSummary, DecisionReport};
