//! Rule evaluation core
//!
//! A rule extracts one measurement from an event, short-circuits on exit
//! conditions, and classifies the rest into ordered half-open bands.

mod classifier;
mod evaluator;
mod exit;
mod extractor;

#[cfg(test)]
pub(crate) mod fixtures;

pub use classifier::{determine_outcome, select_band, OutcomeClassifier};
pub use evaluator::RuleEvaluator;
pub use exit::{first_exit, ExitCheck};
pub use extractor::{history_query, reduce_rows, MeasurementExtractor};
