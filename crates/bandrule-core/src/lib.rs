//! # Bandrule
//!
//! Banded outcome rules for payment-status fraud screening.
//!
//! A rule receives one pacs.002 payment-status event together with a
//! pre-fetched data cache, and decides whether the event raises an alert and
//! under which sub-rule reference.
//!
//! ## Architecture
//!
//! - **Extractor**: derives one measurement (amount, count or ratio), issuing at
//!   most one history query
//! - **Classifier**: exit conditions first, then ordered half-open bands
//! - **Storage**: history behind a trait (PostgreSQL or in-memory), results
//!   published on Redis
//!
//! ## Quick Start
//!
//! ```bash
//! # Check a rule configuration
//! bandrule validate --rule rule-901.json
//!
//! # Evaluate one request against it
//! bandrule evaluate --rule rule-901.json --request request.json
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod rules;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::db::{HistoryStore, InMemoryHistoryStore, PostgresHistoryStore};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::rules::{OutcomeClassifier, RuleEvaluator};
}
