//! Data models for Bandrule

mod measurement;
mod request;
mod rule;
mod transaction;

pub use measurement::*;
pub use request::*;
pub use rule::*;
pub use transaction::*;
