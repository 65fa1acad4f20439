//! Analysis modules.
//!
//! Runs the per-subscription analyzer over the selection and merges the
//! outcomes into one report.

pub mod aggregator;
pub mod recommendations;
pub mod runner;

pub use aggregator::*;
pub use runner::{analyze_all, SubscriptionAnalyzer};
