//! # System Module
//!
//! Integer-only graph metrics for reporting between steps.

mod metrics;

pub use metrics::*;
