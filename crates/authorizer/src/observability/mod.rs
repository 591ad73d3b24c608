//! Observability for the authorizer.
//!
//! Provides metrics definitions and the decision reporter the gate reports
//! every outcome to.

pub mod metrics;
pub mod reporter;

pub use reporter::{DecisionEvent, DecisionReporter, TracingReporter};
