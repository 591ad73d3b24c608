//! Service layer for the authorizer.
//!
//! # Components
//!
//! - `gate` - Authorization gate turning a credential header into a decision

pub mod gate;

pub use gate::{Authorizer, DENY_PRINCIPAL};
