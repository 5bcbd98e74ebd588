#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Observability.

pub mod logging;
pub mod metrics;
