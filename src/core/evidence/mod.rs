#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Evidence pipeline: raw upstream records to ordered, hashed batches.

pub mod batch;
pub mod flight;
pub mod identity;
pub mod normalizer;
pub mod raw;
