#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Commitment state: Merkle engine and durable storage.

pub mod merkle;
pub mod persistent_state;
