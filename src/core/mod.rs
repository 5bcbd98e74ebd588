#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! Evidence pipeline and commitment primitives.

pub mod config;
pub mod evidence;
pub mod hash;
pub mod ricardian;
pub mod service;
pub mod state;
pub mod types;
pub mod verify;
