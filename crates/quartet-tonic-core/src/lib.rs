#![doc = include_str!("../README.md")]

mod common;
pub mod proto;

pub use common::*;
// Downstream crates reach the engine and services through
// `quartet_tonic_core::quartet`.
pub use quartet;
