#![doc = include_str!("../README.md")]

//! Rivet verification engine.
//!
//! Control flow: execution engine → equation → memory model → slicer →
//! converter → solve (external) → verdict/trace builder → status
//! reconciler → reporters.

pub mod config;
pub mod convert;
pub mod coverage;
pub mod error;
pub mod harness;
pub mod memory_model;
pub mod pipeline;
pub mod slice;
pub mod status;
pub mod verdict;
pub mod witness;

#[cfg(test)]
pub(crate) mod testutil;
