#![doc = include_str!("../README.md")]

//! Rivet intermediate representation.
//!
//! This crate defines the guarded-step equation produced by symbolic
//! execution, the symbolic expression language used for guards and payloads,
//! the namespace of declared symbols, the property status table, and the
//! concrete trace type reconstructed from solver models.

pub mod equation;
pub mod expr;
pub mod namespace;
pub mod properties;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest_generators;
pub mod trace;
