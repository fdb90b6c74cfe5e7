#![doc = include_str!("../README.md")]

//! Decision-procedure abstraction for the rivet pipeline.
//!
//! The converter in `rivet-engine` lowers equation steps into [`terms::SmtTerm`]
//! constraints and feeds them to any [`solver::DecisionProcedure`]
//! implementation; concrete backends drive external solver processes over
//! SMT-LIB2.

pub mod backends;
pub mod solver;
pub mod terms;
