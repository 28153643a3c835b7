//! # TD Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixed-point helpers and canned layouts, routes and archetypes
//! - Wave and scenario builders
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
