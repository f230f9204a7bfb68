//! Test module for runtype-jit
//!
//! This module contains property-based tests using proptest
//! to validate correctness properties of the compiled functions.

#[cfg(test)]
pub mod shapes;

#[cfg(test)]
pub mod round_trip_tests;

#[cfg(test)]
pub mod consistency_tests;
