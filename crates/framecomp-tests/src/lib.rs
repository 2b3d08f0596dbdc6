//! Integration test crate for framecomp.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the framecomp crates to verify they work together.

#[cfg(test)]
mod cache;

#[cfg(test)]
mod compositor;
