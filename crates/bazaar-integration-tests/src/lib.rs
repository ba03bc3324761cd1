//! Integration test crate for the Bazaar market keeper.
//!
//! This crate exists solely to run integration tests that span the Bazaar
//! crates. It has no public API - all functionality is in the test modules.

#![forbid(unsafe_code)]
