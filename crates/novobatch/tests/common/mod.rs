//! Shared utilities for novobatch integration tests.
//!
//! - `TestHarness` lays out spectrum, engine and output folders in a temp dir
//! - builders produce configs and canned engine output

pub mod builders;
pub mod harness;
