//! Batch orchestration for de novo peptide sequencing engines.
//!
//! A run discovers MGF files, drives PepNovo+ and Novor over them on a
//! bounded worker pool, indexes and parses their text output, resolves the
//! modification mass deltas found in sequences against a configured catalog,
//! and writes merged per-spectrum reports.

pub mod batch;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod identification;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod spectrum;
pub mod worker;

pub use batch::{BatchReport, BatchRun, ResultFile};
pub use cancel::CancellationToken;
pub use config::{load_config, RunConfig};
pub use engine::Engine;
pub use error::{NovobatchError, Result};
