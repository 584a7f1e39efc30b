use std::path::PathBuf;
use thiserror::Error;

use crate::engine::Engine;

#[derive(Error, Debug)]
pub enum NovobatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Logging error: {0}")]
    Logging(#[from] crate::logging::LoggingError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Unsupported config file extension: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Duplicate modification '{0}' in catalog")]
    DuplicateModification(String),
}

/// Failures of a single engine invocation.
#[derive(Error, Debug)]
pub enum JobError {
    #[error("Failed to launch {engine} ('{program}'): {source}")]
    Launch {
        engine: Engine,
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {engine} parameter file '{path}': {source}")]
    WriteParameters {
        engine: Engine,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create output file '{path}': {source}")]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed while waiting for {engine}: {source}")]
    Wait {
        engine: Engine,
        #[source]
        source: std::io::Error,
    },

    #[error("{engine} exited with status {code:?} without writing '{output}'")]
    UnexpectedExit {
        engine: Engine,
        code: Option<i32>,
        output: PathBuf,
    },
}

/// The reason a modification delta could not be mapped to the catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error(
        "No variable modification within tolerance of {delta} (residue: {})",
        residue_label(residue)
    )]
    NoCandidate { delta: f64, residue: Option<char> },

    #[error("Invalid modification mass '{0}'")]
    InvalidDelta(String),

    #[error("Unknown modification short name '{0}'")]
    UnknownShortName(String),
}

fn residue_label(residue: &Option<char>) -> String {
    residue.map_or_else(|| "terminus".to_string(), |r| r.to_string())
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to open result file '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read result file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized table format in '{path}'. Expected: \"{expected}\", found: \"{found}\"")]
    UnsupportedFormat {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("Missing column '{column}' in line \"{line}\"")]
    MissingColumn { column: &'static str, line: String },

    #[error("Column '{column}' is not a number: \"{value}\"")]
    InvalidNumber { column: &'static str, value: String },

    #[error("Attempting to parse '{token}' as amino acid in {sequence}")]
    InvalidToken { token: char, sequence: String },

    #[error("Failed to resolve modification in {sequence}: {source}")]
    Modification {
        sequence: String,
        #[source]
        source: ResolveError,
    },

    #[error("Spectrum title '{0}' is not indexed")]
    UnknownTitle(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Spectrum file scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Spectrum file not found: {0}")]
    MissingInput(PathBuf),

    #[error("Failed to install Ctrl-C handler: {0}")]
    SignalHandler(String),
}

pub type Result<T> = std::result::Result<T, NovobatchError>;
