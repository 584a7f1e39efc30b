use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::export::ExportSettings;
use crate::identification::Modification;
use crate::worker::FailurePolicy;

/// A complete batch run description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// MGF files, or folders whose top-level `.mgf` files are used.
    pub spectrum_inputs: Vec<PathBuf>,
    pub output_folder: PathBuf,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default)]
    pub pepnovo: Option<PepNovoConfig>,
    #[serde(default)]
    pub novor: Option<NovorConfig>,
    #[serde(default)]
    pub search: SearchSettings,
    /// Modification catalog, in resolution priority order.
    #[serde(default)]
    pub modifications: Vec<Modification>,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub logging: LogSettings,
}

fn default_threads() -> usize {
    num_cpus::get()
}

impl RunConfig {
    /// Engines with a configuration section, in a stable order.
    pub fn engines(&self) -> Vec<Engine> {
        Engine::ALL
            .into_iter()
            .filter(|engine| match engine {
                Engine::PepNovo => self.pepnovo.is_some(),
                Engine::Novor => self.novor.is_some(),
            })
            .collect()
    }

    pub fn fragment_tolerance_da(&self) -> f64 {
        self.search.fragment_tolerance.in_daltons()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassUnit {
    Da,
    Ppm,
}

/// Reference m/z at which ppm tolerances are converted to Dalton.
pub const PPM_REFERENCE_MZ: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub value: f64,
    pub unit: MassUnit,
}

impl Tolerance {
    pub fn da(value: f64) -> Self {
        Self {
            value,
            unit: MassUnit::Da,
        }
    }

    pub fn ppm(value: f64) -> Self {
        Self {
            value,
            unit: MassUnit::Ppm,
        }
    }

    pub fn in_daltons(&self) -> f64 {
        match self.unit {
            MassUnit::Da => self.value,
            MassUnit::Ppm => self.value * PPM_REFERENCE_MZ / 1e6,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Digest {
    #[default]
    Trypsin,
    NonSpecific,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_fragment_tolerance")]
    pub fragment_tolerance: Tolerance,
    #[serde(default = "default_precursor_tolerance")]
    pub precursor_tolerance: Tolerance,
    #[serde(default)]
    pub digest: Digest,
    /// Solutions requested per spectrum.
    #[serde(default = "default_num_solutions")]
    pub num_solutions: usize,
}

fn default_fragment_tolerance() -> Tolerance {
    Tolerance::da(0.5)
}

fn default_precursor_tolerance() -> Tolerance {
    Tolerance::da(1.0)
}

fn default_num_solutions() -> usize {
    10
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            fragment_tolerance: default_fragment_tolerance(),
            precursor_tolerance: default_precursor_tolerance(),
            digest: Digest::default(),
            num_solutions: default_num_solutions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PepNovoConfig {
    /// Installation folder holding the executable and `Models/`.
    pub folder: PathBuf,
    #[serde(default = "default_pepnovo_executable")]
    pub executable: String,
    #[serde(default = "default_pepnovo_model")]
    pub model: String,
    #[serde(default)]
    pub correct_precursor_mass: bool,
    /// Let PepNovo estimate the charge instead of trusting the spectrum file.
    #[serde(default)]
    pub estimate_charge: bool,
    #[serde(default)]
    pub format: PepNovoFormat,
}

fn default_pepnovo_executable() -> String {
    "PepNovo_bin".to_string()
}

fn default_pepnovo_model() -> String {
    "CID_IT_TRYP".to_string()
}

/// Layout details of PepNovo text output that differ between builds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PepNovoFormat {
    /// Index of the first title token on a `>>` line.
    #[serde(default = "default_title_token_offset")]
    pub title_token_offset: usize,
    /// Line prefixes announcing that a spectrum has no solution.
    #[serde(default = "default_no_solution_prefixes")]
    pub no_solution_prefixes: Vec<String>,
}

fn default_title_token_offset() -> usize {
    3
}

fn default_no_solution_prefixes() -> Vec<String> {
    ["# No", "# Charge", "#Problem", "# too"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for PepNovoFormat {
    fn default() -> Self {
        Self {
            title_token_offset: default_title_token_offset(),
            no_solution_prefixes: default_no_solution_prefixes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovorConfig {
    /// Installation folder holding `novor.jar`; also the working directory.
    pub folder: PathBuf,
    #[serde(default = "default_java")]
    pub java: PathBuf,
    #[serde(default)]
    pub java_options: Vec<String>,
    #[serde(default = "default_fragmentation")]
    pub fragmentation: String,
    #[serde(default = "default_mass_analyzer")]
    pub mass_analyzer: String,
}

fn default_java() -> PathBuf {
    PathBuf::from("java")
}

fn default_fragmentation() -> String {
    "HCD".to_string()
}

fn default_mass_analyzer() -> String {
    "Trap".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
