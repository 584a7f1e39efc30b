//! External sequencing engines and how to invoke them.

pub mod command;
pub mod novor;
pub mod pepnovo;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::error::ConfigError;
use crate::identification::ModificationCatalog;

pub use command::{AuxiliaryFile, EngineCommand};
pub use novor::NovorModificationMap;

/// A de novo sequencing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    PepNovo,
    Novor,
}

impl Engine {
    pub const ALL: [Engine; 2] = [Engine::PepNovo, Engine::Novor];

    pub fn name(self) -> &'static str {
        match self {
            Engine::PepNovo => "PepNovo",
            Engine::Novor => "Novor",
        }
    }

    /// Where the engine's result file for `spectrum_file` lands.
    pub fn output_file(self, spectrum_file: &Path, output_folder: &Path) -> PathBuf {
        match self {
            Engine::PepNovo => {
                let mut name = spectrum_file
                    .file_name()
                    .map(|n| n.to_os_string())
                    .unwrap_or_default();
                name.push(".out");
                output_folder.join(name)
            }
            Engine::Novor => output_folder.join(format!("{}.novor.csv", file_stem(spectrum_file))),
        }
    }

    /// Recovers the engine from a result file name.
    pub fn from_output_file(path: &Path) -> Option<Engine> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".novor.csv") {
            Some(Engine::Novor)
        } else if name.ends_with(".mgf.out") {
            Some(Engine::PepNovo)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Builds the invocation of `engine` on one spectrum file.
pub fn build_command(
    engine: Engine,
    config: &RunConfig,
    catalog: &ModificationCatalog,
    spectrum_file: &Path,
) -> Result<EngineCommand, ConfigError> {
    let missing = || ConfigError::Validation {
        message: format!("{} is enabled but not configured", engine),
    };
    match engine {
        Engine::PepNovo => {
            let settings = config.pepnovo.as_ref().ok_or_else(missing)?;
            Ok(pepnovo::build_command(
                settings,
                &config.search,
                catalog,
                spectrum_file,
                &config.output_folder,
            ))
        }
        Engine::Novor => {
            let settings = config.novor.as_ref().ok_or_else(missing)?;
            Ok(novor::build_command(
                settings,
                &config.search,
                catalog,
                spectrum_file,
                &config.output_folder,
            ))
        }
    }
}
