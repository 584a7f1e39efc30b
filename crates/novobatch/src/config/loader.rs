use std::path::Path;

use crate::config::schema::RunConfig;
use crate::error::ConfigError;
use crate::identification::{ModificationCatalog, ModificationKind};

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RunConfig, ConfigError> {
    let path = path.as_ref();
    let format =
        ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.into()))?;
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, format)
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<RunConfig, ConfigError> {
    let config: RunConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_config(&config)?;

    Ok(config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

pub fn validate_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.spectrum_inputs.is_empty() {
        return Err(invalid("No spectrum inputs given"));
    }

    if config.engines().is_empty() {
        return Err(invalid("At least one engine must be configured"));
    }

    if config.threads == 0 {
        return Err(invalid("threads must be > 0"));
    }

    let search = &config.search;
    if search.fragment_tolerance.value <= 0.0 {
        return Err(invalid("Fragment tolerance must be positive"));
    }
    if search.precursor_tolerance.value <= 0.0 {
        return Err(invalid("Precursor tolerance must be positive"));
    }
    if search.num_solutions == 0 {
        return Err(invalid("num_solutions must be > 0"));
    }

    // Duplicate names are rejected by the catalog itself
    ModificationCatalog::new(config.modifications.clone())?;
    for modification in &config.modifications {
        let needs_residues = matches!(
            modification.kind,
            ModificationKind::Residue
                | ModificationKind::NTermResidue
                | ModificationKind::CTermResidue
        );
        if needs_residues && modification.residues.is_empty() {
            return Err(invalid(format!(
                "Modification '{}' targets residues but lists none",
                modification.name
            )));
        }
    }

    let export = &config.export;
    if export.max_matches == 0 {
        return Err(invalid("export.max_matches must be > 0"));
    }
    if export.min_isotope > export.max_isotope {
        return Err(invalid(format!(
            "Isotope range {}..={} is empty",
            export.min_isotope, export.max_isotope
        )));
    }

    if let Some(pepnovo) = &config.pepnovo {
        if pepnovo.format.no_solution_prefixes.is_empty()
            || pepnovo.format.no_solution_prefixes.iter().any(|p| p.is_empty())
        {
            return Err(invalid("PepNovo no-solution prefixes must be non-empty"));
        }
    }

    Ok(())
}
