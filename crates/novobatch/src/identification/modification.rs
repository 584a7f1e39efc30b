use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::amino_acid::AminoAcid;

/// Where a modification may be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationKind {
    /// On specific residues anywhere in the sequence.
    Residue,
    /// On the N-terminus regardless of the residue.
    NTerm,
    /// On specific residues at the N-terminus.
    NTermResidue,
    /// On the C-terminus regardless of the residue.
    CTerm,
    /// On specific residues at the C-terminus.
    CTermResidue,
}

impl ModificationKind {
    pub fn is_residue_specific(self) -> bool {
        self == Self::Residue
    }

    pub fn is_n_term(self) -> bool {
        matches!(self, Self::NTerm | Self::NTermResidue)
    }

    pub fn is_c_term(self) -> bool {
        matches!(self, Self::CTerm | Self::CTermResidue)
    }
}

/// A configured chemical modification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    pub name: String,
    /// Short name used in modified sequences; falls back to `name`.
    #[serde(default)]
    pub short_name: Option<String>,
    pub mass: f64,
    pub kind: ModificationKind,
    /// Residues targeted. Empty means any residue.
    #[serde(default)]
    pub residues: Vec<AminoAcid>,
    /// Fixed modifications are never inferred from engine mass deltas.
    #[serde(default)]
    pub fixed: bool,
}

impl Modification {
    pub fn targets(&self, residue: AminoAcid) -> bool {
        self.residues.contains(&residue)
    }

    pub fn short_name(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }
}

/// Read-only, ordered lookup of configured modifications.
///
/// Iteration order is the configuration order and is relied upon by the
/// resolver to break ties, so entries are never re-sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModificationCatalog {
    entries: Vec<Modification>,
}

impl ModificationCatalog {
    pub fn new(entries: Vec<Modification>) -> Result<Self, ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for modification in &entries {
            if !seen.insert(modification.name.as_str()) {
                return Err(ConfigError::DuplicateModification(
                    modification.name.clone(),
                ));
            }
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modification> {
        self.entries.iter()
    }

    pub fn variable(&self) -> impl Iterator<Item = &Modification> {
        self.entries.iter().filter(|m| !m.fixed)
    }

    pub fn fixed(&self) -> impl Iterator<Item = &Modification> {
        self.entries.iter().filter(|m| m.fixed)
    }

    pub fn get(&self, name: &str) -> Option<&Modification> {
        self.entries.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A modification placed on a sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModificationMatch {
    pub name: String,
    pub mass: f64,
    /// 1-based residue index.
    pub site: usize,
    pub variable: bool,
    pub confident: bool,
}

impl ModificationMatch {
    pub fn variable(modification: &Modification, site: usize, confident: bool) -> Self {
        Self {
            name: modification.name.clone(),
            mass: modification.mass,
            site,
            variable: true,
            confident,
        }
    }
}
