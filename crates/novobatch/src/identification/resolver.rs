use std::sync::Arc;

use crate::error::ResolveError;

use super::amino_acid::AminoAcid;
use super::modification::{Modification, ModificationCatalog};

/// Maps a numeric mass delta reported by an engine to a catalog modification.
#[derive(Debug, Clone)]
pub struct ModificationResolver {
    catalog: Arc<ModificationCatalog>,
    tolerance: f64,
}

impl ModificationResolver {
    /// `tolerance` is the fragment ion tolerance in Dalton.
    pub fn new(catalog: Arc<ModificationCatalog>, tolerance: f64) -> Self {
        Self { catalog, tolerance }
    }

    pub fn catalog(&self) -> &ModificationCatalog {
        &self.catalog
    }

    /// Parses a signed token such as `+16` or `-18` and resolves it.
    pub fn resolve_token(
        &self,
        token: &str,
        residue: Option<AminoAcid>,
    ) -> Result<&Modification, ResolveError> {
        let delta: f64 = token
            .parse()
            .map_err(|_| ResolveError::InvalidDelta(token.to_string()))?;
        self.resolve(delta, residue)
    }

    /// Picks the best candidate among the variable modifications within
    /// tolerance of `delta`: first one targeting `residue`, else the first
    /// non residue-specific one, else the first candidate.
    pub fn resolve(
        &self,
        delta: f64,
        residue: Option<AminoAcid>,
    ) -> Result<&Modification, ResolveError> {
        let candidates: Vec<&Modification> = self
            .catalog
            .variable()
            .filter(|m| (delta - m.mass).abs() <= self.tolerance)
            .collect();

        let Some(first) = candidates.first().copied() else {
            return Err(ResolveError::NoCandidate {
                delta,
                residue: residue.map(AminoAcid::one_letter_code),
            });
        };

        let mut terminal = None;
        for candidate in &candidates {
            if candidate.kind.is_residue_specific() {
                if residue.is_some_and(|aa| candidate.targets(aa)) {
                    return Ok(candidate);
                }
            } else if terminal.is_none() {
                terminal = Some(*candidate);
            }
        }

        Ok(terminal.unwrap_or(first))
    }
}
