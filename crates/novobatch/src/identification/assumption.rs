use std::fmt::Write;
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::engine::Engine;

use super::amino_acid::{AminoAcid, C13_DIFFERENCE, PROTON_MASS, WATER_MASS};
use super::modification::{ModificationCatalog, ModificationMatch};

/// Residues with the modifications placed on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AminoAcidSequence {
    pub residues: Vec<AminoAcid>,
    pub modifications: Vec<ModificationMatch>,
}

impl AminoAcidSequence {
    pub fn len(&self) -> usize {
        self.residues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residues.is_empty()
    }

    /// Plain one-letter sequence.
    pub fn sequence(&self) -> String {
        self.residues.iter().map(|aa| aa.one_letter_code()).collect()
    }

    /// Residue plus modification masses, without termini.
    pub fn mass(&self) -> f64 {
        let residues: f64 = self.residues.iter().map(|aa| aa.monoisotopic_mass()).sum();
        let modifications: f64 = self.modifications.iter().map(|m| m.mass).sum();
        residues + modifications
    }

    /// Variable modifications as `Name (site, site), Other (site)`, names sorted.
    pub fn variable_modifications_summary(&self) -> String {
        let mut by_name: std::collections::BTreeMap<&str, Vec<usize>> = Default::default();
        for modification in self.modifications.iter().filter(|m| m.variable) {
            by_name
                .entry(modification.name.as_str())
                .or_default()
                .push(modification.site);
        }

        by_name
            .into_iter()
            .map(|(name, mut sites)| {
                sites.sort_unstable();
                let sites: Vec<String> = sites.iter().map(|s| s.to_string()).collect();
                format!("{} ({})", name, sites.join(", "))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Sequence with `<short name>` after modified residues and the termini
    /// spelled out, e.g. `ace-PEPM<ox>K-COOH`.
    pub fn tagged_sequence(&self, catalog: &ModificationCatalog) -> String {
        let (n_term, body, c_term) = self.tagged_parts(catalog);
        format!("{}-{}-{}", n_term, body, c_term)
    }

    fn tagged_parts(&self, catalog: &ModificationCatalog) -> (String, String, String) {
        let mut n_term = "NH2".to_string();
        let mut c_term = "COOH".to_string();
        let mut body = String::new();

        for (index, residue) in self.residues.iter().enumerate() {
            body.push(residue.one_letter_code());
            let site = index + 1;
            for modification in self.modifications.iter().filter(|m| m.site == site) {
                let definition = catalog.get(&modification.name);
                let short_name = definition
                    .map(|d| d.short_name().to_string())
                    .unwrap_or_else(|| modification.name.clone());
                match definition.map(|d| d.kind) {
                    Some(kind) if kind.is_n_term() && site == 1 => n_term = short_name,
                    Some(kind) if kind.is_c_term() && site == self.residues.len() => {
                        c_term = short_name
                    }
                    _ => {
                        let _ = write!(body, "<{}>", short_name);
                    }
                }
            }
        }

        (n_term, body, c_term)
    }
}

/// A full-length candidate peptide.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Peptide {
    pub sequence: AminoAcidSequence,
    /// Protein accessions, filled in by downstream protein mapping.
    pub proteins: Vec<String>,
}

impl Peptide {
    pub fn mass(&self) -> f64 {
        self.sequence.mass() + WATER_MASS
    }

    pub fn sorted_proteins(&self) -> Vec<&str> {
        let mut proteins: Vec<&str> = self.proteins.iter().map(String::as_str).collect();
        proteins.sort_unstable();
        proteins
    }
}

/// A partial sequence flanked by undetermined mass gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tag {
    pub n_gap: f64,
    pub sequence: AminoAcidSequence,
    pub c_gap: f64,
}

impl Tag {
    pub fn mass(&self) -> f64 {
        self.n_gap + self.sequence.mass() + self.c_gap + WATER_MASS
    }

    /// Gaps rendered as `<mass>` around the residues, e.g. `<12.000>ACK<3.000>`.
    pub fn as_sequence(&self) -> String {
        let mut result = String::new();
        if self.n_gap > 0.0 {
            let _ = write!(result, "<{:.3}>", self.n_gap);
        }
        result.push_str(&self.sequence.sequence());
        if self.c_gap > 0.0 {
            let _ = write!(result, "<{:.3}>", self.c_gap);
        }
        result
    }

    pub fn longest_amino_acid_sequence(&self) -> String {
        self.sequence.sequence()
    }

    pub fn tagged_sequence(&self, catalog: &ModificationCatalog) -> String {
        let (n_term, body, c_term) = self.sequence.tagged_parts(catalog);
        let mut result = format!("{}-", n_term);
        if self.n_gap > 0.0 {
            let _ = write!(result, "<{:.3}>", self.n_gap);
        }
        result.push_str(&body);
        if self.c_gap > 0.0 {
            let _ = write!(result, "<{:.3}>", self.c_gap);
        }
        let _ = write!(result, "-{}", c_term);
        result
    }

    /// Both gaps are within `tolerance` of zero, so the tag spans a whole peptide.
    pub fn is_complete(&self, tolerance: f64) -> bool {
        self.n_gap.abs() <= tolerance && self.c_gap.abs() <= tolerance
    }
}

/// Scores reported by an engine for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssumptionScores {
    /// Score the engine uses to rank its own candidates, when it reports one
    /// separately (PepNovo `RnkScr`).
    pub rank_score: Option<f64>,
    /// Engine score used for ranking and thresholds on export.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagAssumption {
    pub rank: usize,
    pub engine: Engine,
    pub scores: AssumptionScores,
    pub tag: Tag,
    pub charge: i32,
    /// `[M+H]` reported by the engine, when present.
    pub reported_mass: Option<f64>,
}

impl TagAssumption {
    pub fn theoretical_mz(&self) -> f64 {
        theoretical_mz(self.tag.mass(), self.charge)
    }

    /// The peptide spanned by a complete tag, keeping this tag as its source.
    pub fn to_peptide_assumption(&self, tolerance: f64) -> Option<PeptideAssumption> {
        if !self.tag.is_complete(tolerance) || self.tag.sequence.is_empty() {
            return None;
        }
        Some(PeptideAssumption {
            rank: self.rank,
            engine: self.engine,
            scores: self.scores,
            peptide: Peptide {
                sequence: self.tag.sequence.clone(),
                proteins: Vec::new(),
            },
            charge: self.charge,
            source_tag: Some(Box::new(self.clone())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeptideAssumption {
    pub rank: usize,
    pub engine: Engine,
    pub scores: AssumptionScores,
    pub peptide: Peptide,
    pub charge: i32,
    /// The tag this peptide was derived from, if any.
    pub source_tag: Option<Box<TagAssumption>>,
}

impl PeptideAssumption {
    pub fn theoretical_mz(&self) -> f64 {
        theoretical_mz(self.peptide.mass(), self.charge)
    }
}

/// One candidate an engine proposed for a spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assumption {
    Peptide(PeptideAssumption),
    Tag(TagAssumption),
}

impl Assumption {
    pub fn rank(&self) -> usize {
        match self {
            Self::Peptide(p) => p.rank,
            Self::Tag(t) => t.rank,
        }
    }

    pub fn engine(&self) -> Engine {
        match self {
            Self::Peptide(p) => p.engine,
            Self::Tag(t) => t.engine,
        }
    }

    pub fn scores(&self) -> AssumptionScores {
        match self {
            Self::Peptide(p) => p.scores,
            Self::Tag(t) => t.scores,
        }
    }

    pub fn score(&self) -> f64 {
        self.scores().score
    }

    pub fn charge(&self) -> i32 {
        match self {
            Self::Peptide(p) => p.charge,
            Self::Tag(t) => t.charge,
        }
    }

    pub fn theoretical_mz(&self) -> f64 {
        match self {
            Self::Peptide(p) => p.theoretical_mz(),
            Self::Tag(t) => t.theoretical_mz(),
        }
    }

    pub fn sequence(&self) -> &AminoAcidSequence {
        match self {
            Self::Peptide(p) => &p.peptide.sequence,
            Self::Tag(t) => &t.tag.sequence,
        }
    }

    pub fn as_tag(&self) -> Option<&TagAssumption> {
        match self {
            Self::Tag(t) => Some(t),
            Self::Peptide(_) => None,
        }
    }

    pub fn as_peptide(&self) -> Option<&PeptideAssumption> {
        match self {
            Self::Peptide(p) => Some(p),
            Self::Tag(_) => None,
        }
    }
}

/// Guards against charge 0 reported for undetermined charge states.
fn effective_charge(charge: i32) -> f64 {
    f64::from(charge.max(1))
}

pub fn theoretical_mz(mass: f64, charge: i32) -> f64 {
    let z = effective_charge(charge);
    (mass + z * PROTON_MASS) / z
}

/// Deviation of a measured precursor from a theoretical m/z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassError {
    pub da: f64,
    pub ppm: f64,
    pub isotope: i32,
}

/// Compares measured and theoretical m/z after removing the most likely
/// isotope offset within `isotopes`. A reversed range is read low to high.
pub fn mass_error(
    measured_mz: f64,
    theoretical_mz: f64,
    charge: i32,
    isotopes: RangeInclusive<i32>,
) -> MassError {
    let (start, end) = isotopes.into_inner();
    let z = effective_charge(charge);
    let raw = measured_mz - theoretical_mz;
    let isotope =
        ((raw * z / C13_DIFFERENCE).round() as i32).clamp(start.min(end), start.max(end));
    let da = raw - f64::from(isotope) * C13_DIFFERENCE / z;
    let ppm = da / theoretical_mz * 1e6;
    MassError { da, ppm, isotope }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identification::modification::tests::{acetylation_n_term, oxidation};

    fn sequence(letters: &str) -> AminoAcidSequence {
        AminoAcidSequence {
            residues: letters.chars().map(|c| AminoAcid::from_char(c).unwrap()).collect(),
            modifications: vec![],
        }
    }

    #[test]
    fn test_peptide_mass() {
        let peptide = Peptide {
            sequence: sequence("GG"),
            proteins: vec![],
        };
        let expected = 2.0 * 57.021_463_7 + WATER_MASS;
        assert!((peptide.mass() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_theoretical_mz_charge_two() {
        let mz = theoretical_mz(1000.0, 2);
        assert!((mz - (1000.0 + 2.0 * PROTON_MASS) / 2.0).abs() < 1e-9);
        // Undetermined charge is treated as singly charged.
        assert!((theoretical_mz(1000.0, 0) - (1000.0 + PROTON_MASS)).abs() < 1e-9);
    }

    #[test]
    fn test_modification_summary_sorted_by_name() {
        let mut seq = sequence("MPEMK");
        seq.modifications = vec![
            ModificationMatch::variable(&oxidation(), 4, true),
            ModificationMatch::variable(&acetylation_n_term(), 1, true),
            ModificationMatch::variable(&oxidation(), 1, true),
        ];
        assert_eq!(
            seq.variable_modifications_summary(),
            "Acetylation of peptide N-term (1), Oxidation of M (1, 4)"
        );
    }

    #[test]
    fn test_tagged_sequence_with_terminal_and_residue_mods() {
        let catalog = ModificationCatalog::new(vec![oxidation(), acetylation_n_term()]).unwrap();
        let mut seq = sequence("PEMK");
        seq.modifications = vec![
            ModificationMatch::variable(&acetylation_n_term(), 1, true),
            ModificationMatch::variable(&oxidation(), 3, true),
        ];
        assert_eq!(seq.tagged_sequence(&catalog), "ace-PEM<ox>K-COOH");
    }

    #[test]
    fn test_tag_rendering() {
        let catalog = ModificationCatalog::default();
        let tag = Tag {
            n_gap: 12.0,
            sequence: sequence("ACK"),
            c_gap: 3.0,
        };
        assert_eq!(tag.as_sequence(), "<12.000>ACK<3.000>");
        assert_eq!(tag.longest_amino_acid_sequence(), "ACK");
        assert_eq!(tag.tagged_sequence(&catalog), "NH2-<12.000>ACK<3.000>-COOH");
        assert!(!tag.is_complete(0.5));
    }

    #[test]
    fn test_complete_tag_becomes_peptide() {
        let tag = TagAssumption {
            rank: 1,
            engine: Engine::PepNovo,
            scores: AssumptionScores {
                rank_score: Some(1.2),
                score: 60.0,
            },
            tag: Tag {
                n_gap: 0.0,
                sequence: sequence("PEPTIDEK"),
                c_gap: 0.0,
            },
            charge: 2,
            reported_mass: None,
        };
        let peptide = tag.to_peptide_assumption(0.5).unwrap();
        assert_eq!(peptide.peptide.sequence.sequence(), "PEPTIDEK");
        assert!(peptide.source_tag.is_some());
        assert!((peptide.theoretical_mz() - tag.theoretical_mz()).abs() < 1e-9);
    }

    #[test]
    fn test_mass_error_removes_isotope() {
        let theoretical = 500.0;
        let measured = theoretical + C13_DIFFERENCE / 2.0 + 0.001;
        let error = mass_error(measured, theoretical, 2, 0..=1);
        assert_eq!(error.isotope, 1);
        assert!((error.da - 0.001).abs() < 1e-9);
        assert!((error.ppm - 2.0).abs() < 1e-6);

        let clamped = mass_error(measured, theoretical, 2, 0..=0);
        assert_eq!(clamped.isotope, 0);
    }

    #[test]
    fn test_mass_error_with_reversed_isotope_range() {
        let theoretical = 500.0;
        let measured = theoretical + C13_DIFFERENCE / 2.0 + 0.001;
        #[allow(clippy::reversed_empty_ranges)]
        let error = mass_error(measured, theoretical, 2, 1..=0);
        assert_eq!(error.isotope, 1);
        assert!((error.da - 0.001).abs() < 1e-9);
    }
}
