use std::cmp::Reverse;
use std::collections::BTreeMap;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::engine::Engine;
use crate::identification::{Assumption, SpectrumMatch};
use crate::spectrum::SpectrumSource;

/// Assumptions of one engine, best score first. Each bucket keeps the
/// engine's rank order.
type ScoreBuckets = BTreeMap<Reverse<OrderedFloat<f64>>, Vec<Assumption>>;

type SpectrumAssumptions = BTreeMap<Engine, ScoreBuckets>;

/// All results of a run, by spectrum file then decoded title.
#[derive(Debug, Default)]
pub struct Identification {
    files: IndexMap<String, IndexMap<String, SpectrumAssumptions>>,
}

impl Identification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, spectrum_match: SpectrumMatch) {
        let SpectrumMatch {
            spectrum_file,
            spectrum_title,
            assumptions,
        } = spectrum_match;

        let by_engine = self
            .files
            .entry(spectrum_file)
            .or_default()
            .entry(spectrum_title)
            .or_default();

        for assumption in assumptions {
            let bucket = by_engine
                .entry(assumption.engine())
                .or_default()
                .entry(Reverse(OrderedFloat(assumption.score())))
                .or_default();
            let position = bucket.partition_point(|a| a.rank() <= assumption.rank());
            bucket.insert(position, assumption);
        }
    }

    pub fn extend<I: IntoIterator<Item = SpectrumMatch>>(&mut self, matches: I) {
        for spectrum_match in matches {
            self.add(spectrum_match);
        }
    }

    /// Spectrum files in the order they were first added.
    pub fn spectrum_files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Titles of `spectrum_file` in first-seen order.
    pub fn titles(&self, spectrum_file: &str) -> Vec<&str> {
        self.files
            .get(spectrum_file)
            .map(|titles| titles.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Titles to report for `spectrum_file`: every spectrum the source knows,
    /// in file order, followed by identified titles it does not know.
    pub fn report_titles(
        &self,
        spectrum_file: &str,
        spectra: &dyn SpectrumSource,
    ) -> Vec<String> {
        let identified = self.titles(spectrum_file);
        let Some(mut ordered) = spectra.titles(spectrum_file) else {
            return identified.into_iter().map(String::from).collect();
        };
        let known: std::collections::HashSet<&str> = ordered.iter().map(String::as_str).collect();
        let extra: Vec<String> = identified
            .into_iter()
            .filter(|title| !known.contains(title))
            .map(String::from)
            .collect();
        ordered.extend(extra);
        ordered
    }

    pub fn contains(&self, spectrum_file: &str, title: &str) -> bool {
        self.files
            .get(spectrum_file)
            .is_some_and(|titles| titles.contains_key(title))
    }

    /// Engines, then scores descending, then rank; the merged list is
    /// finally ordered by score across engines. Ties keep engine order.
    pub fn merged_assumptions(&self, spectrum_file: &str, title: &str) -> Vec<&Assumption> {
        let Some(by_engine) = self.files.get(spectrum_file).and_then(|t| t.get(title)) else {
            return Vec::new();
        };

        let mut merged: Vec<&Assumption> = by_engine
            .values()
            .flat_map(|buckets| buckets.values().flatten())
            .collect();
        merged.sort_by(|a, b| b.score().total_cmp(&a.score()));
        merged
    }

    pub fn spectrum_count(&self) -> usize {
        self.files.values().map(IndexMap::len).sum()
    }

    pub fn assumption_count(&self) -> usize {
        self.files
            .values()
            .flat_map(IndexMap::values)
            .flat_map(BTreeMap::values)
            .flat_map(BTreeMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::identification::{
        AminoAcid, AminoAcidSequence, AssumptionScores, Peptide, PeptideAssumption, Tag,
        TagAssumption,
    };
    use crate::spectrum::{InMemorySpectra, Precursor};

    pub(crate) fn residues(letters: &str) -> AminoAcidSequence {
        AminoAcidSequence {
            residues: letters.chars().map(|c| AminoAcid::from_char(c).unwrap()).collect(),
            modifications: Vec::new(),
        }
    }

    pub(crate) fn tag(rank: usize, score: f64, letters: &str) -> Assumption {
        Assumption::Tag(TagAssumption {
            rank,
            engine: Engine::PepNovo,
            scores: AssumptionScores {
                rank_score: Some(score / 10.0),
                score,
            },
            tag: Tag {
                n_gap: 0.0,
                sequence: residues(letters),
                c_gap: 0.0,
            },
            charge: 2,
            reported_mass: None,
        })
    }

    pub(crate) fn peptide(score: f64, letters: &str) -> Assumption {
        Assumption::Peptide(PeptideAssumption {
            rank: 1,
            engine: Engine::Novor,
            scores: AssumptionScores {
                rank_score: None,
                score,
            },
            peptide: Peptide {
                sequence: residues(letters),
                proteins: Vec::new(),
            },
            charge: 2,
            source_tag: None,
        })
    }

    pub(crate) fn spectrum_match(
        file: &str,
        title: &str,
        assumptions: Vec<Assumption>,
    ) -> SpectrumMatch {
        SpectrumMatch {
            spectrum_file: file.to_string(),
            spectrum_title: title.to_string(),
            assumptions,
        }
    }

    #[test]
    fn test_merged_across_engines_by_score() {
        let mut identification = Identification::new();
        identification.add(spectrum_match(
            "a.mgf",
            "s1",
            vec![tag(1, 80.0, "PEPK"), tag(2, 60.0, "PEK")],
        ));
        identification.add(spectrum_match("a.mgf", "s1", vec![peptide(70.0, "AAK")]));

        let scores: Vec<f64> = identification
            .merged_assumptions("a.mgf", "s1")
            .iter()
            .map(|a| a.score())
            .collect();
        assert_eq!(scores, vec![80.0, 70.0, 60.0]);
        assert_eq!(identification.spectrum_count(), 1);
        assert_eq!(identification.assumption_count(), 3);
    }

    #[test]
    fn test_equal_scores_keep_rank_order() {
        let mut identification = Identification::new();
        identification.add(spectrum_match(
            "a.mgf",
            "s1",
            vec![tag(2, 50.0, "BBB"), tag(1, 50.0, "AAA"), tag(3, 50.0, "CCC")],
        ));

        let ranks: Vec<usize> = identification
            .merged_assumptions("a.mgf", "s1")
            .iter()
            .map(|a| a.rank())
            .collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_equal_scores_across_engines_keep_engine_order() {
        let mut identification = Identification::new();
        identification.add(spectrum_match("a.mgf", "s1", vec![peptide(50.0, "NNN")]));
        identification.add(spectrum_match("a.mgf", "s1", vec![tag(1, 50.0, "PPP")]));

        let engines: Vec<Engine> = identification
            .merged_assumptions("a.mgf", "s1")
            .iter()
            .map(|a| a.engine())
            .collect();
        assert_eq!(engines, vec![Engine::PepNovo, Engine::Novor]);
    }

    #[test]
    fn test_report_titles_follow_spectrum_source() {
        let mut identification = Identification::new();
        identification.add(spectrum_match("a.mgf", "s3", vec![tag(1, 1.0, "K")]));
        identification.add(spectrum_match("a.mgf", "orphan", vec![tag(1, 1.0, "K")]));
        identification.add(spectrum_match("a.mgf", "s1", vec![tag(1, 1.0, "K")]));

        let spectra = InMemorySpectra::new()
            .with("a.mgf", "s1", Precursor::new(1.0, vec![2]))
            .with("a.mgf", "s2", Precursor::new(1.0, vec![2]))
            .with("a.mgf", "s3", Precursor::new(1.0, vec![2]));

        assert_eq!(
            identification.report_titles("a.mgf", &spectra),
            vec!["s1", "s2", "s3", "orphan"]
        );
        assert_eq!(
            identification.report_titles("a.mgf", &InMemorySpectra::new()),
            vec!["s3", "orphan", "s1"]
        );
    }

    #[test]
    fn test_unknown_spectrum_is_empty() {
        let identification = Identification::new();
        assert!(identification.merged_assumptions("a.mgf", "x").is_empty());
        assert!(!identification.contains("a.mgf", "x"));
        assert!(identification.is_empty());
    }
}
