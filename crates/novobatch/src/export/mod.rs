//! Merging engine results per spectrum and writing flat reports.

pub mod aggregate;
pub mod text;

use serde::{Deserialize, Serialize};

pub use aggregate::Identification;
pub use text::{ExportKind, Exporter};

/// Which assumptions make it into a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub threshold: f64,
    /// Keep scores `>= threshold` when true, `<= threshold` otherwise.
    #[serde(default = "default_greater_than")]
    pub greater_than: bool,
    /// Cap on rows per spectrum, applied after the threshold.
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,
    #[serde(default)]
    pub min_isotope: i32,
    #[serde(default = "default_max_isotope")]
    pub max_isotope: i32,
    /// Reports to write after a run.
    #[serde(default = "default_kinds")]
    pub kinds: Vec<ExportKind>,
}

fn default_greater_than() -> bool {
    true
}

fn default_max_matches() -> usize {
    10
}

fn default_max_isotope() -> i32 {
    1
}

fn default_kinds() -> Vec<ExportKind> {
    vec![ExportKind::Peptides, ExportKind::Tags]
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            greater_than: default_greater_than(),
            max_matches: default_max_matches(),
            min_isotope: 0,
            max_isotope: default_max_isotope(),
            kinds: default_kinds(),
        }
    }
}

impl ExportSettings {
    pub fn passes(&self, score: f64) -> bool {
        if self.greater_than {
            score >= self.threshold
        } else {
            score <= self.threshold
        }
    }

    /// Threshold first, then the cap.
    pub fn select<T, F>(&self, candidates: Vec<T>, score: F) -> Vec<T>
    where
        F: Fn(&T) -> f64,
    {
        candidates
            .into_iter()
            .filter(|c| self.passes(score(c)))
            .take(self.max_matches)
            .collect()
    }
}
