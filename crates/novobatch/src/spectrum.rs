//! Access to spectrum file contents needed when reporting results.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Precursor of one spectrum as recorded in the spectrum file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    pub mz: f64,
    /// Possible charges, empty when the file does not state one.
    #[serde(default)]
    pub charges: Vec<i32>,
}

impl Precursor {
    pub fn new(mz: f64, charges: Vec<i32>) -> Self {
        Self { mz, charges }
    }

    /// Charges rendered as `2+, 3+`.
    pub fn charges_label(&self) -> String {
        self.charges
            .iter()
            .map(|z| {
                if *z < 0 {
                    format!("{}-", -z)
                } else {
                    format!("{}+", z)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Read access to spectrum files, keyed by file name (not path).
pub trait SpectrumSource: Send + Sync {
    fn precursor(&self, spectrum_file: &str, title: &str) -> Option<Precursor>;

    /// Titles in file order, when the file is known.
    fn titles(&self, spectrum_file: &str) -> Option<Vec<String>>;

    /// Title of the spectrum at 0-based position `index`.
    fn title_at(&self, spectrum_file: &str, index: usize) -> Option<String> {
        self.titles(spectrum_file)?.into_iter().nth(index)
    }
}

/// Spectrum metadata held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySpectra {
    files: HashMap<String, IndexMap<String, Precursor>>,
}

impl InMemorySpectra {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spectrum_file: &str, title: &str, precursor: Precursor) {
        self.files
            .entry(spectrum_file.to_string())
            .or_default()
            .insert(title.to_string(), precursor);
    }

    pub fn with(mut self, spectrum_file: &str, title: &str, precursor: Precursor) -> Self {
        self.insert(spectrum_file, title, precursor);
        self
    }
}

impl SpectrumSource for InMemorySpectra {
    fn precursor(&self, spectrum_file: &str, title: &str) -> Option<Precursor> {
        self.files.get(spectrum_file)?.get(title).cloned()
    }

    fn titles(&self, spectrum_file: &str) -> Option<Vec<String>> {
        self.files
            .get(spectrum_file)
            .map(|spectra| spectra.keys().cloned().collect())
    }

    fn title_at(&self, spectrum_file: &str, index: usize) -> Option<String> {
        self.files
            .get(spectrum_file)?
            .get_index(index)
            .map(|(title, _)| title.clone())
    }
}
