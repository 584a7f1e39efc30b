use serde::Serialize;

use super::assumption::Assumption;

/// All candidates proposed for one spectrum, in engine rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumMatch {
    pub spectrum_file: String,
    pub spectrum_title: String,
    pub assumptions: Vec<Assumption>,
}

impl SpectrumMatch {
    pub fn new(spectrum_file: impl Into<String>, spectrum_title: impl Into<String>) -> Self {
        Self {
            spectrum_file: spectrum_file.into(),
            spectrum_title: spectrum_title.into(),
            assumptions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assumptions.is_empty()
    }
}
