use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::WorkerError;

/// Resolves the configured spectrum inputs to a list of MGF files.
pub struct SpectrumScanner {
    inputs: Vec<PathBuf>,
}

impl SpectrumScanner {
    pub fn new<I, P>(inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            inputs: inputs.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
        }
    }

    /// Files are taken as given; folders contribute their top-level `.mgf`
    /// files in name order. Duplicates are dropped, first occurrence wins.
    pub fn scan(&self) -> Result<Vec<PathBuf>, WorkerError> {
        let mut files: Vec<PathBuf> = Vec::new();

        for input in &self.inputs {
            if input.is_file() {
                push_unique(&mut files, input.clone());
                continue;
            }
            if !input.is_dir() {
                return Err(WorkerError::MissingInput(input.clone()));
            }

            for entry in WalkDir::new(input)
                .min_depth(1)
                .max_depth(1) // Only scan top level
                .sort_by_file_name()
            {
                let entry = entry.map_err(|e| WorkerError::ScanFailed {
                    path: input.clone(),
                    source: e,
                })?;
                let path = entry.path();

                if entry.file_type().is_dir() {
                    continue;
                }

                if is_mgf(path) {
                    debug!("Found spectrum file: {}", path.display());
                    push_unique(&mut files, path.to_path_buf());
                }
            }
        }

        info!("Found {} spectrum files", files.len());
        Ok(files)
    }
}

pub fn is_mgf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mgf"))
}

fn push_unique(files: &mut Vec<PathBuf>, path: PathBuf) {
    if !files.contains(&path) {
        files.push(path);
    }
}
