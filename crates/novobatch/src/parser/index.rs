use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::cancel::CancellationToken;
use crate::config::PepNovoFormat;
use crate::error::ParseError;
use crate::pipeline::{ProgressEvent, ProgressReporter};
use crate::spectrum::SpectrumSource;

use super::title::decode_title;

/// Line prefix opening a PepNovo record.
pub const PEPNOVO_MARKER: &str = ">>";
const SQS_BOUNDARY: &str = "(SQS";
const PROBLEM_BOUNDARY: &str = "#Problem";
/// Line prefix of the Novor column header.
pub const NOVOR_HEADER_PREFIX: &str = "# id";

/// Most progress ticks a single scan emits.
const MAX_PROGRESS_TICKS: u64 = 100;

/// Spectrum title to byte offset of its record in one engine output file,
/// in file order.
#[derive(Debug, Clone, Default)]
pub struct EngineOutputIndex {
    offsets: IndexMap<String, u64>,
    percent_encoded: bool,
    cancelled: bool,
}

impl EngineOutputIndex {
    /// Indexes a PepNovo output. Keys are raw titles; the offset points just
    /// past the `>>` line.
    pub fn scan_pepnovo(
        path: &Path,
        format: &PepNovoFormat,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Self, ParseError> {
        let mut index = Self {
            percent_encoded: true,
            ..Self::default()
        };
        let offset = format.title_token_offset;
        index.scan(path, cancel, progress, |line, _, end| {
            if !line.starts_with(PEPNOVO_MARKER) {
                return None;
            }
            match pepnovo_title(line, offset) {
                Some(title) => Some((title, end)),
                None => {
                    warn!("Skipping record without a title: {}", line);
                    None
                }
            }
        })?;
        Ok(index)
    }

    /// Indexes a Novor CSV. Titles come from `spectra` by spectrum id,
    /// falling back to the scan number; the offset points at the row.
    pub fn scan_novor(
        path: &Path,
        spectrum_file_name: &str,
        spectra: &dyn SpectrumSource,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Self, ParseError> {
        let mut index = Self::default();
        let mut header_seen = false;
        let mut format_error = None;
        index.scan(path, cancel, progress, |line, start, _| {
            if format_error.is_some() {
                return None;
            }
            let trimmed = line.trim();
            if trimmed.starts_with(NOVOR_HEADER_PREFIX) {
                header_seen = true;
                return None;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            if !header_seen {
                format_error = Some(trimmed.to_string());
                return None;
            }
            let mut fields = trimmed.split(',').map(str::trim);
            let id = fields.next().and_then(|f| f.parse::<usize>().ok());
            let scan = fields.next().unwrap_or_default();
            let title = id
                .and_then(|id| id.checked_sub(1))
                .and_then(|i| spectra.title_at(spectrum_file_name, i))
                .unwrap_or_else(|| scan.to_string());
            Some((title, start))
        })?;

        if let Some(found) = format_error {
            return Err(ParseError::UnsupportedFormat {
                path: path.to_path_buf(),
                expected: format!("{}, scanNum, ...", NOVOR_HEADER_PREFIX),
                found,
            });
        }
        Ok(index)
    }

    /// One sequential pass. `record` receives each line without its line
    /// terminator plus the offsets of the line start and of the next line.
    fn scan<F>(
        &mut self,
        path: &Path,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
        mut record: F,
    ) -> Result<(), ParseError>
    where
        F: FnMut(&str, u64, u64) -> Option<(String, u64)>,
    {
        let file = File::open(path).map_err(|e| ParseError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let total = file.metadata().map(|m| m.len()).unwrap_or(0);
        let unit = (total / MAX_PROGRESS_TICKS).max(1);
        let file_label = path.display().to_string();

        let mut reader = BufReader::new(file);
        let mut buffer = Vec::new();
        let mut position: u64 = 0;
        let mut ticks: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                debug!("Index scan of {} cancelled at byte {}", file_label, position);
                self.cancelled = true;
                break;
            }

            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|e| ParseError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            if read == 0 {
                break;
            }

            let start = position;
            position += read as u64;
            let line = String::from_utf8_lossy(&buffer);
            let line = line.trim_end_matches(['\n', '\r']);

            if let Some((title, offset)) = record(line, start, position) {
                if let Some(previous) = self.offsets.insert(title.clone(), offset) {
                    warn!(
                        "Duplicate spectrum title '{}' in {} (offsets {} and {}), keeping the later",
                        title, file_label, previous, offset
                    );
                }
            }

            let reached = (position / unit).min(MAX_PROGRESS_TICKS);
            if reached > ticks {
                ticks = reached;
                progress.report(ProgressEvent::Tick {
                    file: file_label.clone(),
                    done: ticks,
                    total: MAX_PROGRESS_TICKS,
                });
            }
        }

        debug!("Indexed {} spectra in {}", self.offsets.len(), file_label);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// The scan stopped early on cancellation; entries present are complete.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Titles as stored in the file, in file order.
    pub fn raw_titles(&self) -> impl Iterator<Item = &str> {
        self.offsets.keys().map(String::as_str)
    }

    pub fn offset(&self, raw_title: &str) -> Option<u64> {
        self.offsets.get(raw_title).copied()
    }

    /// Decoded title and offset pairs, in file order.
    pub fn decoded(&self) -> impl Iterator<Item = (String, u64)> + '_ {
        self.offsets.iter().map(|(title, offset)| {
            let title = if self.percent_encoded {
                decode_title(title)
            } else {
                title.clone()
            };
            (title, *offset)
        })
    }
}

/// Title carried by a `>>` line, or `None` when no boundary marker is found
/// or nothing precedes it.
pub fn pepnovo_title(line: &str, token_offset: usize) -> Option<String> {
    let joined = line
        .split_whitespace()
        .skip(token_offset)
        .collect::<Vec<_>>()
        .join(" ");
    let end = joined
        .rfind(PROBLEM_BOUNDARY)
        .or_else(|| joined.rfind(SQS_BOUNDARY))?;
    let title = joined[..end].trim();
    if title.is_empty() {
        return None;
    }
    Some(title.to_string())
}
