//! Lazy parsing of engine result files through a byte-offset index.

pub mod index;
pub mod novor;
pub mod pepnovo;
pub mod sequence;
pub mod title;

use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::cancel::CancellationToken;
use crate::config::PepNovoFormat;
use crate::engine::Engine;
use crate::error::ParseError;
use crate::identification::{ModificationResolver, RunStatistics, SpectrumMatch};
use crate::pipeline::{ProgressEvent, ProgressReporter};
use crate::spectrum::SpectrumSource;

pub use index::EngineOutputIndex;
pub use novor::NovorParser;
pub use pepnovo::PepNovoParser;
pub use title::decode_title;

/// What parsing one spectrum produced.
#[derive(Debug, Default)]
pub struct SpectrumOutcome {
    /// `None` when the engine reported no solution.
    pub spectrum_match: Option<SpectrumMatch>,
    /// Rows that could not be turned into assumptions.
    pub row_errors: Vec<ParseError>,
}

/// A row-level failure attributed to its spectrum.
#[derive(Debug)]
pub struct SpectrumError {
    pub title: String,
    pub error: ParseError,
}

/// Everything read from one result file.
#[derive(Debug)]
pub struct ParsedFile {
    pub engine: Engine,
    pub spectrum_file_name: String,
    pub result_file: PathBuf,
    pub matches: Vec<SpectrumMatch>,
    /// Titles the engine reported no solution for.
    pub no_solution: Vec<String>,
    pub errors: Vec<SpectrumError>,
    /// Parsing stopped early, or the index scan did.
    pub cancelled: bool,
}

/// Reads the results of one engine for one spectrum file.
pub trait ResultParser {
    fn engine(&self) -> Engine;

    fn spectrum_file_name(&self) -> &str;

    fn result_file(&self) -> &Path;

    fn index(&self) -> &EngineOutputIndex;

    /// Decoded titles in file order.
    fn titles(&self) -> Vec<String>;

    /// Parses the record for a decoded `title`, recording every parsed
    /// assumption in `stats`.
    fn spectrum_match(
        &self,
        title: &str,
        stats: &mut RunStatistics,
    ) -> Result<SpectrumOutcome, ParseError>;

    /// Parses every indexed spectrum. A format error fails the whole file;
    /// row errors are collected.
    fn all_spectrum_matches(
        &self,
        stats: &mut RunStatistics,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<ParsedFile, ParseError> {
        let titles = self.titles();
        let total = titles.len() as u64;
        let mut parsed = ParsedFile {
            engine: self.engine(),
            spectrum_file_name: self.spectrum_file_name().to_string(),
            result_file: self.result_file().to_path_buf(),
            matches: Vec::new(),
            no_solution: Vec::new(),
            errors: Vec::new(),
            cancelled: self.index().is_cancelled(),
        };
        let file_label = self.result_file().display().to_string();

        for (done, title) in titles.into_iter().enumerate() {
            if cancel.is_cancelled() {
                parsed.cancelled = true;
                break;
            }

            let outcome = self.spectrum_match(&title, stats)?;
            for error in outcome.row_errors {
                warn!("{} in {} ({}): {}", self.engine(), file_label, title, error);
                parsed.errors.push(SpectrumError {
                    title: title.clone(),
                    error,
                });
            }
            match outcome.spectrum_match {
                Some(spectrum_match) => parsed.matches.push(spectrum_match),
                None => parsed.no_solution.push(title),
            }

            progress.report(ProgressEvent::Tick {
                file: file_label.clone(),
                done: done as u64 + 1,
                total,
            });
        }

        debug!(
            "Parsed {} spectra from {} ({} without solution, {} row errors)",
            parsed.matches.len(),
            file_label,
            parsed.no_solution.len(),
            parsed.errors.len()
        );
        Ok(parsed)
    }
}

/// Collaborators shared by all parsers of a run.
pub struct ParserContext<'a> {
    pub resolver: &'a ModificationResolver,
    pub spectra: &'a dyn SpectrumSource,
    pub pepnovo_format: &'a PepNovoFormat,
    pub cancel: &'a CancellationToken,
    pub progress: &'a dyn ProgressReporter,
}

/// Indexes `result_file` and returns the parser for `engine`.
pub fn open_parser<'a>(
    engine: Engine,
    result_file: &Path,
    spectrum_file_name: &str,
    context: &ParserContext<'a>,
) -> Result<Box<dyn ResultParser + 'a>, ParseError> {
    let parser: Box<dyn ResultParser + 'a> = match engine {
        Engine::PepNovo => Box::new(PepNovoParser::open(
            result_file,
            spectrum_file_name,
            context.pepnovo_format.clone(),
            context.resolver.clone(),
            context.cancel,
            context.progress,
        )?),
        Engine::Novor => Box::new(NovorParser::open(
            result_file,
            spectrum_file_name,
            context.resolver.clone(),
            context.spectra,
            context.cancel,
            context.progress,
        )?),
    };
    Ok(parser)
}

/// Seekable line reader over a result file, shared by the parsers.
pub(crate) struct RecordReader {
    path: PathBuf,
    reader: RefCell<BufReader<File>>,
}

impl RecordReader {
    pub(crate) fn open(path: &Path) -> Result<Self, ParseError> {
        let file = File::open(path).map_err(|e| ParseError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: RefCell::new(BufReader::new(file)),
        })
    }

    fn read_error(&self, source: std::io::Error) -> ParseError {
        ParseError::Read {
            path: self.path.clone(),
            source,
        }
    }

    /// Lines from `offset` on, without terminators, until `stop` matches a
    /// line or the file ends. `limit` bounds the number of lines returned.
    pub(crate) fn lines_from<F>(
        &self,
        offset: u64,
        limit: Option<usize>,
        stop: F,
    ) -> Result<Vec<String>, ParseError>
    where
        F: Fn(&str) -> bool,
    {
        let mut reader = self.reader.borrow_mut();
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.read_error(e))?;

        let mut lines = Vec::new();
        let mut buffer = Vec::new();
        loop {
            if limit.is_some_and(|l| lines.len() >= l) {
                break;
            }
            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .map_err(|e| self.read_error(e))?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buffer);
            let line = line.trim_end_matches(['\n', '\r']);
            if stop(line) {
                break;
            }
            lines.push(line.to_string());
        }
        Ok(lines)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

/// Decoded title to offset, built once from an index. Raw titles that decode
/// to the same string keep the later offset.
pub(crate) fn decoded_offsets(index: &EngineOutputIndex) -> IndexMap<String, u64> {
    let mut offsets = IndexMap::with_capacity(index.len());
    for (title, offset) in index.decoded() {
        if let Some(previous) = offsets.insert(title.clone(), offset) {
            warn!(
                "Spectrum titles collide after decoding as '{}' (offsets {} and {}), keeping the later",
                title, previous, offset
            );
        }
    }
    offsets
}

pub(crate) fn parse_number(column: &'static str, value: &str) -> Result<f64, ParseError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber {
            column,
            value: value.to_string(),
        })
}

pub(crate) fn parse_integer(column: &'static str, value: &str) -> Result<i32, ParseError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidNumber {
            column,
            value: value.to_string(),
        })
}

/// Spectrum file name a result file was produced from.
pub fn spectrum_file_name_for(engine: Engine, result_file: &Path) -> String {
    let name = result_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match engine {
        Engine::PepNovo => name.strip_suffix(".out").unwrap_or(&name).to_string(),
        Engine::Novor => match name.strip_suffix(".novor.csv") {
            Some(stem) => format!("{}.mgf", stem),
            None => name,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoopProgress;
    use tempfile::TempDir;

    #[test]
    fn test_decoded_collisions_keep_later_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.mgf.out");
        let first = ">> 0 0 a+b (SQS 1)\n\n";
        std::fs::write(&path, format!("{}>> 0 1 a%20b (SQS 1)\n\n", first)).unwrap();
        let index = EngineOutputIndex::scan_pepnovo(
            &path,
            &PepNovoFormat::default(),
            &CancellationToken::new(),
            &NoopProgress,
        )
        .unwrap();
        assert_eq!(index.len(), 2);

        let offsets = decoded_offsets(&index);
        assert_eq!(offsets.len(), 1);
        assert_eq!(offsets.get("a b"), index.offset("a%20b").as_ref());
        assert!(offsets["a b"] > first.len() as u64);
    }

    #[test]
    fn test_spectrum_file_name_for() {
        assert_eq!(
            spectrum_file_name_for(Engine::PepNovo, Path::new("/out/run1.mgf.out")),
            "run1.mgf"
        );
        assert_eq!(
            spectrum_file_name_for(Engine::Novor, Path::new("/out/run1.novor.csv")),
            "run1.mgf"
        );
    }

    #[test]
    fn test_parse_number_errors_name_column() {
        assert_eq!(parse_number("RnkScr", " 4.5 ").unwrap(), 4.5);
        assert!(matches!(
            parse_number("RnkScr", "abc"),
            Err(ParseError::InvalidNumber { column: "RnkScr", .. })
        ));
        assert_eq!(parse_integer("Charge", "2").unwrap(), 2);
        assert!(parse_integer("Charge", "2.5").is_err());
    }
}
