use std::path::Path;

use indexmap::IndexMap;

use crate::cancel::CancellationToken;
use crate::config::PepNovoFormat;
use crate::engine::Engine;
use crate::error::ParseError;
use crate::identification::{
    Assumption, AssumptionScores, ModificationResolver, RunStatistics, SpectrumMatch, Tag,
    TagAssumption,
};
use crate::pipeline::ProgressReporter;

use super::index::{EngineOutputIndex, PEPNOVO_MARKER};
use super::sequence::parse_sequence;
use super::{
    decoded_offsets, parse_integer, parse_number, RecordReader, ResultParser, SpectrumOutcome,
};

/// Column header opening a PepNovo solution table.
pub const TABLE_HEADER: &str = "#Index\tRnkScr\tPnvScr\tN-Gap\tC-Gap\t[M+H]\tCharge\tSequence";

const COLUMNS: [&str; 8] = [
    "Index", "RnkScr", "PnvScr", "N-Gap", "C-Gap", "[M+H]", "Charge", "Sequence",
];

/// Parser for PepNovo text output (`<spectrum file>.out`).
pub struct PepNovoParser {
    spectrum_file_name: String,
    format: PepNovoFormat,
    resolver: ModificationResolver,
    index: EngineOutputIndex,
    offsets: IndexMap<String, u64>,
    reader: RecordReader,
}

impl PepNovoParser {
    pub fn open(
        result_file: &Path,
        spectrum_file_name: &str,
        format: PepNovoFormat,
        resolver: ModificationResolver,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Self, ParseError> {
        let index = EngineOutputIndex::scan_pepnovo(result_file, &format, cancel, progress)?;
        let offsets = decoded_offsets(&index);
        let reader = RecordReader::open(result_file)?;
        Ok(Self {
            spectrum_file_name: spectrum_file_name.to_string(),
            format,
            resolver,
            index,
            offsets,
            reader,
        })
    }

    fn is_no_solution(&self, line: &str) -> bool {
        self.format
            .no_solution_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }

    /// One table row. `rank` is the 1-based row position.
    fn parse_row(&self, line: &str, rank: usize) -> Result<TagAssumption, ParseError> {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < COLUMNS.len() {
            return Err(ParseError::MissingColumn {
                column: COLUMNS[fields.len()],
                line: line.to_string(),
            });
        }

        let rank_score = parse_number("RnkScr", fields[1])?;
        let score = parse_number("PnvScr", fields[2])?;
        let n_gap = parse_number("N-Gap", fields[3])?;
        let c_gap = parse_number("C-Gap", fields[4])?;
        let reported_mass = parse_number("[M+H]", fields[5])?;
        let charge = parse_integer("Charge", fields[6])?;
        let sequence = parse_sequence(fields[7].trim(), &self.resolver)?;

        Ok(TagAssumption {
            rank,
            engine: Engine::PepNovo,
            scores: AssumptionScores {
                rank_score: Some(rank_score),
                score,
            },
            tag: Tag {
                n_gap,
                sequence,
                c_gap,
            },
            charge,
            reported_mass: Some(reported_mass),
        })
    }
}

impl ResultParser for PepNovoParser {
    fn engine(&self) -> Engine {
        Engine::PepNovo
    }

    fn spectrum_file_name(&self) -> &str {
        &self.spectrum_file_name
    }

    fn result_file(&self) -> &Path {
        self.reader.path()
    }

    fn index(&self) -> &EngineOutputIndex {
        &self.index
    }

    fn titles(&self) -> Vec<String> {
        self.offsets.keys().cloned().collect()
    }

    fn spectrum_match(
        &self,
        title: &str,
        stats: &mut RunStatistics,
    ) -> Result<SpectrumOutcome, ParseError> {
        let offset = self
            .offsets
            .get(title)
            .copied()
            .ok_or_else(|| ParseError::UnknownTitle(title.to_string()))?;

        let lines = self.reader.lines_from(offset, None, |line| {
            line.trim().is_empty() || line.starts_with(PEPNOVO_MARKER)
        })?;
        let Some((first, rows)) = lines.split_first() else {
            return Ok(SpectrumOutcome::default());
        };

        let first = first.trim();
        if self.is_no_solution(first) {
            return Ok(SpectrumOutcome::default());
        }
        if first != TABLE_HEADER {
            return Err(ParseError::UnsupportedFormat {
                path: self.reader.path().to_path_buf(),
                expected: TABLE_HEADER.to_string(),
                found: first.to_string(),
            });
        }

        let mut spectrum_match = SpectrumMatch::new(&self.spectrum_file_name, title);
        let mut row_errors = Vec::new();
        for (position, row) in rows.iter().enumerate() {
            match self.parse_row(row, position + 1) {
                Ok(tag) => {
                    let assumption = Assumption::Tag(tag);
                    stats.record(&assumption);
                    spectrum_match.assumptions.push(assumption);
                }
                Err(e) => row_errors.push(e),
            }
        }

        Ok(SpectrumOutcome {
            spectrum_match: Some(spectrum_match),
            row_errors,
        })
    }
}
