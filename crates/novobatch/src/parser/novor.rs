use std::path::Path;

use indexmap::IndexMap;

use crate::cancel::CancellationToken;
use crate::engine::{Engine, NovorModificationMap};
use crate::error::{ParseError, ResolveError};
use crate::identification::{
    AminoAcid, AminoAcidSequence, Assumption, AssumptionScores, ModificationCatalog,
    ModificationMatch, ModificationResolver, Peptide, PeptideAssumption, RunStatistics,
    SpectrumMatch,
};
use crate::pipeline::ProgressReporter;
use crate::spectrum::SpectrumSource;

use super::index::EngineOutputIndex;
use super::{
    decoded_offsets, parse_integer, parse_number, RecordReader, ResultParser, SpectrumOutcome,
};

const COLUMNS: [&str; 10] = [
    "id",
    "scanNum",
    "RT",
    "mz(data)",
    "z",
    "pepMass(denovo)",
    "err(data-denovo)",
    "ppm(1e6*err/(mz*z))",
    "score",
    "peptide",
];

/// Parser for Novor CSV output (`<stem>.novor.csv`). Novor reports one
/// peptide per spectrum.
pub struct NovorParser {
    spectrum_file_name: String,
    resolver: ModificationResolver,
    short_names: NovorModificationMap,
    index: EngineOutputIndex,
    offsets: IndexMap<String, u64>,
    reader: RecordReader,
}

impl NovorParser {
    pub fn open(
        result_file: &Path,
        spectrum_file_name: &str,
        resolver: ModificationResolver,
        spectra: &dyn SpectrumSource,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<Self, ParseError> {
        let index = EngineOutputIndex::scan_novor(
            result_file,
            spectrum_file_name,
            spectra,
            cancel,
            progress,
        )?;
        let offsets = decoded_offsets(&index);
        let reader = RecordReader::open(result_file)?;
        let short_names = NovorModificationMap::new(resolver.catalog());
        Ok(Self {
            spectrum_file_name: spectrum_file_name.to_string(),
            resolver,
            short_names,
            index,
            offsets,
            reader,
        })
    }

    fn parse_row(&self, line: &str) -> Result<PeptideAssumption, ParseError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < COLUMNS.len() {
            return Err(ParseError::MissingColumn {
                column: COLUMNS[fields.len()],
                line: line.to_string(),
            });
        }

        let charge = parse_integer("z", fields[4])?;
        let score = parse_number("score", fields[8])?;
        let sequence = parse_peptide(fields[9], &self.short_names, self.resolver.catalog())?;

        Ok(PeptideAssumption {
            rank: 1,
            engine: Engine::Novor,
            scores: AssumptionScores {
                rank_score: None,
                score,
            },
            peptide: Peptide {
                sequence,
                proteins: Vec::new(),
            },
            charge,
            source_tag: None,
        })
    }
}

/// Parses a Novor peptide such as `PEPM(0)K`. A `(k)` token names the
/// modification with short name `k` on the preceding residue, or on the
/// first residue when it opens the peptide.
pub fn parse_peptide(
    source: &str,
    short_names: &NovorModificationMap,
    catalog: &ModificationCatalog,
) -> Result<AminoAcidSequence, ParseError> {
    let mut sequence = AminoAcidSequence::default();
    let mut chars = source.chars();

    while let Some(c) = chars.next() {
        if c != '(' {
            let residue = AminoAcid::from_char(c).ok_or_else(|| ParseError::InvalidToken {
                token: c,
                sequence: source.to_string(),
            })?;
            sequence.residues.push(residue);
            continue;
        }

        let mut short_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == ')' {
                closed = true;
                break;
            }
            short_name.push(c);
        }
        if !closed {
            return Err(ParseError::InvalidToken {
                token: '(',
                sequence: source.to_string(),
            });
        }

        let modification = short_names
            .name(&short_name)
            .and_then(|name| catalog.get(name))
            .ok_or_else(|| ParseError::Modification {
                sequence: source.to_string(),
                source: ResolveError::UnknownShortName(short_name.clone()),
            })?;
        let site = sequence.residues.len().max(1);
        let mut placed = ModificationMatch::variable(modification, site, true);
        placed.variable = !modification.fixed;
        sequence.modifications.push(placed);
    }

    Ok(sequence)
}

impl ResultParser for NovorParser {
    fn engine(&self) -> Engine {
        Engine::Novor
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

        let lines = self.reader.lines_from(offset, Some(1), |_| false)?;
        let Some(row) = lines.first() else {
            return Ok(SpectrumOutcome::default());
        };

        let mut spectrum_match = SpectrumMatch::new(&self.spectrum_file_name, title);
        let mut row_errors = Vec::new();
        match self.parse_row(row) {
            Ok(peptide) => {
                let assumption = Assumption::Peptide(peptide);
                stats.record(&assumption);
                spectrum_match.assumptions.push(assumption);
            }
            Err(e) => row_errors.push(e),
        }

        Ok(SpectrumOutcome {
            spectrum_match: Some(spectrum_match),
            row_errors,
        })
    }
}
