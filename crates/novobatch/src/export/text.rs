use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::ExportError;
use crate::identification::{
    mass_error, Assumption, AssumptionScores, MassError, ModificationCatalog, PeptideAssumption,
    TagAssumption,
};
use crate::spectrum::{Precursor, SpectrumSource};

use super::aggregate::Identification;
use super::ExportSettings;

const SEPARATOR: &str = "\t";
const BLAST_SEPARATOR: &str = ";";

const SPECTRUM_COLUMNS: [&str; 4] = [
    "File Name",
    "Spectrum Title",
    "Measured m/z",
    "Measured Charge",
];
const SCORE_COLUMNS: [&str; 3] = ["PepNovo RankScore", "PepNovo Score", "Novor Score"];

/// Report shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// One row per peptide, including complete tags.
    Peptides,
    /// One row per tag.
    Tags,
    /// Two lines per hit for similarity search tools.
    Blast,
}

impl ExportKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportKind::Peptides => "de_novo_peptides.txt",
            ExportKind::Tags => "de_novo_tags.txt",
            ExportKind::Blast => "de_novo_blast.txt",
        }
    }
}

/// Writes reports over a merged [`Identification`].
pub struct Exporter<'a> {
    identification: &'a Identification,
    spectra: &'a dyn SpectrumSource,
    catalog: &'a ModificationCatalog,
    settings: &'a ExportSettings,
    /// Gaps within this many Dalton of zero make a tag complete.
    fragment_tolerance: f64,
}

impl<'a> Exporter<'a> {
    pub fn new(
        identification: &'a Identification,
        spectra: &'a dyn SpectrumSource,
        catalog: &'a ModificationCatalog,
        settings: &'a ExportSettings,
        fragment_tolerance: f64,
    ) -> Self {
        Self {
            identification,
            spectra,
            catalog,
            settings,
            fragment_tolerance,
        }
    }

    /// Writes `kind` to `path`, creating parent folders.
    pub fn export(&self, kind: ExportKind, path: &Path) -> Result<PathBuf, ExportError> {
        let write_error = |source: io::Error| ExportError::WriteFile {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        let file = File::create(path).map_err(write_error)?;
        let mut out = BufWriter::new(file);
        self.write(kind, &mut out).map_err(write_error)?;
        out.flush().map_err(write_error)?;

        debug!("Exported {:?} report to {}", kind, path.display());
        Ok(path.to_path_buf())
    }

    pub fn write<W: Write>(&self, kind: ExportKind, out: &mut W) -> io::Result<()> {
        match kind {
            ExportKind::Peptides => self.write_peptides(out),
            ExportKind::Tags => self.write_tags(out),
            ExportKind::Blast => self.write_blast(out),
        }
    }

    /// Visits every reported spectrum with its precursor and merged
    /// assumptions.
    fn for_each_spectrum<F>(&self, mut visit: F) -> io::Result<()>
    where
        F: FnMut(&SpectrumContext<'_>, Vec<&Assumption>) -> io::Result<()>,
    {
        for spectrum_file in self.identification.spectrum_files() {
            for title in self.identification.report_titles(spectrum_file, self.spectra) {
                let context = SpectrumContext {
                    spectrum_file,
                    title: &title,
                    precursor: self.spectra.precursor(spectrum_file, &title),
                };
                let merged = self.identification.merged_assumptions(spectrum_file, &title);
                visit(&context, merged)?;
            }
        }
        Ok(())
    }

    pub fn write_peptides<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut header: Vec<&str> = SPECTRUM_COLUMNS.to_vec();
        header.extend([
            "Rank",
            "Protein(s)",
            "Peptide",
            "Peptide Variable Modifications",
            "Modified Sequence",
            "Tag",
            "Longest Amino Acid Sequence",
            "Tag Variable Modifications",
            "Modified Tag Sequence",
        ]);
        header.extend(SCORE_COLUMNS);
        header.extend([
            "N-Gap",
            "C-Gap",
            "Theoretic m/z",
            "Identification Charge",
            "Tag Mass Error (Da)",
            "Tag Mass Error (ppm)",
            "Peptide Mass Error (Da)",
            "Peptide Mass Error (ppm)",
            "Isotope",
        ]);
        writeln!(out, "{}", header.join(SEPARATOR))?;

        self.for_each_spectrum(|spectrum, merged| {
            let candidates: Vec<Cow<'_, PeptideAssumption>> = merged
                .into_iter()
                .filter_map(|assumption| match assumption {
                    Assumption::Peptide(p) => Some(Cow::Borrowed(p)),
                    Assumption::Tag(t) => t
                        .to_peptide_assumption(self.fragment_tolerance)
                        .map(Cow::Owned),
                })
                .collect();
            let selected = self.settings.select(candidates, |p| p.scores.score);
            if selected.is_empty() {
                return writeln!(out);
            }
            for peptide in &selected {
                let row = self.peptide_row(spectrum, peptide);
                writeln!(out, "{}", row.join(SEPARATOR))?;
            }
            Ok(())
        })
    }

    fn peptide_row(
        &self,
        spectrum: &SpectrumContext<'_>,
        assumption: &PeptideAssumption,
    ) -> Vec<String> {
        let peptide = &assumption.peptide;
        let mut row = spectrum.columns();
        row.push(assumption.rank.to_string());
        row.push(peptide.sorted_proteins().join(BLAST_SEPARATOR));
        row.push(peptide.sequence.sequence());
        row.push(peptide.sequence.variable_modifications_summary());
        row.push(peptide.sequence.tagged_sequence(self.catalog));

        let tag = assumption.source_tag.as_deref();
        match tag {
            Some(tag) => row.extend([
                tag.tag.as_sequence(),
                tag.tag.longest_amino_acid_sequence(),
                tag.tag.sequence.variable_modifications_summary(),
                tag.tag.tagged_sequence(self.catalog),
            ]),
            None => row.extend(std::iter::repeat(String::new()).take(4)),
        }

        row.extend(score_columns(assumption.engine, assumption.scores));
        row.push(optional(tag.map(|t| t.tag.n_gap)));
        row.push(optional(tag.map(|t| t.tag.c_gap)));
        let theoretical = assumption.theoretical_mz();
        row.push(theoretical.to_string());
        row.push(assumption.charge.to_string());

        let tag_error =
            tag.and_then(|t| self.mass_error(spectrum, t.theoretical_mz(), t.charge));
        let peptide_error = self.mass_error(spectrum, theoretical, assumption.charge);
        row.push(optional(tag_error.map(|e| e.da)));
        row.push(optional(tag_error.map(|e| e.ppm)));
        row.push(optional(peptide_error.map(|e| e.da)));
        row.push(optional(peptide_error.map(|e| e.ppm)));
        row.push(optional(peptide_error.map(|e| e.isotope)));
        row
    }

    fn mass_error(
        &self,
        spectrum: &SpectrumContext<'_>,
        theoretical_mz: f64,
        charge: i32,
    ) -> Option<MassError> {
        let precursor = spectrum.precursor.as_ref()?;
        Some(mass_error(
            precursor.mz,
            theoretical_mz,
            charge,
            self.settings.min_isotope..=self.settings.max_isotope,
        ))
    }

    pub fn write_tags<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let mut header: Vec<&str> = SPECTRUM_COLUMNS.to_vec();
        header.extend([
            "Rank",
            "Tag",
            "Longest Amino Acid Sequence",
            "Variable Modifications",
            "Modified Sequence",
        ]);
        header.extend(SCORE_COLUMNS);
        header.extend(["N-Gap", "C-Gap", "Theoretic m/z", "Identification Charge"]);
        writeln!(out, "{}", header.join(SEPARATOR))?;

        self.for_each_spectrum(|spectrum, merged| {
            let tags: Vec<&TagAssumption> =
                merged.into_iter().filter_map(Assumption::as_tag).collect();
            let selected = self.settings.select(tags, |t| t.scores.score);
            if selected.is_empty() {
                return writeln!(out);
            }
            for (position, tag) in selected.iter().enumerate() {
                let mut row = spectrum.columns();
                row.push((position + 1).to_string());
                row.push(tag.tag.as_sequence());
                row.push(tag.tag.longest_amino_acid_sequence());
                row.push(tag.tag.sequence.variable_modifications_summary());
                row.push(tag.tag.tagged_sequence(self.catalog));
                row.extend(score_columns(tag.engine, tag.scores));
                row.push(tag.tag.n_gap.to_string());
                row.push(tag.tag.c_gap.to_string());
                row.push(tag.theoretical_mz().to_string());
                row.push(tag.charge.to_string());
                writeln!(out, "{}", row.join(SEPARATOR))?;
            }
            Ok(())
        })
    }

    /// `>file;title;m/z;charges;rank score;score` then the longest residue
    /// stretch of the hit.
    pub fn write_blast<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.for_each_spectrum(|spectrum, merged| {
            let selected = self.settings.select(merged, |a| a.score());
            if selected.is_empty() {
                return writeln!(out);
            }
            let mut details = spectrum.columns();
            details[0] = format!(">{}", details[0]);
            let details = details.join(BLAST_SEPARATOR);
            for assumption in selected {
                let scores = assumption.scores();
                writeln!(
                    out,
                    "{}{sep}{}{sep}{}",
                    details,
                    optional(scores.rank_score),
                    scores.score,
                    sep = BLAST_SEPARATOR
                )?;
                let sequence = match assumption {
                    Assumption::Tag(t) => t.tag.longest_amino_acid_sequence(),
                    Assumption::Peptide(p) => p.peptide.sequence.sequence(),
                };
                writeln!(out, "{}", sequence)?;
            }
            Ok(())
        })
    }
}

struct SpectrumContext<'a> {
    spectrum_file: &'a str,
    title: &'a str,
    precursor: Option<Precursor>,
}

impl SpectrumContext<'_> {
    fn columns(&self) -> Vec<String> {
        vec![
            self.spectrum_file.to_string(),
            self.title.to_string(),
            optional(self.precursor.as_ref().map(|p| p.mz)),
            self.precursor
                .as_ref()
                .map(Precursor::charges_label)
                .unwrap_or_default(),
        ]
    }
}

/// Only the producing engine's columns are filled.
fn score_columns(engine: Engine, scores: AssumptionScores) -> [String; 3] {
    match engine {
        Engine::PepNovo => [optional(scores.rank_score), scores.score.to_string(), String::new()],
        Engine::Novor => [String::new(), String::new(), scores.score.to_string()],
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
