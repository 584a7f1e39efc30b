//! End-to-end batch run: discover spectrum files, run every engine on them,
//! parse what they wrote and export the merged results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, info_span, warn};

use crate::cancel::CancellationToken;
use crate::config::{validate_config, PepNovoFormat, RunConfig};
use crate::engine::Engine;
use crate::error::{ExportError, NovobatchError, Result};
use crate::export::{Exporter, Identification};
use crate::identification::{ModificationCatalog, ModificationResolver, RunStatistics};
use crate::parser::{open_parser, ParsedFile, ParserContext};
use crate::pipeline::{NoopProgress, ProgressEvent, ProgressReporter, RunPhase};
use crate::spectrum::{InMemorySpectra, SpectrumSource};
use crate::worker::{
    JobErrorHandler, JobResult, JobScheduler, JobStatus, LoggingErrorHandler, SpectrumScanner,
};

/// A result file to parse, with the spectrum file it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    pub engine: Engine,
    /// File name only, as used for spectrum lookups.
    pub spectrum_file_name: String,
    pub path: PathBuf,
}

impl ResultFile {
    /// Result files of every finished job.
    pub fn from_results(results: &[JobResult]) -> Vec<ResultFile> {
        results
            .iter()
            .filter(|r| r.is_success())
            .filter_map(|r| {
                r.output_file.as_ref().map(|path| ResultFile {
                    engine: r.engine,
                    spectrum_file_name: r.spectrum_file_name(),
                    path: path.clone(),
                })
            })
            .collect()
    }
}

/// Serializable view of one job outcome.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub job_id: String,
    pub engine: Engine,
    pub spectrum_file: PathBuf,
    pub status: JobStatus,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub output_tail: Vec<String>,
    pub elapsed_ms: u64,
}

impl From<&JobResult> for JobSummary {
    fn from(result: &JobResult) -> Self {
        Self {
            job_id: result.job_id.clone(),
            engine: result.engine,
            spectrum_file: result.spectrum_file.clone(),
            status: result.status,
            exit_code: result.exit_code,
            error: result.error.as_ref().map(|e| e.to_string()),
            output_tail: result.output_tail.clone(),
            elapsed_ms: result.elapsed.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RowErrorSummary {
    pub title: String,
    pub error: String,
}

/// What parsing one result file produced.
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub engine: Engine,
    pub spectrum_file: String,
    pub result_file: PathBuf,
    pub spectra: usize,
    pub no_solution: usize,
    pub row_errors: Vec<RowErrorSummary>,
    /// The whole file was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub cancelled: bool,
}

impl FileSummary {
    fn parsed(file: &ResultFile, parsed: &ParsedFile) -> Self {
        Self {
            engine: file.engine,
            spectrum_file: file.spectrum_file_name.clone(),
            result_file: file.path.clone(),
            spectra: parsed.matches.len(),
            no_solution: parsed.no_solution.len(),
            row_errors: parsed
                .errors
                .iter()
                .map(|e| RowErrorSummary {
                    title: e.title.clone(),
                    error: e.error.to_string(),
                })
                .collect(),
            failure: None,
            cancelled: parsed.cancelled,
        }
    }

    fn failed(file: &ResultFile, error: &NovobatchError) -> Self {
        Self {
            engine: file.engine,
            spectrum_file: file.spectrum_file_name.clone(),
            result_file: file.path.clone(),
            spectra: 0,
            no_solution: 0,
            row_errors: Vec::new(),
            failure: Some(error.to_string()),
            cancelled: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// Parsed results of a set of result files.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub identification: Identification,
    pub statistics: BTreeMap<Engine, RunStatistics>,
    pub files: Vec<FileSummary>,
    pub cancelled: bool,
}

/// Outcome of a whole run.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub spectrum_files: Vec<PathBuf>,
    pub jobs: Vec<JobSummary>,
    pub files: Vec<FileSummary>,
    pub statistics: BTreeMap<Engine, RunStatistics>,
    pub exports: Vec<PathBuf>,
    pub cancelled: bool,
    #[serde(skip)]
    pub identification: Identification,
}

impl BatchReport {
    pub fn failed_jobs(&self) -> impl Iterator<Item = &JobSummary> {
        self.jobs.iter().filter(|j| j.status == JobStatus::Error)
    }

    pub fn failed_files(&self) -> impl Iterator<Item = &FileSummary> {
        self.files.iter().filter(|f| !f.is_success())
    }

    /// Human-readable outcome, listing failures apart from successes.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        let finished = self.jobs.iter().filter(|j| j.status == JobStatus::Finished).count();
        let canceled = self.jobs.iter().filter(|j| j.status == JobStatus::Canceled).count();
        lines.push(format!(
            "Run {}: {} spectrum files, {} jobs ({} finished, {} failed, {} canceled)",
            self.run_id,
            self.spectrum_files.len(),
            self.jobs.len(),
            finished,
            self.failed_jobs().count(),
            canceled
        ));

        for file in self.files.iter().filter(|f| f.is_success()) {
            lines.push(format!(
                "  parsed {} {}: {} spectra, {} without solution, {} row errors",
                file.engine,
                file.spectrum_file,
                file.spectra,
                file.no_solution,
                file.row_errors.len()
            ));
        }
        for job in self.failed_jobs() {
            lines.push(format!(
                "  FAILED job {} {}: {}",
                job.engine,
                job.spectrum_file.display(),
                job.error.as_deref().unwrap_or("unknown error")
            ));
        }
        for file in self.failed_files() {
            lines.push(format!(
                "  FAILED parse {} {}: {}",
                file.engine,
                file.spectrum_file,
                file.failure.as_deref().unwrap_or_default()
            ));
        }
        for (engine, stats) in &self.statistics {
            lines.push(format!("  {}: {} assumptions", engine, stats.assumptions()));
        }
        if self.cancelled {
            lines.push("  run was cancelled".to_string());
        }
        lines.join("\n")
    }
}

/// One configured batch run.
pub struct BatchRun {
    config: RunConfig,
    catalog: Arc<ModificationCatalog>,
    spectra: Arc<dyn SpectrumSource>,
    progress: Arc<dyn ProgressReporter>,
    error_handler: Arc<dyn JobErrorHandler>,
}

impl BatchRun {
    /// Validates `config` and builds the modification catalog.
    pub fn new(config: RunConfig) -> Result<Self> {
        validate_config(&config)?;
        let catalog = ModificationCatalog::new(config.modifications.clone())?;
        Ok(Self {
            config,
            catalog: Arc::new(catalog),
            spectra: Arc::new(InMemorySpectra::new()),
            progress: Arc::new(NoopProgress),
            error_handler: Arc::new(LoggingErrorHandler),
        })
    }

    /// Spectrum metadata used for Novor titles and report columns.
    pub fn with_spectra(mut self, spectra: Arc<dyn SpectrumSource>) -> Self {
        self.spectra = spectra;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_error_handler(mut self, handler: Arc<dyn JobErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModificationCatalog {
        &self.catalog
    }

    fn phase(&self, phase: RunPhase, message: impl Into<String>) {
        self.progress.report(ProgressEvent::Phase {
            phase,
            message: message.into(),
        });
    }

    pub fn run(&self, cancel: &CancellationToken) -> Result<BatchReport> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let _span = info_span!("batch", run_id = %run_id).entered();

        self.phase(RunPhase::Discovering, "Looking for spectrum files");
        let spectrum_files = SpectrumScanner::new(&self.config.spectrum_inputs).scan()?;
        info!("Found {} spectrum files", spectrum_files.len());

        let results = self.sequence(&spectrum_files, cancel)?;
        let jobs: Vec<JobSummary> = results.iter().map(JobSummary::from).collect();

        let outcome = self.parse(&ResultFile::from_results(&results), cancel);

        let mut exports = Vec::new();
        if cancel.is_cancelled() {
            warn!("Run cancelled, skipping export");
        } else {
            exports = self.export(&outcome.identification, &self.config.output_folder)?;
        }

        let cancelled = cancel.is_cancelled() || outcome.cancelled;
        self.phase(RunPhase::Completed, if cancelled { "Cancelled" } else { "Done" });

        Ok(BatchReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            spectrum_files,
            jobs,
            files: outcome.files,
            statistics: outcome.statistics,
            exports,
            cancelled,
            identification: outcome.identification,
        })
    }

    /// Runs every configured engine on `spectrum_files`.
    pub fn sequence(
        &self,
        spectrum_files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Vec<JobResult>> {
        let _span = info_span!("sequencing", files = spectrum_files.len()).entered();
        self.phase(
            RunPhase::Sequencing,
            format!("Running {} engines", self.config.engines().len()),
        );

        let jobs = JobScheduler::plan(&self.config, &self.catalog, spectrum_files)?;
        let scheduler =
            JobScheduler::new(self.config.threads).with_policy(self.config.failure_policy);
        let results = scheduler.run(
            &jobs,
            cancel,
            Arc::clone(&self.progress),
            self.error_handler.as_ref(),
        )?;
        Ok(results)
    }

    /// Indexes and parses `files` one after the other. A file that cannot
    /// be parsed is recorded and skipped.
    pub fn parse(&self, files: &[ResultFile], cancel: &CancellationToken) -> ParseOutcome {
        let _span = info_span!("parsing", files = files.len()).entered();
        self.phase(RunPhase::Parsing, format!("Parsing {} result files", files.len()));

        let resolver = ModificationResolver::new(
            Arc::clone(&self.catalog),
            self.config.fragment_tolerance_da(),
        );
        let default_format = PepNovoFormat::default();
        let pepnovo_format = self
            .config
            .pepnovo
            .as_ref()
            .map(|p| &p.format)
            .unwrap_or(&default_format);
        let context = ParserContext {
            resolver: &resolver,
            spectra: self.spectra.as_ref(),
            pepnovo_format,
            cancel,
            progress: self.progress.as_ref(),
        };

        let mut outcome = ParseOutcome::default();
        for file in files {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            // A file that fails partway must not leave its ranges behind
            let mut stats = RunStatistics::default();
            match parse_file(file, &context, &mut stats, cancel) {
                Ok(parsed) => {
                    outcome.statistics.entry(file.engine).or_default().merge(&stats);
                    outcome.cancelled |= parsed.cancelled;
                    outcome.files.push(FileSummary::parsed(file, &parsed));
                    outcome.identification.extend(parsed.matches);
                }
                Err(e) => {
                    warn!("Skipping {} results {}: {}", file.engine, file.path.display(), e);
                    outcome.files.push(FileSummary::failed(file, &e));
                }
            }
        }
        outcome
    }

    /// Writes every configured report into `folder`.
    pub fn export(
        &self,
        identification: &Identification,
        folder: &Path,
    ) -> std::result::Result<Vec<PathBuf>, ExportError> {
        let _span = info_span!("exporting").entered();
        self.phase(RunPhase::Exporting, "Writing reports");

        let settings = &self.config.export;
        let exporter = Exporter::new(
            identification,
            self.spectra.as_ref(),
            &self.catalog,
            settings,
            self.config.fragment_tolerance_da(),
        );
        settings
            .kinds
            .iter()
            .map(|kind| exporter.export(*kind, &folder.join(kind.file_name())))
            .collect()
    }
}

fn parse_file(
    file: &ResultFile,
    context: &ParserContext<'_>,
    stats: &mut RunStatistics,
    cancel: &CancellationToken,
) -> Result<ParsedFile> {
    let parser = open_parser(file.engine, &file.path, &file.spectrum_file_name, context)?;
    info!(
        "Indexed {} spectra in {}",
        parser.index().len(),
        file.path.display()
    );
    let parsed = parser.all_spectrum_matches(stats, cancel, context.progress)?;
    Ok(parsed)
}
