use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::engine::{Engine, EngineCommand};
use crate::error::JobError;
use crate::pipeline::{ProgressEvent, ProgressReporter};
use crate::worker::job::{JobResult, JobStatus};

/// Poll interval for process exit and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Engine output lines kept for error reports.
const OUTPUT_TAIL_LINES: usize = 200;

/// One engine run over one spectrum file.
pub struct ProcessJob {
    id: String,
    spectrum_file: PathBuf,
    command: EngineCommand,
    status: Mutex<JobStatus>,
    cancelled: AtomicBool,
    child: Mutex<Option<Child>>,
}

impl ProcessJob {
    pub fn new(spectrum_file: PathBuf, command: EngineCommand) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            spectrum_file,
            command,
            status: Mutex::new(JobStatus::Waiting),
            cancelled: AtomicBool::new(false),
            child: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn engine(&self) -> Engine {
        self.command.engine
    }

    pub fn spectrum_file(&self) -> &Path {
        &self.spectrum_file
    }

    pub fn command(&self) -> &EngineCommand {
        &self.command
    }

    pub fn status(&self) -> JobStatus {
        self.status
            .lock()
            .map(|s| *s)
            .unwrap_or(JobStatus::Error)
    }

    /// The result file, once the job finished.
    pub fn output_file(&self) -> Option<&Path> {
        (self.status() == JobStatus::Finished).then_some(self.command.output_file.as_path())
    }

    /// Moves to `next` unless the current status forbids it. Terminal
    /// statuses never change.
    fn transition(&self, next: JobStatus) -> bool {
        match self.status.lock() {
            Ok(mut status) if status.can_become(next) => {
                *status = next;
                true
            }
            _ => false,
        }
    }

    /// Stops the job. Safe to call from any thread, any number of times.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut status) = self.status.lock() {
            match *status {
                JobStatus::Waiting => {
                    *status = JobStatus::Canceled;
                    return;
                }
                JobStatus::Running => {}
                _ => return,
            }
        }
        // The running loop sees the flag and reports the cancellation
        if let Ok(mut guard) = self.child.lock() {
            if let Some(child) = guard.as_mut() {
                if let Err(e) = child.kill() {
                    debug!("Kill of job {} failed: {}", self.id, e);
                }
            }
        }
    }

    /// Marks a job that was never dispatched as canceled.
    pub fn skip(&self) -> JobResult {
        self.cancelled.store(true, Ordering::SeqCst);
        self.transition(JobStatus::Canceled);
        JobResult::canceled(&self.id, self.engine(), &self.spectrum_file)
    }

    fn is_cancelled(&self, run: &CancellationToken) -> bool {
        self.cancelled.load(Ordering::SeqCst) || run.is_cancelled()
    }

    fn report(&self, progress: &dyn ProgressReporter, status: JobStatus, started: Instant) {
        progress.report(ProgressEvent::Job {
            job_id: self.id.clone(),
            engine: self.engine(),
            spectrum_file: self.spectrum_file.display().to_string(),
            status,
            elapsed_ms: started.elapsed().as_millis() as u64,
        });
    }

    /// Runs the engine to completion on the calling thread.
    pub fn start(&self, run: &CancellationToken, progress: &dyn ProgressReporter) -> JobResult {
        let started = Instant::now();

        if self.is_cancelled(run) || !self.transition(JobStatus::Running) {
            self.transition(JobStatus::Canceled);
            self.report(progress, JobStatus::Canceled, started);
            return JobResult::canceled(&self.id, self.engine(), &self.spectrum_file);
        }
        self.report(progress, JobStatus::Running, started);
        info!(
            "Starting {} on {}: {}",
            self.engine(),
            self.spectrum_file.display(),
            self.command.command_line()
        );

        let mut tail = OutputTail::default();
        let outcome = self.execute(run, &mut tail);

        let result = match outcome {
            Ok(Outcome::Finished(code)) => {
                if code != Some(0) {
                    warn!(
                        "{} exited with status {:?} on {} but wrote its output",
                        self.engine(),
                        code,
                        self.spectrum_file.display()
                    );
                }
                JobResult::finished(
                    &self.id,
                    self.engine(),
                    &self.spectrum_file,
                    self.command.output_file.clone(),
                    code,
                )
            }
            Ok(Outcome::Canceled) => {
                info!("{} on {} canceled", self.engine(), self.spectrum_file.display());
                JobResult::canceled(&self.id, self.engine(), &self.spectrum_file)
            }
            Err((error, code)) => {
                error!(
                    "{} failed on {}: {}",
                    self.engine(),
                    self.spectrum_file.display(),
                    error
                );
                let mut result =
                    JobResult::failure(&self.id, self.engine(), &self.spectrum_file, error);
                result.exit_code = code;
                result
            }
        };

        self.transition(result.status);
        self.report(progress, result.status, started);
        result
            .with_tail(tail.into_lines())
            .with_elapsed(started.elapsed())
    }

    fn execute(
        &self,
        run: &CancellationToken,
        tail: &mut OutputTail,
    ) -> Result<Outcome, (JobError, Option<i32>)> {
        let engine = self.engine();
        let fail = |error: JobError| -> (JobError, Option<i32>) { (error, None) };

        let output_file = &self.command.output_file;
        if let Some(parent) = output_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                fail(JobError::CreateOutput {
                    path: parent.to_path_buf(),
                    source: e,
                })
            })?;
        }

        for file in &self.command.auxiliary_files {
            std::fs::write(&file.path, &file.contents).map_err(|e| {
                fail(JobError::WriteParameters {
                    engine,
                    path: file.path.clone(),
                    source: e,
                })
            })?;
        }

        let stdout_sink = if self.command.stdout_to_output {
            let file = File::create(output_file).map_err(|e| {
                fail(JobError::CreateOutput {
                    path: output_file.clone(),
                    source: e,
                })
            })?;
            Some(file)
        } else {
            // A stale result must not pass for this run's output
            if output_file.is_file() {
                std::fs::remove_file(output_file).map_err(|e| {
                    fail(JobError::CreateOutput {
                        path: output_file.clone(),
                        source: e,
                    })
                })?;
            }
            None
        };

        let mut child = self
            .command
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                fail(JobError::Launch {
                    engine,
                    program: self.command.program.clone(),
                    source: e,
                })
            })?;

        let (line_tx, line_rx) = unbounded::<String>();
        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        let mut stdout_copy = None;

        if let Some(stdout) = child.stdout.take() {
            match stdout_sink {
                Some(sink) => stdout_copy = Some(thread::spawn(move || copy_to_file(stdout, sink))),
                None => readers.push(spawn_line_reader(stdout, line_tx.clone())),
            }
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, line_tx.clone()));
        }
        drop(line_tx);

        match self.child.lock() {
            Ok(mut guard) => *guard = Some(child),
            Err(_) => {
                let _ = child.kill();
                return Err(fail(JobError::Wait {
                    engine,
                    source: std::io::Error::other("process handle lock poisoned"),
                }));
            }
        }

        let status = loop {
            if self.is_cancelled(run) {
                self.kill_child();
                // Reader threads are left to finish on their own
                drain(&line_rx, tail, engine);
                return Ok(Outcome::Canceled);
            }

            match self.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    self.kill_child();
                    return Err(fail(JobError::Wait { engine, source: e }));
                }
            }

            match line_rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => tail.push(engine, line),
                Err(RecvTimeoutError::Timeout) => {}
                // Both streams closed, keep polling for the exit status
                Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
            }
        };

        for reader in readers {
            if reader.join().is_err() {
                warn!("Output reader for job {} panicked", self.id);
            }
        }
        drain(&line_rx, tail, engine);

        if let Some(handle) = stdout_copy {
            match handle.join() {
                Ok(Ok(bytes)) => debug!("Wrote {} bytes to {}", bytes, output_file.display()),
                Ok(Err(e)) => warn!("Failed to write {}: {}", output_file.display(), e),
                Err(_) => warn!("Output writer for job {} panicked", self.id),
            }
        }

        self.classify(status)
    }

    fn classify(&self, status: ExitStatus) -> Result<Outcome, (JobError, Option<i32>)> {
        let code = status.code();
        let output_exists = self.command.output_file.is_file();
        match code {
            Some(_) if output_exists => Ok(Outcome::Finished(code)),
            // Killed by a signal, or exited without producing anything
            _ => Err((
                JobError::UnexpectedExit {
                    engine: self.engine(),
                    code,
                    output: self.command.output_file.clone(),
                },
                code,
            )),
        }
    }

    fn try_wait(&self) -> std::io::Result<Option<ExitStatus>> {
        match self.child.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(child) => child.try_wait(),
                None => Ok(None),
            },
            Err(_) => Err(std::io::Error::other("process handle lock poisoned")),
        }
    }

    fn kill_child(&self) {
        if let Ok(mut guard) = self.child.lock() {
            if let Some(child) = guard.as_mut() {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}

enum Outcome {
    Finished(Option<i32>),
    Canceled,
}

/// Ring buffer of the most recent engine output lines.
#[derive(Default)]
struct OutputTail {
    lines: VecDeque<String>,
}

impl OutputTail {
    fn push(&mut self, engine: Engine, line: String) {
        debug!("[{}] {}", engine, line);
        if self.lines.len() == OUTPUT_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

fn drain(receiver: &Receiver<String>, tail: &mut OutputTail, engine: Engine) {
    while let Ok(line) = receiver.try_recv() {
        tail.push(engine, line);
    }
}

fn spawn_line_reader<R>(stream: R, sender: Sender<String>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.split(b'\n') {
            let Ok(bytes) = line else { break };
            let text = String::from_utf8_lossy(&bytes).trim_end_matches('\r').to_string();
            if sender.send(text).is_err() {
                break;
            }
        }
    })
}

fn copy_to_file<R: Read>(mut stream: R, file: File) -> std::io::Result<u64> {
    let mut writer = BufWriter::new(file);
    let bytes = std::io::copy(&mut stream, &mut writer)?;
    writer.flush()?;
    Ok(bytes)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::pipeline::NoopProgress;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn shell_job(script: &str, output_file: PathBuf, stdout_to_output: bool) -> ProcessJob {
        let mut command = EngineCommand::new(Engine::Novor, "/bin/sh", output_file.clone());
        command.stdout_to_output = stdout_to_output;
        command.arg("-c").arg(script).arg(&output_file);
        ProcessJob::new(PathBuf::from("/data/run1.mgf"), command)
    }

    #[test]
    fn test_stdout_streamed_to_output_file() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("run1.mgf.out");
        let job = shell_job("echo '>> 1 0 title (SQS 0.9)'; echo warn >&2", output.clone(), true);

        let result = job.start(&CancellationToken::new(), &NoopProgress);

        assert_eq!(result.status, JobStatus::Finished);
        assert_eq!(job.status(), JobStatus::Finished);
        assert_eq!(job.output_file(), Some(output.as_path()));
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            ">> 1 0 title (SQS 0.9)\n"
        );
        assert_eq!(result.output_tail, vec!["warn".to_string()]);
    }

    #[test]
    fn test_engine_written_output_with_merged_streams() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("run1.novor.csv");
        let job = shell_job(
            "echo started; echo oops >&2; echo '# id' > \"$0\"; exit 3",
            output.clone(),
            false,
        );

        let result = job.start(&CancellationToken::new(), &NoopProgress);

        // Non-zero exit with output present still counts as finished
        assert_eq!(result.status, JobStatus::Finished);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.output_tail.len(), 2);
        assert!(result.output_tail.contains(&"started".to_string()));
        assert!(result.output_tail.contains(&"oops".to_string()));
    }

    #[test]
    fn test_missing_output_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("run1.novor.csv");
        let job = shell_job("echo fatal >&2; exit 1", output, false);

        let result = job.start(&CancellationToken::new(), &NoopProgress);

        assert_eq!(result.status, JobStatus::Error);
        assert!(matches!(
            result.error,
            Some(JobError::UnexpectedExit { code: Some(1), .. })
        ));
        assert_eq!(result.output_tail, vec!["fatal".to_string()]);
    }

    #[test]
    fn test_launch_failure_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let command = EngineCommand::new(
            Engine::PepNovo,
            temp_dir.path().join("does-not-exist"),
            temp_dir.path().join("out.mgf.out"),
        );
        let job = ProcessJob::new(PathBuf::from("run1.mgf"), command);

        let result = job.start(&CancellationToken::new(), &NoopProgress);

        assert_eq!(result.status, JobStatus::Error);
        assert!(matches!(result.error, Some(JobError::Launch { .. })));
    }

    #[test]
    fn test_cancel_kills_running_process() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("slow.novor.csv");
        let job = Arc::new(shell_job("exec sleep 30", output, false));

        let runner = Arc::clone(&job);
        let handle = thread::spawn(move || runner.start(&CancellationToken::new(), &NoopProgress));

        while job.status() != JobStatus::Running {
            thread::sleep(Duration::from_millis(10));
        }
        thread::sleep(Duration::from_millis(100));
        let started = Instant::now();
        job.cancel();
        job.cancel();

        let result = handle.join().unwrap();
        assert_eq!(result.status, JobStatus::Canceled);
        assert_eq!(job.status(), JobStatus::Canceled);
        assert!(job.output_file().is_none());
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_run_cancellation_before_start() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("never.novor.csv");
        let job = shell_job("echo ran > \"$0\"", output.clone(), false);
        let run = CancellationToken::new();
        run.cancel();

        let result = job.start(&run, &NoopProgress);

        assert_eq!(result.status, JobStatus::Canceled);
        assert!(!output.exists());
    }

    #[test]
    fn test_auxiliary_files_written_before_launch() {
        let temp_dir = TempDir::new().unwrap();
        let params = temp_dir.path().join("params.txt");
        let output = temp_dir.path().join("copy.novor.csv");
        let mut job = shell_job("cat \"$1\" > \"$0\"", output.clone(), false);
        job.command.arg(&params);
        job.command.auxiliary_files.push(crate::engine::AuxiliaryFile {
            path: params.clone(),
            contents: "enzyme = Trypsin\n".to_string(),
        });

        let result = job.start(&CancellationToken::new(), &NoopProgress);

        assert_eq!(result.status, JobStatus::Finished);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "enzyme = Trypsin\n"
        );
    }

    #[test]
    fn test_output_tail_is_bounded() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("noisy.novor.csv");
        let job = shell_job(
            "i=0; while [ $i -lt 250 ]; do echo line$i; i=$((i+1)); done; : > \"$0\"",
            output,
            false,
        );

        let result = job.start(&CancellationToken::new(), &NoopProgress);

        assert_eq!(result.status, JobStatus::Finished);
        assert_eq!(result.output_tail.len(), OUTPUT_TAIL_LINES);
        assert_eq!(result.output_tail.last().map(String::as_str), Some("line249"));
        assert_eq!(result.output_tail.first().map(String::as_str), Some("line50"));
    }
}
