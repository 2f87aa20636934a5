//! Job controller
//!
//! Owns the configuration, progress state and result of one job at a time. Configuration and
//! result live under a single mutex held by [`JobController::run`] for the whole job; the cancel
//! flag sits outside it so a cancel request never waits for the job.

use crate::models::job::{DirFilter, JobConfiguration, JobMode};
use crate::models::progress::{clamp_step, JobEvent, ProgressReporter, ReportSettings};
use crate::models::result::{JobOutcome, JobResult};
use crate::system::copier::{CancelFlag, CancellableCopier};
use crate::system::engine::ArchiveTaskEngine;
use crate::system::filesystem::FileSystem;
use crate::utils::error::{Result, ZipWorkerError};
use crate::utils::formatter::format_elapsed;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Everything guarded by the job lock
#[derive(Debug, Default)]
struct JobState {
    config: JobConfiguration,
    reporter: ProgressReporter,
    result: JobResult,
}

/// Runs compress/extract jobs and exposes their progress and outcome
#[derive(Debug, Default)]
pub struct JobController {
    state: Mutex<JobState>,
    cancel: CancelFlag,
}

impl JobController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ReportSettings) -> Self {
        Self {
            state: Mutex::new(JobState {
                reporter: ProgressReporter::new(settings, None),
                ..JobState::default()
            }),
            cancel: CancelFlag::new(),
        }
    }

    /// Blocking access, used by `run` and the result accessors
    fn lock_state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Non-blocking access for configuration; fails while a job holds the lock
    fn try_state(&self) -> Result<MutexGuard<'_, JobState>> {
        match self.state.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(ZipWorkerError::JobRunning),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
        }
    }

    fn configure(&self, config: JobConfiguration) -> Result<()> {
        let mut state = self.try_state()?;
        tracing::debug!(
            "Configured {} ({}) for {}",
            config.mode.name(),
            config.shape.name(),
            config.archive_path.display()
        );
        state.config = config;
        Ok(())
    }

    /// Compress a file, or a directory (an empty `source` is the working directory)
    pub fn configure_compress(
        &self,
        archive: &Path,
        source: &Path,
        recursive: bool,
        filter: DirFilter,
    ) -> Result<()> {
        self.configure(JobConfiguration::compress(archive, source, recursive, filter))
    }

    pub fn configure_compress_files(&self, archive: &Path, files: &[PathBuf]) -> Result<()> {
        self.configure(JobConfiguration::compress_files(archive, files))
    }

    /// Extract one entry, or the whole archive when `entry` is empty
    pub fn configure_extract(&self, archive: &Path, entry: &str, dest: &Path) -> Result<()> {
        self.configure(JobConfiguration::extract(archive, entry, dest))
    }

    /// Extract named entries, or the whole archive when `entries` is empty
    pub fn configure_extract_entries(
        &self,
        archive: &Path,
        entries: &[String],
        dest: &Path,
    ) -> Result<()> {
        self.configure(JobConfiguration::extract_entries(archive, entries, dest))
    }

    /// Toggle progress reporting; counters restart from zero
    pub fn enable_reporting(&self, enabled: bool) -> Result<()> {
        let mut state = self.try_state()?;
        state.reporter.settings_mut().enabled = enabled;
        state.reporter.reset();
        Ok(())
    }

    pub fn set_overall_step(&self, percent: u32) -> Result<()> {
        self.try_state()?.reporter.settings_mut().overall_step = clamp_step(percent);
        Ok(())
    }

    pub fn set_file_step(&self, percent: u32) -> Result<()> {
        self.try_state()?.reporter.settings_mut().file_step = clamp_step(percent);
        Ok(())
    }

    pub fn set_cancel_check_step(&self, percent: u32) -> Result<()> {
        self.try_state()?.reporter.settings_mut().cancel_check_step = clamp_step(percent);
        Ok(())
    }

    /// Install a fresh event channel; events of earlier subscriptions stop
    pub fn subscribe(&self) -> Result<Receiver<JobEvent>> {
        let (tx, rx) = mpsc::channel();
        self.try_state()?.reporter.set_sender(Some(tx));
        Ok(rx)
    }

    /// Run the configured job on the calling thread
    ///
    /// Emits `Finished` exactly once and returns a copy of the stored result.
    pub fn run(&self) -> JobResult {
        let mut state = self.lock_state();
        self.cancel.reset();
        state.result = JobResult::default();
        state.reporter.reset();
        let start = Instant::now();

        let JobState {
            config,
            reporter,
            result,
        } = &mut *state;
        let copier =
            CancellableCopier::new(self.cancel.clone(), reporter.settings().cancel_check_step);
        let outcome = ArchiveTaskEngine::new(&copier, reporter).run(config);

        let cancelled = self.cancel.is_set();
        match outcome {
            Ok(produced) if !cancelled => {
                result.outcome = JobOutcome::Succeeded;
                result.produced = produced;
            }
            Ok(produced) => {
                if config.is_runnable() {
                    roll_back(config, &produced);
                }
                result.outcome = JobOutcome::Cancelled;
                result.error = Some(ZipWorkerError::Cancelled.to_string());
            }
            Err(e) if cancelled => {
                tracing::debug!("Job stopped by cancellation: {}", e);
                result.outcome = JobOutcome::Cancelled;
                result.error = Some(ZipWorkerError::Cancelled.to_string());
            }
            Err(e) => {
                tracing::warn!("Job failed: {}", e);
                result.outcome = JobOutcome::Failed;
                result.error = Some(e.to_string());
            }
        }
        result.elapsed = start.elapsed();

        tracing::info!(
            "Job {} after {}",
            result.outcome.name(),
            format_elapsed(result.elapsed)
        );
        reporter.notify(JobEvent::Finished {
            outcome: result.outcome,
        });
        result.clone()
    }

    /// Run the configured job on a dedicated worker thread
    pub fn spawn(self: Arc<Self>) -> Result<JoinHandle<JobResult>> {
        let handle = std::thread::Builder::new()
            .name("zipworker-job".to_string())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Ask the running job to stop at its next cancellation check
    pub fn request_cancel(&self) {
        tracing::debug!("Cancellation requested");
        self.cancel.request();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_set()
    }

    pub fn succeeded(&self) -> bool {
        self.lock_state().result.success()
    }

    pub fn failed(&self) -> bool {
        !self.succeeded()
    }

    pub fn outcome(&self) -> JobOutcome {
        self.lock_state().result.outcome
    }

    /// Absolute paths of the files the last extraction produced
    pub fn produced_paths(&self) -> Vec<PathBuf> {
        self.lock_state().result.produced.clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.lock_state().result.elapsed
    }

    pub fn result(&self) -> JobResult {
        self.lock_state().result.clone()
    }
}

/// Remove the output of a job that completed after cancellation was requested
fn roll_back(config: &JobConfiguration, produced: &[PathBuf]) {
    let fs = FileSystem::new();
    match config.mode {
        JobMode::Compress => {
            tracing::info!("Removing cancelled archive {}", config.archive_path.display());
            fs.remove_files(&[config.archive_path.clone()]);
        }
        JobMode::Extract => {
            tracing::info!("Removing {} file(s) of a cancelled extraction", produced.len());
            fs.remove_files(produced);
        }
    }
}

#[cfg(test)]
mod tests;
