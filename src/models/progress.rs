//! Progress model
//!
//! Counters, emission thresholds and the event stream consumed by the controlling side.

use crate::models::result::JobOutcome;
use std::path::PathBuf;
use std::sync::mpsc::Sender;

/// Default overall emission step, in percent
pub const DEFAULT_OVERALL_STEP: u32 = 1;
/// Default per-file emission step, in percent
pub const DEFAULT_FILE_STEP: u32 = 5;
/// Default cancellation check step, in percent of the file in flight
pub const DEFAULT_CANCEL_CHECK_STEP: u32 = 5;

/// Clamp a percent step to [1, 100]
pub fn clamp_step(percent: u32) -> u32 {
    percent.clamp(1, 100)
}

/// `done * 100 / total` with integer division; a zero total reads as complete
pub fn percent(done: u64, total: u64) -> u32 {
    if total == 0 {
        return 100;
    }
    u32::try_from(done.saturating_mul(100) / total).unwrap_or(u32::MAX)
}

/// Progress reporting settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    /// Progress computation and emission enabled
    pub enabled: bool,
    /// Overall progress emission step
    pub overall_step: u32,
    /// Per-file progress emission step
    pub file_step: u32,
    /// Cancellation check step
    pub cancel_check_step: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            overall_step: DEFAULT_OVERALL_STEP,
            file_step: DEFAULT_FILE_STEP,
            cancel_check_step: DEFAULT_CANCEL_CHECK_STEP,
        }
    }
}

impl ReportSettings {
    pub fn new(enabled: bool, overall_step: u32, file_step: u32, cancel_check_step: u32) -> Self {
        Self {
            enabled,
            overall_step: clamp_step(overall_step),
            file_step: clamp_step(file_step),
            cancel_check_step: clamp_step(cancel_check_step),
        }
    }
}

/// Total bytes and file count of a job source or target set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteCount {
    pub bytes: u64,
    pub files: usize,
}

impl ByteCount {
    pub fn new(bytes: u64, files: usize) -> Self {
        Self { bytes, files }
    }
}

/// Byte and file counters of the running job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressCounters {
    /// Bytes copied so far across the job
    pub current_bytes: u64,
    /// Bytes expected for the job
    pub total_bytes: u64,
    /// Files processed so far
    pub current_files: usize,
    /// Files expected for the job
    pub total_files: usize,
}

impl ProgressCounters {
    pub fn overall_percent(&self) -> u32 {
        percent(self.current_bytes, self.total_bytes)
    }
}

/// Notification emitted to the controlling side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// Maximum of the per-file progress (always 100)
    MaxPerFileProgress(u32),
    /// Maximum of the overall progress (always 100)
    MaxOverallProgress(u32),
    /// Number of files the job expects to process
    MaxFilesProgress(usize),
    /// Percent done of the current file
    PerFileProgress(u32),
    /// Percent done of the whole job
    OverallProgress(u32),
    /// Files processed so far
    FilesProgress(usize),
    /// File now being written
    FileChanged(PathBuf),
    /// End of job, emitted exactly once per run
    Finished { outcome: JobOutcome },
}

/// Progress state handed by `&mut` to the engine and the copier for one job
#[derive(Debug, Default)]
pub struct ProgressReporter {
    settings: ReportSettings,
    counters: ProgressCounters,
    events: Option<Sender<JobEvent>>,
}

impl ProgressReporter {
    pub fn new(settings: ReportSettings, events: Option<Sender<JobEvent>>) -> Self {
        Self {
            settings,
            counters: ProgressCounters::default(),
            events,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub fn counters(&self) -> &ProgressCounters {
        &self.counters
    }

    pub fn settings_mut(&mut self) -> &mut ReportSettings {
        &mut self.settings
    }

    /// Replace the event channel
    pub fn set_sender(&mut self, events: Option<Sender<JobEvent>>) {
        self.events = events;
    }

    /// Reset counters, install the job totals and announce the maxima
    pub fn begin_job(&mut self, totals: ByteCount) {
        self.counters = ProgressCounters {
            current_bytes: 0,
            total_bytes: totals.bytes,
            current_files: 0,
            total_files: totals.files,
        };
        self.emit(JobEvent::MaxOverallProgress(100));
        self.emit(JobEvent::MaxFilesProgress(totals.files));
    }

    pub fn reset(&mut self) {
        self.counters = ProgressCounters::default();
    }

    pub fn add_bytes(&mut self, bytes: u64) {
        self.counters.current_bytes = self.counters.current_bytes.saturating_add(bytes);
    }

    /// Count one more processed file, clamped to the expected total
    pub fn file_done(&mut self) -> usize {
        self.counters.current_files += 1;
        self.counters.current_files.min(self.counters.total_files)
    }

    /// Send a progress event when reporting is enabled
    pub fn emit(&self, event: JobEvent) {
        if self.settings.enabled {
            self.notify(event);
        }
    }

    /// Send an event regardless of the reporting setting
    pub fn notify(&self, event: JobEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}
