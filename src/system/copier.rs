//! Chunked stream copy with progress thresholds and cooperative cancellation

use crate::models::progress::{percent, JobEvent, ProgressReporter};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Bytes moved per read/write round
pub const CHUNK_SIZE: usize = 4096;

/// Cancellation request shared between the controlling thread and the copy loop
///
/// Setting or reading it never blocks, whatever the job is doing.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Byte-copy step used by the engine for every entry
pub trait StreamCopier: Send + Sync {
    /// Copy `source` into `dest`; `source_size` is the expected length of the source.
    ///
    /// Returns false on read/write failure, on a source shorter than announced, or when the
    /// strategy decides to abort. Final progress events are emitted either way.
    fn copy(
        &self,
        source: &mut dyn Read,
        dest: &mut dyn Write,
        source_size: u64,
        reporter: &mut ProgressReporter,
    ) -> bool;
}

/// Copier that runs every stream to completion
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCopier;

impl StreamCopier for PlainCopier {
    fn copy(
        &self,
        source: &mut dyn Read,
        dest: &mut dyn Write,
        source_size: u64,
        reporter: &mut ProgressReporter,
    ) -> bool {
        copy_chunks(source, dest, source_size, reporter, |_| true)
    }
}

/// Copier that polls a [`CancelFlag`] every `check_step` percent of the file in flight
#[derive(Debug, Clone)]
pub struct CancellableCopier {
    cancel: CancelFlag,
    check_step: u32,
}

impl CancellableCopier {
    pub fn new(cancel: CancelFlag, check_step: u32) -> Self {
        Self {
            cancel,
            check_step: check_step.clamp(1, 100),
        }
    }
}

impl StreamCopier for CancellableCopier {
    fn copy(
        &self,
        source: &mut dyn Read,
        dest: &mut dyn Write,
        source_size: u64,
        reporter: &mut ProgressReporter,
    ) -> bool {
        let mut next_check = self.check_step;
        copy_chunks(source, dest, source_size, reporter, |file_percent| {
            if file_percent < next_check {
                return true;
            }
            if self.cancel.is_set() {
                tracing::debug!("Cancellation observed at {}% of current file", file_percent);
                return false;
            }
            next_check = file_percent + self.check_step;
            true
        })
    }
}

/// Shared copy loop; `keep_going` sees the current file percent after every chunk
fn copy_chunks(
    source: &mut dyn Read,
    dest: &mut dyn Write,
    source_size: u64,
    reporter: &mut ProgressReporter,
    mut keep_going: impl FnMut(u32) -> bool,
) -> bool {
    let reporting = reporter.is_enabled();
    let file_step = reporter.settings().file_step;
    let overall_step = reporter.settings().overall_step;
    let mut next_file = file_step;
    let mut next_overall = reporter.counters().overall_percent() + overall_step;
    if reporting {
        reporter.emit(JobEvent::MaxPerFileProgress(100));
    }

    let mut file_bytes = 0u64;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut ok = true;
    loop {
        let read = match source.read(&mut buf) {
            Ok(0) => {
                if file_bytes < source_size {
                    tracing::debug!("Source ended at {} of {} bytes", file_bytes, source_size);
                    ok = false;
                }
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!("Read failed after {} bytes: {}", file_bytes, e);
                ok = false;
                break;
            }
        };
        if let Err(e) = dest.write_all(&buf[..read]) {
            tracing::debug!("Write failed after {} bytes: {}", file_bytes, e);
            ok = false;
            break;
        }
        file_bytes += read as u64;
        reporter.add_bytes(read as u64);

        let file_percent = percent(file_bytes, source_size);
        if reporting {
            let overall_percent = reporter.counters().overall_percent();
            if file_percent >= next_file {
                reporter.emit(JobEvent::PerFileProgress(file_percent));
                next_file = file_percent + file_step;
            }
            if overall_percent >= next_overall {
                reporter.emit(JobEvent::OverallProgress(overall_percent));
                next_overall = overall_percent + overall_step;
            }
        }
        if !keep_going(file_percent) {
            ok = false;
            break;
        }
    }

    if reporting {
        reporter.emit(JobEvent::PerFileProgress(100));
        reporter.emit(JobEvent::OverallProgress(
            reporter.counters().overall_percent(),
        ));
        let done = reporter.file_done();
        reporter.emit(JobEvent::FilesProgress(done));
    }
    ok
}
