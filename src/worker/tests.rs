use super::*;
use crate::models::job::OperationShape;
use std::fs;
use std::io::Write;
use tempfile::TempDir;
use zip::write::SimpleFileOptions as ZipFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn make_reporting_controller() -> JobController {
    JobController::with_settings(ReportSettings::new(true, 1, 1, 1))
}

/// Archive holding a single stored (uncompressed) entry of `size` bytes
fn write_big_archive(path: &Path, name: &str, size: usize) {
    let file = fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = ZipFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file(name, options).unwrap();
    let block: Vec<u8> = (0..64 * 1024).map(|i| (i % 253) as u8).collect();
    let mut written = 0;
    while written < size {
        let len = block.len().min(size - written);
        zip.write_all(&block[..len]).unwrap();
        written += len;
    }
    zip.finish().unwrap();
}

fn sample_tree(base: &Path) -> PathBuf {
    let root = base.join("src");
    fs::create_dir_all(root.join("a/b")).unwrap();
    fs::write(root.join("one.txt"), vec![1u8; 9_000]).unwrap();
    fs::write(root.join("a/two.txt"), vec![2u8; 17_000]).unwrap();
    fs::write(root.join("a/b/three.txt"), vec![3u8; 5_000]).unwrap();
    root
}

#[test]
fn test_unconfigured_run_is_noop_success() {
    let controller = JobController::new();
    let rx = controller.subscribe().unwrap();

    let result = controller.run();
    assert!(result.success());
    assert!(controller.succeeded());
    assert!(!controller.failed());
    assert!(controller.produced_paths().is_empty());

    let events: Vec<JobEvent> = rx.try_iter().collect();
    assert_eq!(
        events,
        vec![JobEvent::Finished {
            outcome: JobOutcome::Succeeded
        }]
    );
}

#[test]
fn test_empty_archive_path_never_touches_codec() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("f.txt");
    fs::write(&source, b"data").unwrap();

    let controller = JobController::new();
    controller
        .configure_compress(Path::new(""), &source, false, DirFilter::default())
        .unwrap();
    assert!(controller.run().success());
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn test_empty_file_list_is_noop() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("never.zip");
    let controller = JobController::new();
    controller.configure_compress_files(&archive, &[]).unwrap();
    assert!(controller.run().success());
    assert!(!archive.exists());
}

#[test]
fn test_compress_then_extract_directory() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(temp.path());
    let archive = temp.path().join("tree.zip");
    let dest = temp.path().join("out");

    let controller = JobController::new();
    controller
        .configure_compress(&archive, &root, true, DirFilter::default())
        .unwrap();
    let result = controller.run();
    assert_eq!(result.outcome, JobOutcome::Succeeded);
    assert!(result.produced.is_empty());

    controller.configure_extract(&archive, "", &dest).unwrap();
    let result = controller.run();
    assert!(result.success());
    assert_eq!(result.produced.len(), 3);
    assert_eq!(controller.produced_paths(), result.produced);
    assert_eq!(fs::read(dest.join("a/b/three.txt")).unwrap(), vec![3u8; 5_000]);
    assert_eq!(fs::read(dest.join("a/two.txt")).unwrap(), vec![2u8; 17_000]);
    assert_eq!(fs::read(dest.join("one.txt")).unwrap(), vec![1u8; 9_000]);
}

#[test]
fn test_failed_job_reports_error() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("missing.zip");
    let controller = JobController::new();
    controller
        .configure_extract_entries(&archive, &["a.txt".to_string()], temp.path())
        .unwrap();

    let result = controller.run();
    assert_eq!(result.outcome, JobOutcome::Failed);
    assert!(controller.failed());
    assert!(!controller.is_cancelled());
    assert!(result.error.is_some());
}

#[test]
fn test_event_ordering_for_reporting_job() {
    let temp = TempDir::new().unwrap();
    let root = sample_tree(temp.path());
    let archive = temp.path().join("tree.zip");

    let controller = make_reporting_controller();
    controller.set_file_step(10).unwrap();
    let rx = controller.subscribe().unwrap();
    controller
        .configure_compress(&archive, &root, true, DirFilter::default())
        .unwrap();
    assert!(controller.run().success());

    let events: Vec<JobEvent> = rx.try_iter().collect();
    assert_eq!(events.first(), Some(&JobEvent::MaxOverallProgress(100)));
    assert_eq!(events.get(1), Some(&JobEvent::MaxFilesProgress(3)));
    assert_eq!(
        events.last(),
        Some(&JobEvent::Finished {
            outcome: JobOutcome::Succeeded
        })
    );
    let finished = events
        .iter()
        .filter(|e| matches!(e, JobEvent::Finished { .. }))
        .count();
    assert_eq!(finished, 1);

    let overall: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::OverallProgress(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert!(overall.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(overall.last(), Some(&100));

    // per-file values restart at every MaxPerFileProgress and strictly increase until the
    // closing 100
    let mut last_per_file: Option<u32> = None;
    for event in &events {
        match event {
            JobEvent::MaxPerFileProgress(_) => last_per_file = None,
            JobEvent::PerFileProgress(v) => {
                if let Some(prev) = last_per_file {
                    assert!(*v > prev || (*v == 100 && prev == 100));
                }
                last_per_file = Some(*v);
            }
            _ => {}
        }
    }

    let files: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::FilesProgress(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(files, vec![1, 2, 3]);

    let changed = events
        .iter()
        .filter(|e| matches!(e, JobEvent::FileChanged(_)))
        .count();
    assert_eq!(changed, 3);
}

#[test]
fn test_configure_rejected_while_job_holds_lock() {
    let temp = TempDir::new().unwrap();
    let controller = JobController::new();
    let guard = controller.state.lock().unwrap();

    let err = controller
        .configure_extract(&temp.path().join("a.zip"), "", temp.path())
        .unwrap_err();
    assert!(matches!(err, ZipWorkerError::JobRunning));
    assert_eq!(guard.config.shape, OperationShape::None);
    assert!(guard.config.archive_path.as_os_str().is_empty());
    assert!(matches!(
        controller.enable_reporting(true),
        Err(ZipWorkerError::JobRunning)
    ));
    assert!(matches!(
        controller.subscribe(),
        Err(ZipWorkerError::JobRunning)
    ));

    // cancellation stays available
    controller.request_cancel();
    assert!(controller.is_cancelled());
    drop(guard);

    controller
        .configure_extract(&temp.path().join("a.zip"), "", temp.path())
        .unwrap();
}

#[test]
fn test_run_resets_cancel_flag() {
    let controller = JobController::new();
    controller.request_cancel();
    assert!(controller.is_cancelled());
    let result = controller.run();
    assert!(!controller.is_cancelled());
    assert!(result.success());
}

#[test]
fn test_steps_are_clamped() {
    let controller = JobController::new();
    controller.set_overall_step(0).unwrap();
    controller.set_file_step(500).unwrap();
    controller.set_cancel_check_step(42).unwrap();

    let state = controller.lock_state();
    let settings = state.reporter.settings();
    assert_eq!(settings.overall_step, 1);
    assert_eq!(settings.file_step, 100);
    assert_eq!(settings.cancel_check_step, 42);
}

#[test]
fn test_cancel_mid_extraction_deletes_partial_file() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("big.zip");
    write_big_archive(&archive, "big.bin", 64 * 1024 * 1024);
    let dest = temp.path().join("restored.bin");

    let controller = Arc::new(make_reporting_controller());
    let rx = controller.subscribe().unwrap();
    controller
        .configure_extract(&archive, "big.bin", &dest)
        .unwrap();
    let handle = Arc::clone(&controller).spawn().unwrap();

    // wait until the copy is under way
    for event in rx.iter() {
        if matches!(event, JobEvent::PerFileProgress(v) if v < 100) {
            break;
        }
    }
    controller.request_cancel();

    let result = handle.join().unwrap();
    assert_eq!(result.outcome, JobOutcome::Cancelled);
    assert!(!result.success());
    assert!(controller.is_cancelled());
    assert_eq!(controller.outcome(), JobOutcome::Cancelled);
    assert!(controller.produced_paths().is_empty());
    assert!(!dest.exists());

    let rest: Vec<JobEvent> = rx.try_iter().collect();
    assert_eq!(
        rest.last(),
        Some(&JobEvent::Finished {
            outcome: JobOutcome::Cancelled
        })
    );
}

#[test]
fn test_cancel_mid_compression_removes_archive() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("big.bin");
    fs::write(&source, vec![0x5au8; 48 * 1024 * 1024]).unwrap();
    let archive = temp.path().join("out.zip");

    let controller = Arc::new(make_reporting_controller());
    let rx = controller.subscribe().unwrap();
    controller
        .configure_compress(&archive, &source, false, DirFilter::default())
        .unwrap();
    let handle = Arc::clone(&controller).spawn().unwrap();

    for event in rx.iter() {
        if matches!(event, JobEvent::FileChanged(_)) {
            break;
        }
    }
    controller.request_cancel();

    let result = handle.join().unwrap();
    assert_eq!(result.outcome, JobOutcome::Cancelled);
    assert!(!archive.exists());
    assert!(source.exists());
}

#[test]
fn test_elapsed_recorded() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("f.txt");
    fs::write(&source, b"elapsed").unwrap();
    let controller = JobController::new();
    controller
        .configure_compress(&temp.path().join("f.zip"), &source, false, DirFilter::default())
        .unwrap();
    let result = controller.run();
    assert!(result.success());
    assert_eq!(controller.elapsed(), result.elapsed);
    assert_eq!(controller.result().outcome, JobOutcome::Succeeded);
}
