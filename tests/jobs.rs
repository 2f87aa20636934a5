use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;
use zip::write::SimpleFileOptions as ZipFileOptions;
use zip::ZipWriter;
use zipworker::models::JobEvent;
use zipworker::system::engine;
use zipworker::{DirFilter, JobController, JobOutcome, ReportSettings};

fn write_fixture(path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(path).expect("create fixture");
    let mut zip = ZipWriter::new(file);
    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, ZipFileOptions::default())
                .expect("add dir");
        } else {
            zip.start_file(*name, ZipFileOptions::default())
                .expect("start file");
            zip.write_all(content.as_bytes()).expect("write entry");
        }
    }
    zip.finish().expect("finish fixture");
}

#[test]
fn single_file_round_trip_on_worker_thread() {
    let temp = tempdir().expect("create tempdir");
    let source = temp.path().join("notes.txt");
    let content = "line of text\n".repeat(2_000);
    fs::write(&source, &content).expect("write source");
    let archive = temp.path().join("out/notes.zip");

    let controller = Arc::new(JobController::with_settings(ReportSettings::new(true, 1, 5, 5)));
    let events = controller.subscribe().expect("subscribe");
    controller
        .configure_compress(&archive, &source, false, DirFilter::default())
        .expect("configure compress");
    let result = Arc::clone(&controller)
        .spawn()
        .expect("spawn")
        .join()
        .expect("join");
    assert_eq!(result.outcome, JobOutcome::Succeeded);
    assert_eq!(
        engine::list_entries(&archive).expect("list"),
        vec!["notes.txt".to_string()]
    );

    let per_file: Vec<u32> = events
        .try_iter()
        .filter_map(|e| match e {
            JobEvent::PerFileProgress(v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(per_file.last(), Some(&100));

    let dest = temp.path().join("back/notes.txt");
    controller
        .configure_extract(&archive, "notes.txt", &dest)
        .expect("configure extract");
    let result = controller.run();
    assert!(result.success());
    assert_eq!(result.produced, vec![dest.clone()]);
    assert_eq!(fs::read_to_string(&dest).expect("read back"), content);
}

#[test]
fn missing_entry_sizes_whole_archive_then_fails() {
    let temp = tempdir().expect("create tempdir");
    let archive = temp.path().join("fixture.zip");
    write_fixture(
        &archive,
        &[("x.txt", "0123456789"), ("dir/", ""), ("dir/y.txt", "abcdefghijklmnopqrst")],
    );

    let controller = JobController::with_settings(ReportSettings::new(true, 1, 5, 5));
    let events = controller.subscribe().expect("subscribe");
    controller
        .configure_extract(&archive, "absent.txt", &temp.path().join("absent.txt"))
        .expect("configure");
    let result = controller.run();

    assert_eq!(result.outcome, JobOutcome::Failed);
    let events: Vec<JobEvent> = events.try_iter().collect();
    assert!(events.contains(&JobEvent::MaxFilesProgress(2)));
    assert_eq!(
        events.last(),
        Some(&JobEvent::Finished {
            outcome: JobOutcome::Failed
        })
    );
    assert!(!temp.path().join("absent.txt").exists());
}

#[test]
fn named_entries_extract_into_directory() {
    let temp = tempdir().expect("create tempdir");
    let archive = temp.path().join("fixture.zip");
    write_fixture(
        &archive,
        &[("a.txt", "alpha"), ("sub/b.txt", "beta"), ("c.txt", "gamma")],
    );
    let dest = temp.path().join("picked");

    let controller = JobController::new();
    controller
        .configure_extract_entries(
            &archive,
            &["sub/b.txt".to_string(), "c.txt".to_string()],
            &dest,
        )
        .expect("configure");
    let result = controller.run();

    assert!(result.success());
    assert_eq!(result.produced, vec![dest.join("sub/b.txt"), dest.join("c.txt")]);
    assert!(!dest.join("a.txt").exists());
    assert_eq!(fs::read(dest.join("sub/b.txt")).expect("read b"), b"beta");
}

#[test]
fn unsafe_archive_fails_without_output() {
    let temp = tempdir().expect("create tempdir");
    let archive = temp.path().join("evil.zip");
    write_fixture(&archive, &[("ok.txt", "fine"), ("../../evil.txt", "nope")]);
    let dest = temp.path().join("a/b");

    let controller = JobController::new();
    controller
        .configure_extract(&archive, "", &dest)
        .expect("configure");
    let result = controller.run();

    assert_eq!(result.outcome, JobOutcome::Failed);
    assert!(!dest.join("ok.txt").exists());
    assert!(!temp.path().join("evil.txt").exists());
}
