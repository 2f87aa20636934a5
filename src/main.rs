use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use zipworker::models::JobEvent;
use zipworker::system::engine;
use zipworker::utils::formatter::{format_elapsed, format_file_size, format_mode, pluralize};
use zipworker::{DirFilter, JobController, JobResult, WorkerSettings};

#[derive(Parser)]
#[command(name = "zipworker")]
#[command(about = "Compress and extract ZIP archives with progress and cancellation", long_about = None)]
struct Cli {
    /// Print progress events while the job runs
    #[arg(long, global = true)]
    progress: bool,

    /// Request cancellation after this many milliseconds
    #[arg(long, global = true, value_name = "MS")]
    cancel_after: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress one file, one directory or a list of files
    Compress {
        archive: PathBuf,
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Do not descend into subdirectories
        #[arg(long)]
        flat: bool,
        /// Include hidden files and directories
        #[arg(long)]
        hidden: bool,
    },
    /// Extract named entries, or the whole archive
    Extract {
        archive: PathBuf,
        entries: Vec<String>,
        /// Destination directory (or file, for a single entry)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },
    /// List archive entries
    List {
        archive: PathBuf,
        /// Show sizes and permissions
        #[arg(short, long)]
        long: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let settings = WorkerSettings::load().context("loading settings")?;
    let controller = Arc::new(JobController::with_settings(settings.report_settings()));
    if cli.progress {
        controller.enable_reporting(true)?;
    }

    match cli.command {
        Command::Compress {
            archive,
            paths,
            flat,
            hidden,
        } => {
            let filter = if hidden {
                DirFilter::default().with_hidden()
            } else {
                DirFilter::default()
            };
            match paths.as_slice() {
                [single] => {
                    check_compress_source(single)?;
                    controller.configure_compress(&archive, single, !flat, filter)?
                }
                many => controller.configure_compress_files(&archive, many)?,
            }
        }
        Command::Extract {
            archive,
            entries,
            dest,
        } => {
            let dest = dest.unwrap_or_default();
            match entries.as_slice() {
                [single] => controller.configure_extract(&archive, single, &dest)?,
                many => controller.configure_extract_entries(&archive, many, &dest)?,
            }
        }
        Command::List { archive, long } => return list(&archive, long),
    }

    let result = run_job(&controller, cli.progress, cli.cancel_after.map(Duration::from_millis))?;
    report(&result)
}

/// A single compress path must be a file or a directory; empty means the working directory
fn check_compress_source(path: &Path) -> anyhow::Result<()> {
    let target = if path.as_os_str().is_empty() {
        Path::new(".")
    } else {
        path
    };
    if !target.is_file() && !target.is_dir() {
        bail!("{}: no such file or directory", path.display());
    }
    Ok(())
}

/// Run the configured job on its worker thread, relaying events until it finishes
fn run_job(
    controller: &Arc<JobController>,
    print_progress: bool,
    cancel_after: Option<Duration>,
) -> anyhow::Result<JobResult> {
    let events = controller.subscribe()?;
    let handle = Arc::clone(controller).spawn()?;
    let started = Instant::now();

    loop {
        match events.recv_timeout(Duration::from_millis(20)) {
            Ok(JobEvent::Finished { .. }) => break,
            Ok(event) if print_progress => print_event(&event),
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        // run() clears requests made before it starts; keep asking until Finished
        if cancel_after.is_some_and(|limit| started.elapsed() >= limit) {
            controller.request_cancel();
        }
    }

    handle
        .join()
        .map_err(|_| anyhow!("worker thread panicked"))
}

fn print_event(event: &JobEvent) {
    match event {
        JobEvent::FileChanged(path) => eprintln!("  {}", path.display()),
        JobEvent::OverallProgress(percent) => eprintln!("[{:>3}%]", percent),
        JobEvent::FilesProgress(done) => {
            eprintln!("  {} {} done", done, pluralize(*done, "file", "files"))
        }
        _ => {}
    }
}

fn report(result: &JobResult) -> anyhow::Result<()> {
    if !result.success() {
        bail!(
            "job {}: {}",
            result.outcome.name(),
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    for path in &result.produced {
        println!("{}", path.display());
    }
    eprintln!("Done in {}", format_elapsed(result.elapsed));
    Ok(())
}

fn list(archive: &Path, long: bool) -> anyhow::Result<()> {
    if !long {
        for name in engine::list_entries(archive)? {
            println!("{}", name);
        }
        return Ok(());
    }

    let entries = engine::entry_infos(archive)?;
    let total: u64 = entries.iter().map(|e| e.size).sum();
    for entry in &entries {
        println!(
            "{}  {:>10}  {:>10}  {}",
            format_mode(entry.unix_mode),
            format_file_size(entry.size),
            format_file_size(entry.compressed_size),
            entry.name
        );
    }
    println!(
        "{} {}, {}",
        entries.len(),
        pluralize(entries.len(), "entry", "entries"),
        format_file_size(total)
    );
    Ok(())
}
