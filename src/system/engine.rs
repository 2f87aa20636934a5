//! Archive task engine
//!
//! Runs one compress or extract job: picks the operation from the configured shape, sizes the job
//! for progress reporting, drives the copier for every entry and rolls back partial output on
//! failure.

use crate::models::job::{DirFilter, JobConfiguration, JobMode, OperationShape};
use crate::models::progress::{JobEvent, ProgressReporter};
use crate::system::codec::{ArchiveEntry, ArchiveReader, ArchiveWriter};
use crate::system::copier::StreamCopier;
use crate::system::counter;
use crate::system::filesystem::{FileSystem, ListKind};
use crate::utils::error::{Result, ZipWorkerError};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

/// Raw entry names of `archive`, directory markers included
pub fn list_entries(archive: &Path) -> Result<Vec<String>> {
    Ok(entry_infos(archive)?.into_iter().map(|e| e.name).collect())
}

/// Full entry metadata of `archive`
pub fn entry_infos(archive: &Path) -> Result<Vec<ArchiveEntry>> {
    ArchiveReader::open(archive)?.entries()
}

/// How an extraction step addresses an entry
enum EntryRef<'n> {
    Name(&'n str),
    Index(usize),
}

/// One job's worth of archive work
///
/// Borrows the copy strategy and the progress state from the controller for the duration of a job.
pub struct ArchiveTaskEngine<'a> {
    fs: FileSystem,
    copier: &'a dyn StreamCopier,
    reporter: &'a mut ProgressReporter,
}

impl<'a> ArchiveTaskEngine<'a> {
    pub fn new(copier: &'a dyn StreamCopier, reporter: &'a mut ProgressReporter) -> Self {
        Self {
            fs: FileSystem::new(),
            copier,
            reporter,
        }
    }

    /// Run `config`, returning the files produced by an extraction
    ///
    /// A configuration that is not runnable completes without touching the archive.
    pub fn run(&mut self, config: &JobConfiguration) -> Result<Vec<PathBuf>> {
        if !config.is_runnable() {
            tracing::debug!("Nothing to do for shape {}", config.shape.name());
            return Ok(Vec::new());
        }
        let archive = config.archive_path.as_path();
        tracing::info!(
            "Starting {} ({}) on {}",
            config.mode.name(),
            config.shape.name(),
            archive.display()
        );

        match (config.mode, config.shape) {
            (_, OperationShape::None) => Ok(Vec::new()),
            (JobMode::Compress, OperationShape::SingleFile) => {
                let source = config
                    .input_files
                    .first()
                    .ok_or_else(|| ZipWorkerError::Config("no input file configured".to_string()))?;
                self.compress_file(archive, source)?;
                Ok(Vec::new())
            }
            (JobMode::Compress, OperationShape::MultiFiles) => {
                self.compress_files(archive, &config.input_files)?;
                Ok(Vec::new())
            }
            (JobMode::Compress, OperationShape::SingleDirectory) => {
                self.compress_dir(archive, &config.input_dir, config.recursive, config.filter)?;
                Ok(Vec::new())
            }
            (JobMode::Extract, OperationShape::SingleFile) => {
                let entry = config
                    .entry_names
                    .first()
                    .ok_or_else(|| ZipWorkerError::Config("no entry configured".to_string()))?;
                Ok(self
                    .extract_file(archive, entry, &config.destination)?
                    .into_iter()
                    .collect())
            }
            (JobMode::Extract, OperationShape::MultiFiles) => {
                self.extract_files(archive, &config.entry_names, &config.destination)
            }
            (JobMode::Extract, OperationShape::SingleDirectory) => {
                self.extract_dir(archive, &config.destination)
            }
        }
    }

    /// Compress one file into a new archive under its file name
    pub fn compress_file(&mut self, archive: &Path, source: &Path) -> Result<()> {
        if self.reporter.is_enabled() {
            self.reporter.begin_job(counter::count_bytes(source, false));
        }
        let name = file_name_of(source)?;
        self.write_archive(archive, |engine, writer| {
            engine.add_file(writer, source, &name)
        })
    }

    /// Compress a list of files into a new archive; every file must exist
    pub fn compress_files(&mut self, archive: &Path, files: &[PathBuf]) -> Result<()> {
        if self.reporter.is_enabled() {
            self.reporter.begin_job(counter::count_bytes_list(files));
        }
        self.write_archive(archive, |engine, writer| {
            for file in files {
                let name = file_name_of(file)?;
                engine.add_file(writer, file, &name)?;
            }
            Ok(())
        })
    }

    /// Compress a directory tree; an empty `dir` means the working directory
    pub fn compress_dir(
        &mut self,
        archive: &Path,
        dir: &Path,
        recursive: bool,
        filter: DirFilter,
    ) -> Result<()> {
        let root = if dir.as_os_str().is_empty() {
            std::env::current_dir()?
        } else {
            dir.to_path_buf()
        };
        if !root.is_dir() {
            return Err(ZipWorkerError::SourceNotFound { path: root });
        }
        if self.reporter.is_enabled() {
            self.reporter
                .begin_job(counter::count_tree(&root, recursive, filter, archive));
        }
        self.write_archive(archive, |engine, writer| {
            engine.add_tree(writer, &root, &root, recursive, filter)
        })
    }

    /// Extract one entry
    ///
    /// An empty `dest` extracts to the entry's own relative path under the working directory. A
    /// `dest` ending in a separator is a directory receiving the entry under its file name;
    /// anything else is the output file path. Returns `None` for a directory marker.
    pub fn extract_file(
        &mut self,
        archive: &Path,
        name: &str,
        dest: &Path,
    ) -> Result<Option<PathBuf>> {
        let mut reader = ArchiveReader::open(archive)?;
        if self.reporter.is_enabled() {
            let entries = reader.entries()?;
            self.reporter
                .begin_job(counter::sizes_in_archive(&entries, &[name.to_string()]));
        }

        let (entry, mut stream) = reader.open_entry(name)?;
        let target = if dest.as_os_str().is_empty() {
            entry_destination(Path::new(""), &entry.name)?
        } else if self.fs.denotes_directory(dest) && !entry.is_dir {
            let file_name = Path::new(&entry.name)
                .file_name()
                .ok_or_else(|| ZipWorkerError::UnsafeEntryPath {
                    name: entry.name.clone(),
                })?;
            dest.join(file_name)
        } else {
            dest.to_path_buf()
        };
        self.write_entry(&entry, &mut *stream, &target)
    }

    /// Extract the named entries under `dest_dir`, all or nothing
    pub fn extract_files(
        &mut self,
        archive: &Path,
        names: &[String],
        dest_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        let mut reader = ArchiveReader::open(archive)?;
        if self.reporter.is_enabled() {
            let entries = reader.entries()?;
            self.reporter
                .begin_job(counter::sizes_in_archive(&entries, names));
        }
        let picks: Vec<EntryRef> = names.iter().map(|n| EntryRef::Name(n)).collect();
        self.extract_many(&mut reader, dest_dir, &picks)
    }

    /// Extract every entry under `dest_dir`, all or nothing
    pub fn extract_dir(&mut self, archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut reader = ArchiveReader::open(archive)?;
        if self.reporter.is_enabled() {
            let entries = reader.entries()?;
            self.reporter
                .begin_job(counter::sizes_in_archive(&entries, &[]));
        }
        let picks: Vec<EntryRef> = (0..reader.len()).map(EntryRef::Index).collect();
        self.extract_many(&mut reader, dest_dir, &picks)
    }

    /// Create `archive`, let `fill` add entries, finish it; delete it on any failure
    fn write_archive(
        &mut self,
        archive: &Path,
        fill: impl FnOnce(&mut Self, &mut ArchiveWriter) -> Result<()>,
    ) -> Result<()> {
        self.fs.prepare_destination(archive)?;
        let mut writer = ArchiveWriter::create(archive)?;
        let outcome = fill(self, &mut writer).and_then(|()| writer.finish());
        if let Err(e) = outcome {
            tracing::warn!("Compression into {} failed: {}", archive.display(), e);
            self.fs.remove_files(&[archive.to_path_buf()]);
            return Err(e);
        }
        tracing::info!("Archive written: {}", archive.display());
        Ok(())
    }

    fn add_file(&mut self, writer: &mut ArchiveWriter, source: &Path, name: &str) -> Result<()> {
        let meta = fs::metadata(source).map_err(|_| ZipWorkerError::SourceNotFound {
            path: source.to_path_buf(),
        })?;
        if !meta.is_file() {
            return Err(ZipWorkerError::ArchiveCreateFailed {
                path: writer.path().to_path_buf(),
                reason: format!("{}: not a regular file", source.display()),
            });
        }
        let mut input = File::open(source)?;
        tracing::debug!("Adding {} as {}", source.display(), name);

        self.reporter
            .emit(JobEvent::FileChanged(source.to_path_buf()));
        let copier = self.copier;
        let stream = writer.start_entry(name, source)?;
        if copier.copy(&mut input, stream, meta.len(), self.reporter) {
            Ok(())
        } else {
            Err(ZipWorkerError::CopyFailed {
                path: source.to_path_buf(),
            })
        }
    }

    /// Add `dir` below `root`: its marker, then subdirectories, then its files
    fn add_tree(
        &mut self,
        writer: &mut ArchiveWriter,
        root: &Path,
        dir: &Path,
        recursive: bool,
        filter: DirFilter,
    ) -> Result<()> {
        if dir != root {
            let name = format!("{}/", relative_entry_name(root, dir));
            writer.add_directory(&name, dir)?;
        }
        if recursive {
            for sub in self.fs.list_dir(dir, ListKind::Dirs, filter)? {
                self.add_tree(writer, root, &sub, recursive, filter)?;
            }
        }
        for file in self.fs.list_dir(dir, ListKind::Files, filter)? {
            if self.fs.same_file(&file, writer.path()) {
                tracing::debug!("Skipping the archive itself: {}", file.display());
                continue;
            }
            let name = relative_entry_name(root, &file);
            self.add_file(writer, &file, &name)?;
        }
        Ok(())
    }

    fn extract_many(
        &mut self,
        reader: &mut ArchiveReader,
        dest_dir: &Path,
        picks: &[EntryRef],
    ) -> Result<Vec<PathBuf>> {
        let mut produced = Vec::new();
        for pick in picks {
            match self.extract_under(reader, dest_dir, pick) {
                Ok(Some(path)) => produced.push(path),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        "Extraction from {} failed, removing {} extracted file(s): {}",
                        reader.path().display(),
                        produced.len(),
                        e
                    );
                    self.fs.remove_files(&produced);
                    return Err(e);
                }
            }
        }
        Ok(produced)
    }

    fn extract_under(
        &mut self,
        reader: &mut ArchiveReader,
        dest_dir: &Path,
        pick: &EntryRef,
    ) -> Result<Option<PathBuf>> {
        let (entry, mut stream) = match pick {
            EntryRef::Name(name) => reader.open_entry(name)?,
            EntryRef::Index(index) => reader.open_entry_at(*index)?,
        };
        let target = entry_destination(dest_dir, &entry.name)?;
        self.write_entry(&entry, &mut *stream, &target)
    }

    /// Write one entry's content to `target`, removing the file again if the copy fails
    fn write_entry(
        &mut self,
        entry: &ArchiveEntry,
        stream: &mut dyn Read,
        target: &Path,
    ) -> Result<Option<PathBuf>> {
        if entry.is_dir {
            fs::create_dir_all(target)?;
            self.fs.apply_permissions(target, entry.unix_mode);
            return Ok(None);
        }

        let target = self.fs.absolute(target);
        self.fs.prepare_destination(&target)?;
        let mut output = File::create(&target).map_err(|e| ZipWorkerError::ArchiveExtractFailed {
            path: target.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!("Extracting {} to {}", entry.name, target.display());

        self.reporter.emit(JobEvent::FileChanged(target.clone()));
        let copied = self
            .copier
            .copy(stream, &mut output, entry.size, self.reporter);
        drop(output);
        if !copied {
            self.fs.remove_files(&[target.clone()]);
            return Err(ZipWorkerError::CopyFailed { path: target });
        }
        self.fs.apply_permissions(&target, entry.unix_mode);
        Ok(Some(target))
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ZipWorkerError::SourceNotFound {
            path: path.to_path_buf(),
        })
}

/// Entry name of `path` relative to `root`, `/`-separated
fn relative_entry_name(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Output path of `name` under `dest_root`, rejecting names that would leave it
fn entry_destination(dest_root: &Path, name: &str) -> Result<PathBuf> {
    sanitize_extract_path(dest_root, Path::new(name)).ok_or_else(|| {
        tracing::warn!("Rejecting unsafe entry name: {}", name);
        ZipWorkerError::UnsafeEntryPath {
            name: name.to_string(),
        }
    })
}

fn sanitize_extract_path(dest_root: &Path, raw_path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for comp in raw_path.components() {
        match comp {
            Component::Normal(v) => clean.push(v),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if clean.as_os_str().is_empty() {
        return None;
    }
    Some(dest_root.join(clean))
}
