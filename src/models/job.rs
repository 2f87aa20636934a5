//! Job configuration model
//!
//! Describes which archive operation the controller should run next.

use std::path::{Path, PathBuf};

/// Operation shape, selected from the inputs of a configure call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationShape {
    /// Nothing to do
    #[default]
    None,
    /// One file (compress) or one entry (extract)
    SingleFile,
    /// An explicit list of files or entry names
    MultiFiles,
    /// Whole source directory (compress) or whole archive (extract)
    SingleDirectory,
}

impl OperationShape {
    pub fn name(&self) -> &'static str {
        match self {
            OperationShape::None => "none",
            OperationShape::SingleFile => "single file",
            OperationShape::MultiFiles => "multiple files",
            OperationShape::SingleDirectory => "directory",
        }
    }
}

/// Job direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobMode {
    #[default]
    Compress,
    Extract,
}

impl JobMode {
    pub fn name(&self) -> &'static str {
        match self {
            JobMode::Compress => "compress",
            JobMode::Extract => "extract",
        }
    }
}

/// Directory entry filter used when compressing a directory
///
/// The default picks regular non-hidden files and non-hidden subdirectories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirFilter {
    /// Include hidden entries
    pub hidden: bool,
    /// Skip symbolic links
    pub no_symlinks: bool,
}

impl DirFilter {
    pub fn with_hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn without_symlinks(mut self) -> Self {
        self.no_symlinks = true;
        self
    }
}

/// Complete description of the next job
#[derive(Debug, Clone, Default)]
pub struct JobConfiguration {
    /// Archive to create or read
    pub archive_path: PathBuf,
    /// Operation shape
    pub shape: OperationShape,
    /// Compress or extract
    pub mode: JobMode,
    /// Files to compress
    pub input_files: Vec<PathBuf>,
    /// Archive entry names to extract
    pub entry_names: Vec<String>,
    /// Source directory for a directory compression, empty means the working directory
    pub input_dir: PathBuf,
    /// Destination directory or file for extraction, empty means the working directory
    pub destination: PathBuf,
    /// Recurse into subdirectories when compressing a directory
    pub recursive: bool,
    /// Directory entry filter when compressing a directory
    pub filter: DirFilter,
}

impl JobConfiguration {
    /// Compression of a file or directory
    ///
    /// A regular file selects `SingleFile`; an empty path or a directory selects
    /// `SingleDirectory`; anything else leaves the shape at `None`.
    pub fn compress(archive_path: &Path, source: &Path, recursive: bool, filter: DirFilter) -> Self {
        let mut config = Self {
            archive_path: archive_path.to_path_buf(),
            mode: JobMode::Compress,
            recursive,
            filter,
            ..Self::default()
        };
        if source.is_file() {
            config.shape = OperationShape::SingleFile;
            config.input_files.push(source.to_path_buf());
        } else if source.as_os_str().is_empty() || source.is_dir() {
            config.shape = OperationShape::SingleDirectory;
            config.input_dir = source.to_path_buf();
        }
        config
    }

    /// Compression of an explicit file list; an empty list is a no-op
    pub fn compress_files(archive_path: &Path, files: &[PathBuf]) -> Self {
        Self {
            archive_path: archive_path.to_path_buf(),
            mode: JobMode::Compress,
            shape: if files.is_empty() {
                OperationShape::None
            } else {
                OperationShape::MultiFiles
            },
            input_files: files.to_vec(),
            ..Self::default()
        }
    }

    /// Extraction of one entry, or of the whole archive when `entry` is empty
    pub fn extract(archive_path: &Path, entry: &str, destination: &Path) -> Self {
        let mut config = Self {
            archive_path: archive_path.to_path_buf(),
            mode: JobMode::Extract,
            destination: destination.to_path_buf(),
            ..Self::default()
        };
        if entry.is_empty() {
            config.shape = OperationShape::SingleDirectory;
        } else {
            config.shape = OperationShape::SingleFile;
            config.entry_names.push(entry.to_string());
        }
        config
    }

    /// Extraction of named entries, or of the whole archive when `entries` is empty
    pub fn extract_entries(archive_path: &Path, entries: &[String], destination: &Path) -> Self {
        Self {
            archive_path: archive_path.to_path_buf(),
            mode: JobMode::Extract,
            shape: if entries.is_empty() {
                OperationShape::SingleDirectory
            } else {
                OperationShape::MultiFiles
            },
            entry_names: entries.to_vec(),
            destination: destination.to_path_buf(),
            ..Self::default()
        }
    }

    /// Whether running this configuration would touch the codec at all
    pub fn is_runnable(&self) -> bool {
        !self.archive_path.as_os_str().is_empty() && self.shape != OperationShape::None
    }
}
