//! ZIP codec adapter
//!
//! The only module that talks to the `zip` crate. It exposes the primitives the engine drives:
//! create/finish an archive, add directory markers, open entry write streams, enumerate entries
//! and open entry read streams by name or index.

use crate::utils::error::{Result, ZipWorkerError};
use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use zip::result::ZipError;
use zip::write::SimpleFileOptions as ZipFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Entry metadata as recorded in the archive's central directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

macro_rules! entry_of {
    ($file:expr) => {
        ArchiveEntry {
            name: $file.name().to_string(),
            size: $file.size(),
            compressed_size: $file.compressed_size(),
            unix_mode: $file.unix_mode(),
            is_dir: $file.is_dir(),
        }
    };
}

fn map_zip_error(path: &Path, error: ZipError) -> ZipWorkerError {
    match error {
        ZipError::Io(e) => ZipWorkerError::Io(e),
        other => ZipWorkerError::ArchiveOpenFailed {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

/// Options for a new entry; the source path is a metadata hint for permission bits
fn entry_options(source: &Path) -> ZipFileOptions {
    let options = ZipFileOptions::default().compression_method(CompressionMethod::Deflated);
    let Ok(meta) = fs::metadata(source) else {
        return options;
    };
    let options = options.large_file(meta.len() >= u64::from(u32::MAX));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(meta.permissions().mode())
    }
    #[cfg(not(unix))]
    {
        options
    }
}

/// Archive opened for writing
pub struct ArchiveWriter {
    path: PathBuf,
    writer: ZipWriter<File>,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| ZipWorkerError::ArchiveCreateFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: ZipWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a content-less directory marker, `name` ending in `/`
    pub fn add_directory(&mut self, name: &str, source: &Path) -> Result<()> {
        self.writer
            .add_directory(name, entry_options(source))
            .map_err(|e| ZipWorkerError::ArchiveCreateFailed {
                path: self.path.clone(),
                reason: format!("{}: {}", name, e),
            })
    }

    /// Start a file entry and hand back its write stream
    pub fn start_entry(&mut self, name: &str, source: &Path) -> Result<&mut dyn Write> {
        self.writer
            .start_file(name, entry_options(source))
            .map_err(|e| ZipWorkerError::ArchiveCreateFailed {
                path: self.path.clone(),
                reason: format!("{}: {}", name, e),
            })?;
        Ok(&mut self.writer)
    }

    /// Write the central directory and close the file
    pub fn finish(self) -> Result<()> {
        let path = self.path;
        self.writer
            .finish()
            .map(|_| ())
            .map_err(|e| ZipWorkerError::ArchiveCreateFailed {
                path,
                reason: e.to_string(),
            })
    }
}

/// Archive opened for reading
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| ZipWorkerError::ArchiveOpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| ZipWorkerError::ArchiveOpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// All entries in central directory order
    pub fn entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let mut out = Vec::with_capacity(self.archive.len());
        for idx in 0..self.archive.len() {
            let file = self
                .archive
                .by_index_raw(idx)
                .map_err(|e| map_zip_error(&self.path, e))?;
            out.push(entry_of!(file));
        }
        Ok(out)
    }

    /// Read stream for a named entry
    pub fn open_entry(&mut self, name: &str) -> Result<(ArchiveEntry, Box<dyn Read + '_>)> {
        let file = self.archive.by_name(name).map_err(|e| match e {
            ZipError::FileNotFound => ZipWorkerError::EntryNotFound {
                path: self.path.clone(),
                name: name.to_string(),
            },
            other => map_zip_error(&self.path, other),
        })?;
        let entry = entry_of!(file);
        Ok((entry, Box::new(file)))
    }

    /// Read stream for the entry at `index`
    pub fn open_entry_at(&mut self, index: usize) -> Result<(ArchiveEntry, Box<dyn Read + '_>)> {
        let file = self
            .archive
            .by_index(index)
            .map_err(|e| map_zip_error(&self.path, e))?;
        let entry = entry_of!(file);
        Ok((entry, Box::new(file)))
    }
}
