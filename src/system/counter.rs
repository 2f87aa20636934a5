//! Pre-flight sizing of compress sources and extract targets

use crate::models::job::DirFilter;
use crate::models::progress::ByteCount;
use crate::system::codec::ArchiveEntry;
use crate::system::filesystem::{FileSystem, ListKind};
use std::fs;
use std::path::{Path, PathBuf};

/// Total bytes and regular-file count of `path`
///
/// A regular file counts as itself, a directory sums its regular files (walking subdirectories
/// when `recurse` is set), anything else (missing path, special file) is `(0, 0)`.
pub fn count_bytes(path: &Path, recurse: bool) -> ByteCount {
    let Ok(meta) = fs::metadata(path) else {
        return ByteCount::default();
    };
    if meta.is_file() {
        return ByteCount::new(meta.len(), 1);
    }
    if !meta.is_dir() {
        return ByteCount::default();
    }
    let mut total = ByteCount::default();
    count_directory(path, recurse, &mut total);
    total
}

fn count_directory(dir: &Path, recurse: bool, total: &mut ByteCount) {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return;
    };
    for entry in read_dir {
        let Ok(entry) = entry else { continue };
        let entry_path = entry.path();
        let Ok(meta) = fs::metadata(&entry_path) else {
            continue;
        };
        if meta.is_file() {
            total.bytes += meta.len();
            total.files += 1;
        } else if meta.is_dir() && recurse {
            count_directory(&entry_path, recurse, total);
        }
    }
}

/// Total bytes and file count of the files a directory compression will add
///
/// Walks `root` with the same listing and `filter` as the compressor and leaves out `skip` (the
/// archive being written). Unreadable directories count as empty.
pub fn count_tree(root: &Path, recurse: bool, filter: DirFilter, skip: &Path) -> ByteCount {
    let fs = FileSystem::new();
    let mut total = ByteCount::default();
    count_listed(&fs, root, recurse, filter, skip, &mut total);
    total
}

fn count_listed(
    fs: &FileSystem,
    dir: &Path,
    recurse: bool,
    filter: DirFilter,
    skip: &Path,
    total: &mut ByteCount,
) {
    if recurse {
        for sub in fs.list_dir(dir, ListKind::Dirs, filter).unwrap_or_default() {
            count_listed(fs, &sub, recurse, filter, skip, total);
        }
    }
    for file in fs.list_dir(dir, ListKind::Files, filter).unwrap_or_default() {
        if fs.same_file(&file, skip) {
            continue;
        }
        if let Ok(meta) = fs::metadata(&file) {
            total.bytes += meta.len();
            total.files += 1;
        }
    }
}

/// Total bytes of an explicit path list
///
/// Unreadable paths weigh 0 bytes and are left out of the file count, so the count matches the
/// subset that was actually summed.
pub fn count_bytes_list(paths: &[PathBuf]) -> ByteCount {
    paths
        .iter()
        .filter_map(|p| fs::metadata(p).ok())
        .filter(|meta| meta.is_file())
        .fold(ByteCount::default(), |acc, meta| {
            ByteCount::new(acc.bytes + meta.len(), acc.files + 1)
        })
}

/// Totals for an extraction, computed from the archive's own entry metadata
///
/// No names means the whole archive. A single name missing from the archive also falls back to
/// the whole archive; the extraction itself reports the missing entry later. Zero-size entries
/// (directory markers) add no file to the count.
pub fn sizes_in_archive(entries: &[ArchiveEntry], names: &[String]) -> ByteCount {
    let whole = |entries: &[ArchiveEntry]| {
        entries.iter().fold(ByteCount::default(), |acc, e| {
            ByteCount::new(acc.bytes + e.size, acc.files + usize::from(e.size > 0))
        })
    };

    match names {
        [] => whole(entries),
        [single] => match entries.iter().find(|e| &e.name == single) {
            Some(entry) => ByteCount::new(entry.size, 1),
            None => whole(entries),
        },
        _ => entries
            .iter()
            .filter(|e| names.contains(&e.name))
            .fold(ByteCount::default(), |acc, e| {
                ByteCount::new(acc.bytes + e.size, acc.files + usize::from(e.size > 0))
            }),
    }
}
