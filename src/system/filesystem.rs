use crate::models::job::DirFilter;
use crate::utils::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// What a directory listing returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Files,
    Dirs,
}

/// File system helpers used by the engine
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl FileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Single-level listing of `dir`, sorted by name
    ///
    /// `.` and `..` never appear. Hidden entries and symlinks are dropped according to `filter`;
    /// unreadable entries are skipped.
    pub fn list_dir(&self, dir: &Path, kind: ListKind, filter: DirFilter) -> Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(dir)? {
            let Ok(entry) = entry else { continue };
            let path = entry.path();

            let Ok(link_meta) = fs::symlink_metadata(&path) else {
                continue;
            };
            if filter.no_symlinks && link_meta.file_type().is_symlink() {
                continue;
            }
            if !filter.hidden && self.is_hidden(&path) {
                continue;
            }

            // symlinks are classified by their target
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            let keep = match kind {
                ListKind::Files => meta.is_file(),
                ListKind::Dirs => meta.is_dir(),
            };
            if keep {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    /// Hidden entry check
    #[allow(clippy::unused_self)]
    pub fn is_hidden(&self, path: &Path) -> bool {
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };

        #[cfg(windows)]
        {
            use std::os::windows::fs::MetadataExt;
            if let Ok(metadata) = path.metadata() {
                const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
                if (metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN) != 0 {
                    return true;
                }
            }
        }

        file_name.starts_with('.')
    }

    /// Whether `path` is spelled as a directory, i.e. ends with a separator
    #[allow(clippy::unused_self)]
    pub fn denotes_directory(&self, path: &Path) -> bool {
        let s = path.as_os_str().to_string_lossy();
        s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR)
    }

    /// Create the directory an extraction target needs
    ///
    /// A directory-like destination is created itself, anything else gets its parent created.
    pub fn prepare_destination(&self, dest: &Path) -> Result<()> {
        if self.denotes_directory(dest) {
            fs::create_dir_all(dest)?;
        } else if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Apply archive permission bits; zero or absent bits leave the file untouched
    #[allow(clippy::unused_self)]
    pub fn apply_permissions(&self, path: &Path, mode: Option<u32>) {
        let Some(mode) = mode.map(|m| m & 0o7777).filter(|m| *m != 0) else {
            return;
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
                tracing::debug!("Cannot set permissions on {}: {}", path.display(), e);
            }
        }
        #[cfg(not(unix))]
        {
            let _ = (path, mode);
        }
    }

    /// Delete files quietly, returning false if any removal failed
    #[allow(clippy::unused_self)]
    pub fn remove_files(&self, paths: &[PathBuf]) -> bool {
        let mut ok = true;
        for path in paths {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Rollback could not remove {}: {}", path.display(), e);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Absolute form of `path` without touching the file system beyond the working directory
    #[allow(clippy::unused_self)]
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    }

    /// Same file check for the archive-inside-source case
    #[allow(clippy::unused_self)]
    pub fn same_file(&self, a: &Path, b: &Path) -> bool {
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => a == b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn populate(base: &Path) {
        fs::create_dir_all(base.join("sub")).unwrap();
        fs::create_dir_all(base.join(".hidden_dir")).unwrap();
        fs::write(base.join("b.txt"), b"b").unwrap();
        fs::write(base.join("a.txt"), b"a").unwrap();
        fs::write(base.join(".secret"), b"s").unwrap();
    }

    #[test]
    fn test_list_dir_files_sorted_and_hidden_skipped() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());
        let fs_helper = FileSystem::new();

        let files = fs_helper
            .list_dir(temp.path(), ListKind::Files, DirFilter::default())
            .unwrap();
        assert_eq!(files, vec![temp.path().join("a.txt"), temp.path().join("b.txt")]);

        let with_hidden = fs_helper
            .list_dir(temp.path(), ListKind::Files, DirFilter::default().with_hidden())
            .unwrap();
        assert_eq!(with_hidden.len(), 3);
    }

    #[test]
    fn test_list_dir_dirs_only() {
        let temp = TempDir::new().unwrap();
        populate(temp.path());
        let dirs = FileSystem::new()
            .list_dir(temp.path(), ListKind::Dirs, DirFilter::default())
            .unwrap();
        assert_eq!(dirs, vec![temp.path().join("sub")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_dir_symlink_filter() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("real.txt"), b"r").unwrap();
        std::os::unix::fs::symlink(temp.path().join("real.txt"), temp.path().join("link.txt"))
            .unwrap();
        let fs_helper = FileSystem::new();

        let all = fs_helper
            .list_dir(temp.path(), ListKind::Files, DirFilter::default())
            .unwrap();
        assert_eq!(all.len(), 2);

        let no_links = fs_helper
            .list_dir(temp.path(), ListKind::Files, DirFilter::default().without_symlinks())
            .unwrap();
        assert_eq!(no_links, vec![temp.path().join("real.txt")]);
    }

    #[test]
    fn test_denotes_directory() {
        let fs_helper = FileSystem::new();
        assert!(fs_helper.denotes_directory(Path::new("out/dir/")));
        assert!(!fs_helper.denotes_directory(Path::new("out/file.txt")));
    }

    #[test]
    fn test_prepare_destination() {
        let temp = TempDir::new().unwrap();
        let fs_helper = FileSystem::new();

        let file_dest = temp.path().join("x/y/file.txt");
        fs_helper.prepare_destination(&file_dest).unwrap();
        assert!(temp.path().join("x/y").is_dir());
        assert!(!file_dest.exists());

        let dir_dest = PathBuf::from(format!("{}/d1/d2/", temp.path().display()));
        fs_helper.prepare_destination(&dir_dest).unwrap();
        assert!(temp.path().join("d1/d2").is_dir());
    }

    #[test]
    fn test_remove_files_ignores_missing() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("gone.txt");
        fs::write(&file, b"x").unwrap();
        let fs_helper = FileSystem::new();
        assert!(fs_helper.remove_files(&[file.clone(), temp.path().join("never.txt")]));
        assert!(!file.exists());
    }

    #[test]
    fn test_is_hidden() {
        let fs_helper = FileSystem::new();
        assert!(fs_helper.is_hidden(Path::new(".hidden")));
        assert!(!fs_helper.is_hidden(Path::new("visible.txt")));
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f");
        fs::write(&file, b"x").unwrap();
        let fs_helper = FileSystem::new();

        fs_helper.apply_permissions(&file, Some(0o100600));
        assert_eq!(fs::metadata(&file).unwrap().permissions().mode() & 0o777, 0o600);

        fs_helper.apply_permissions(&file, Some(0));
        fs_helper.apply_permissions(&file, None);
        assert_eq!(fs::metadata(&file).unwrap().permissions().mode() & 0o777, 0o600);
    }
}
