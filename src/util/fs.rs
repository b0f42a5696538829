//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Replace `path` with `contents` through a sibling temporary file, so
/// readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

/// Remove a file or symlink. A missing path is not an error.
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Whether `path` itself is a symlink, dangling or not.
pub fn is_symlink(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// Create a symlink (platform-aware).
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_contents() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/userlib.gmk");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!tmp.path().join("nested/userlib.gmk.tmp").exists());
    }

    #[test]
    fn test_remove_file_if_exists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("CMakeCache.txt");

        remove_file_if_exists(&path).unwrap();
        fs::write(&path, "").unwrap();
        remove_file_if_exists(&path).unwrap();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_is_symlink_sees_dangling_links() {
        let tmp = TempDir::new().unwrap();
        let link = tmp.path().join("GEAR");
        symlink(&tmp.path().join("missing"), &link).unwrap();

        assert!(is_symlink(&link));
        assert!(!link.exists());
        assert!(!is_symlink(tmp.path()));
    }
}
