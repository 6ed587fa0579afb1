//! Small filesystem helpers: atomic replace-on-write and transient files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{DevCertsError, Result};

/// Permissions of a written file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Owner read/write only; private keys.
    Private,
    /// World readable; certificates, requests, serials.
    Public,
}

impl Mode {
    #[cfg(unix)]
    fn bits(self) -> u32 {
        match self {
            Mode::Private => 0o600,
            Mode::Public => 0o644,
        }
    }
}

/// Writes `contents` to a sibling temporary file and renames it over `path`, so
/// `path` is either absent, the previous version, or complete.
pub fn write_atomic(path: &Path, contents: &[u8], mode: Mode) -> Result<()> {
    let tmp = temp_sibling(path);
    let guard = TransientFile::new(tmp.clone());

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode.bits());
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(&tmp)
        .map_err(|e| DevCertsError::io("create", &tmp, e))?;
    file.write_all(contents)
        .and_then(|_| file.sync_all())
        .map_err(|e| DevCertsError::io("write", &tmp, e))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| DevCertsError::io("rename into", path, e))?;
    guard.keep();
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".tmp-{}", std::process::id()));
    path.with_file_name(name)
}

/// A file that is removed when the guard drops, on success and failure alike.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    armed: bool,
}

impl TransientFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Disarms the guard; the file stays.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path); // best effort
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CA.pem");
        write_atomic(&path, b"one", Mode::Public).unwrap();
        write_atomic(&path, b"two", Mode::Public).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"two");
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_private_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("CA.key");
        write_atomic(&path, b"secret", Mode::Private).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_transient_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaf.ext");
        fs::write(&path, "x").unwrap();
        {
            let _guard = TransientFile::new(path.clone());
        }
        assert!(!path.exists());
    }
}
