//! Directory helpers following the XDG Base Directory specification
//!
//! - Data: `~/.local/share/vertex/` - rule store (`rules.json`) and `config.json`

use directories::ProjectDirs;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub fn get_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("net", "packetframe", "vertex").map(|pd| pd.data_dir().to_path_buf())
}

/// Creates the data directory with user-only permissions.
pub fn ensure_data_dir() -> io::Result<()> {
    let Some(dir) = get_data_dir() else {
        return Ok(());
    };

    #[cfg(unix)]
    {
        use std::fs::DirBuilder;
        use std::os::unix::fs::DirBuilderExt;

        DirBuilder::new().mode(0o700).recursive(true).create(dir)?;
    }

    #[cfg(not(unix))]
    {
        std::fs::create_dir_all(dir)?;
    }

    Ok(())
}

/// Writes `contents` to `path` via a uniquely named sibling temp file and
/// rename, so readers see either the old file or the new one. Concurrent
/// writers never share a temp file. The file is created `0o600` on Unix.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let path = path.to_path_buf();
    let contents = contents.to_vec();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&path, &contents))
        .await
        .map_err(io::Error::other)?
}

fn write_atomic_blocking(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    // NamedTempFile is created 0o600 before any data is written
    let mut temp = tempfile::Builder::new()
        .prefix(".vertex-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

/// Exclusive advisory lock on a file, shared by every process that opens the
/// same path. Released when dropped.
#[derive(Debug)]
pub struct FileLockGuard {
    _file: File,
}

/// Blocks until an exclusive `flock` on `path` is held, creating the lock file
/// (and its parent directory) if needed.
pub async fn lock_exclusive(path: &Path) -> io::Result<FileLockGuard> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || lock_exclusive_blocking(&path))
        .await
        .map_err(io::Error::other)?
}

fn lock_exclusive_blocking(path: &Path) -> io::Result<FileLockGuard> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let file = options.open(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::io::AsRawFd;
        let fd = file.as_raw_fd();
        loop {
            // SAFETY: fd is a valid descriptor owned by `file`, which outlives
            // the call. LOCK_EX blocks until the lock is granted.
            #[allow(unsafe_code)]
            let result = unsafe { libc::flock(fd, libc::LOCK_EX) };
            if result == 0 {
                break;
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    Ok(FileLockGuard { _file: file })
}
