//! Executable linking
//!
//! Exposes installed executables on the bin directory. Native symlinks
//! are the primary strategy; where symlink creation fails (restricted
//! Windows environments, odd filesystems) a generated shim script takes
//! its place. The shim forwards all arguments unmodified and propagates
//! the target's exit code.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::recipe::RenameItem;
use crate::io::extract::ExtractedFile;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("failed to link {link}: {source}")]
    Create {
        link: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How a link ended up on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Symlink,
    /// Shim script fallback; native symlink creation failed
    Shim,
}

/// A link (or shim) created in the bin directory
#[derive(Debug, Clone)]
pub struct CreatedLink {
    pub kind: LinkKind,
    pub path: PathBuf,
}

/// Creates native symbolic links. Swapped for a failing mock in tests
/// to exercise the shim fallback.
pub trait SymlinkBackend: Send + Sync {
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
}

/// The platform's real symlink syscall
pub struct NativeSymlinks;

impl SymlinkBackend for NativeSymlinks {
    #[cfg(unix)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        std::os::windows::fs::symlink_file(target, link)
    }
}

/// Create a link at `link` pointing at `target`, falling back to a shim
/// script when native symlinks are unavailable.
pub fn create_link(target: &Path, link: &Path) -> Result<CreatedLink, LinkError> {
    create_link_with(&NativeSymlinks, target, link)
}

/// [`create_link`] with an explicit symlink strategy.
///
/// Re-linking is idempotent: a stale entry at `link` is removed first,
/// so repeated installs of the same version land on the same target.
pub fn create_link_with(
    backend: &dyn SymlinkBackend,
    target: &Path,
    link: &Path,
) -> Result<CreatedLink, LinkError> {
    if link.symlink_metadata().is_ok() {
        let _ = fs::remove_file(link);
    }

    match backend.symlink(target, link) {
        Ok(()) => Ok(CreatedLink {
            kind: LinkKind::Symlink,
            path: link.to_path_buf(),
        }),
        Err(err) => {
            tracing::debug!(link = %link.display(), %err, "symlink failed, writing shim");
            write_shim(target, link)
        }
    }
}

/// Where the shim lands: same path with the extension swapped for the
/// platform script extension. Unix has no script extension convention,
/// so the shim keeps the link path and stays discoverable on `$PATH`.
fn shim_path(link: &Path) -> PathBuf {
    #[cfg(windows)]
    {
        link.with_extension("cmd")
    }
    #[cfg(not(windows))]
    {
        link.to_path_buf()
    }
}

fn write_shim(target: &Path, link: &Path) -> Result<CreatedLink, LinkError> {
    let path = shim_path(link);
    if path.symlink_metadata().is_ok() {
        let _ = fs::remove_file(&path);
    }

    #[cfg(windows)]
    let contents = format!("@echo off\r\n\"{}\" %*\r\n", target.display());
    #[cfg(not(windows))]
    let contents = format!("#!/bin/sh\nexec \"{}\" \"$@\"\n", target.display());

    fs::write(&path, contents).map_err(|source| LinkError::Create {
        link: path.clone(),
        source,
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).map_err(|source| {
            LinkError::Create {
                link: path.clone(),
                source,
            }
        })?;
    }

    Ok(CreatedLink {
        kind: LinkKind::Shim,
        path,
    })
}

/// Decide whether an extracted file should be linked, and under which
/// name. A rename item match (by file name or archive-relative path)
/// wins and may point at non-executable files; otherwise only
/// executables qualify, keeping their own name.
///
/// On platforms without a permission bit every regular file is a
/// candidate (`is_executable` is set accordingly during extraction).
pub fn link_name_if_exec(file: &ExtractedFile, renames: &[RenameItem]) -> Option<String> {
    let rel = file.relative_path.to_string_lossy();
    let name = file.relative_path.file_name()?.to_str()?;

    if let Some(item) = renames.iter().find(|r| r.from == rel || r.from == name) {
        return Some(item.to.clone());
    }

    if file.is_executable {
        Some(name.to_string())
    } else {
        None
    }
}
