//! Package removal
//!
//! Deletes an installed version (or the whole package) and prunes every
//! bin entry that points into the removed tree, shims included.

use std::fs;
use std::path::Path;

use anyhow::{Result, bail};

use crate::Paths;
use crate::core::spec::PackageSpec;

/// Remove `name[@version]`. Without a version the whole package goes.
/// Returns the number of bin entries pruned.
pub fn remove_package(paths: &Paths, raw: &str) -> Result<usize> {
    let spec = PackageSpec::parse(raw)?;
    let pkg_dir = paths.pkg_dir.join(&spec.name);
    if !pkg_dir.is_dir() {
        bail!("package '{}' is not installed", spec.name);
    }

    let doomed = match &spec.version {
        Some(version) => {
            let version_dir = pkg_dir.join(version);
            if !version_dir.is_dir() {
                bail!("{}@{} is not installed", spec.name, version);
            }
            version_dir
        }
        None => pkg_dir.clone(),
    };

    let pruned = prune_bin_entries(&paths.bin_dir, &doomed)?;
    fs::remove_dir_all(&doomed)?;

    // Drop the package directory once no versions remain
    if pkg_dir.is_dir() {
        let empty = fs::read_dir(&pkg_dir)?.next().is_none();
        if empty {
            fs::remove_dir_all(&pkg_dir)?;
        }
    }

    Ok(pruned)
}

/// Remove bin entries resolving into `root`: symlinks by target, shims
/// by scanning their short script body for the store path.
fn prune_bin_entries(bin_dir: &Path, root: &Path) -> Result<usize> {
    let mut pruned = 0;
    let entries = match fs::read_dir(bin_dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(0),
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let points_in = if let Ok(target) = fs::read_link(&path) {
            target.starts_with(root)
        } else if path.is_file() {
            shim_points_into(&path, root)
        } else {
            false
        };

        if points_in {
            if let Err(err) = fs::remove_file(&path) {
                tracing::debug!(%err, path = %path.display(), "could not prune bin entry");
            } else {
                pruned += 1;
            }
        }
    }
    Ok(pruned)
}

fn shim_points_into(path: &Path, root: &Path) -> bool {
    let Ok(body) = fs::read_to_string(path) else {
        return false;
    };
    let needle = root.to_string_lossy().into_owned();
    body.lines().take(2).any(|line| line.contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::link::{SymlinkBackend, create_link, create_link_with};
    use std::io;

    fn paths_in(tmp: &Path) -> Paths {
        let paths = Paths::from_root(tmp.to_path_buf());
        paths.ensure().unwrap();
        paths
    }

    fn fake_install(paths: &Paths, name: &str, version: &str) {
        let version_dir = paths.pkg_dir.join(name).join(version);
        fs::create_dir_all(&version_dir).unwrap();
        let binary = version_dir.join(name);
        fs::write(&binary, b"bits").unwrap();
        create_link(&binary, &paths.bin_dir.join(name)).unwrap();
    }

    #[test]
    fn test_remove_whole_package() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fake_install(&paths, "jq", "1.7.1");

        let pruned = remove_package(&paths, "jq").unwrap();

        assert_eq!(pruned, 1);
        assert!(!paths.pkg_dir.join("jq").exists());
        assert!(!paths.bin_dir.join("jq").exists());
    }

    #[test]
    fn test_remove_one_version_keeps_others() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fake_install(&paths, "jq", "1.6.0");
        fake_install(&paths, "jq", "1.7.1"); // link now points at 1.7.1

        remove_package(&paths, "jq@1.6.0").unwrap();

        assert!(!paths.pkg_dir.join("jq/1.6.0").exists());
        assert!(paths.pkg_dir.join("jq/1.7.1").exists());
        // the active link pointed at 1.7.1, so it survives
        assert!(paths.bin_dir.join("jq").exists());
    }

    #[test]
    fn test_remove_last_version_drops_package_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        fake_install(&paths, "rg", "14.1.0");

        remove_package(&paths, "rg@14.1.0").unwrap();

        assert!(!paths.pkg_dir.join("rg").exists());
    }

    #[test]
    fn test_remove_unknown_package_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        assert!(remove_package(&paths, "ghost").is_err());
    }

    #[test]
    fn test_remove_prunes_shims() {
        struct FailingSymlinks;
        impl SymlinkBackend for FailingSymlinks {
            fn symlink(&self, _t: &Path, _l: &Path) -> io::Result<()> {
                Err(io::Error::other("no symlinks here"))
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let paths = paths_in(tmp.path());
        let version_dir = paths.pkg_dir.join("fd").join("10.2.0");
        fs::create_dir_all(&version_dir).unwrap();
        let binary = version_dir.join("fd");
        fs::write(&binary, b"bits").unwrap();
        create_link_with(&FailingSymlinks, &binary, &paths.bin_dir.join("fd")).unwrap();

        let pruned = remove_package(&paths, "fd").unwrap();

        assert_eq!(pruned, 1);
        assert!(!paths.bin_dir.join("fd").exists());
    }
}
