//! grab - prebuilt binary installer
//!
//! Fetches released binary artifacts over HTTP, unpacks them into
//! per-package version directories, and exposes the executables through
//! links on a single bin directory.
//!
//! # Architecture
//!
//! - One concurrent pipeline per requested package
//!   (resolve -> download -> extract -> link), joined at the end.
//! - One dedicated terminal line per pipeline, serialized through a
//!   single [`ui::MultiReporter`] so cursor movement never interleaves.
//! - Platform-conditional linking: native symlinks, with a generated
//!   shim script where symlink creation is unavailable.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.grab/
//! ├── bin/        # Links (or shims) to active binaries
//! ├── pkg/        # Extracted packages by <name>/<version>
//! ├── recipes/    # Recipe TOML files, refreshed from the recipe archive
//! └── tmp/        # Scratch space for in-flight downloads
//! ```

pub mod core;
pub mod io;
pub mod ops;
pub mod ui;

use std::io::Result as IoResult;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use dirs::home_dir;

/// User Agent string
pub const USER_AGENT: &str = concat!("grab/", env!("CARGO_PKG_VERSION"));

/// Default location of the recipe archive fetched by `grab add --refresh`.
/// Overridable through `GRAB_RECIPE_URL`.
pub const DEFAULT_RECIPE_URL: &str = "https://pkgs.grab-cli.dev/recipes.tar.gz";

/// How stale the local recipe directory may get before `add` refreshes it.
pub const RECIPE_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Returns the primary grab directory, or None if the user's home cannot
/// be resolved.
pub fn try_grab_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("GRAB_HOME") {
        return Some(PathBuf::from(val));
    }
    home_dir().map(|h| h.join(".grab"))
}

/// The on-disk layout of a grab installation.
///
/// Carried explicitly (rather than read from ambient globals) so tests can
/// point an entire install at a temporary root.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root directory (`~/.grab` unless `GRAB_HOME` is set)
    pub root: PathBuf,
    /// Extracted packages: `<pkg_dir>/<name>/<version>/...`
    pub pkg_dir: PathBuf,
    /// Links to active binaries, expected on `$PATH`
    pub bin_dir: PathBuf,
    /// Recipe TOML files
    pub recipe_dir: PathBuf,
    /// Scratch space for in-flight downloads
    pub tmp_dir: PathBuf,
}

impl Paths {
    /// Build the layout under an explicit root.
    pub fn from_root(root: PathBuf) -> Self {
        Self {
            pkg_dir: root.join("pkg"),
            bin_dir: root.join("bin"),
            recipe_dir: root.join("recipes"),
            tmp_dir: root.join("tmp"),
            root,
        }
    }

    /// Resolve the layout from the environment (`GRAB_HOME` or `~/.grab`).
    pub fn resolve() -> anyhow::Result<Self> {
        let root = try_grab_home().context("could not determine home directory")?;
        Ok(Self::from_root(root))
    }

    /// Create every directory in the layout.
    pub fn ensure(&self) -> IoResult<()> {
        for dir in [
            &self.root,
            &self.pkg_dir,
            &self.bin_dir,
            &self.recipe_dir,
            &self.tmp_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Extract the filename from a URL.
///
/// # Example
///
/// ```
/// use grab::filename_from_url;
///
/// assert_eq!(filename_from_url("https://example.com/path/to/file.tar.gz"), "file.tar.gz");
/// assert_eq!(filename_from_url(""), "");
/// ```
pub fn filename_from_url(url: &str) -> &str {
    url.split('/').next_back().unwrap_or("")
}
