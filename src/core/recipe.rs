//! Recipe model - how to fetch and unpack a package per platform
//!
//! Recipes live as TOML files in `<root>/recipes/<name>.toml` and are
//! read-only to the install pipeline. A recipe advertises, per `os-arch`
//! platform key, a URL template parameterized by `[VER]`, the archive
//! kind, and rename items mapping archive paths to canonical link names.
//!
//! ```toml
//! name = "shed"
//! versions = ["1.2.0", "1.10.0"]
//!
//! [platforms.linux-x86_64]
//! url = "https://releases.example.com/shed/[VER]/shed-linux.tar.gz"
//! archive = "tar.gz"
//! renames = [{ from = "shed-bin", to = "shed" }]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::spec::is_newer;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("no recipe found for package '{0}'")]
    NotFound(String),

    #[error("recipe for '{name}' is malformed: {source}")]
    Malformed {
        name: String,
        source: toml::de::Error,
    },

    #[error("recipe for '{0}' advertises no versions")]
    NoVersions(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supported archive containers for downloaded artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveKind {
    #[serde(rename = "tar.gz")]
    TarGz,
    #[serde(rename = "tar.zst")]
    TarZst,
    #[serde(rename = "tar")]
    Tar,
    #[serde(rename = "zip")]
    Zip,
    /// A bare executable, no container
    #[serde(rename = "binary")]
    Binary,
}

impl ArchiveKind {
    /// Detect archive kind from a file name or URL
    pub fn from_path(path: &Path) -> Self {
        let path_str = path.to_string_lossy().to_lowercase();

        if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") {
            Self::TarGz
        } else if path_str.ends_with(".tar.zst") || path_str.ends_with(".tzst") {
            Self::TarZst
        } else if path_str.ends_with(".tar") {
            Self::Tar
        } else if path_str.ends_with(".zip") {
            Self::Zip
        } else {
            Self::Binary
        }
    }
}

/// Maps an archive-relative path to the canonical name it is linked as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameItem {
    pub from: String,
    pub to: String,
}

/// Per-platform fetch instructions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformEntry {
    /// Artifact URL template; `[VER]` is replaced by the resolved version
    pub url: String,
    pub archive: ArchiveKind,
    #[serde(default)]
    pub renames: Vec<RenameItem>,
}

impl PlatformEntry {
    /// Build the concrete artifact URL for a version
    pub fn artifact_url(&self, version: &str) -> String {
        self.url.replace("[VER]", version)
    }
}

/// Parsed package recipe, keyed by platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<String>,
    pub platforms: BTreeMap<String, PlatformEntry>,
}

impl Recipe {
    /// Fetch instructions for a platform key like `linux-x86_64`
    pub fn entry_for(&self, platform: &str) -> Option<&PlatformEntry> {
        self.platforms.get(platform)
    }

    /// The newest advertised version under semver-first ordering
    pub fn latest_version(&self) -> Option<&str> {
        let mut latest: Option<&str> = None;
        for v in &self.versions {
            match latest {
                Some(cur) if !is_newer(cur, v) => {}
                _ => latest = Some(v),
            }
        }
        latest
    }
}

/// The platform key for the running host, e.g. `linux-x86_64`
pub fn current_platform() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Supplies parsed recipes to the install pipeline.
///
/// The orchestrator only ever sees this trait, so tests substitute an
/// in-memory source and production uses [`FileRecipeSource`].
pub trait RecipeSource: Send + Sync {
    fn find(&self, name: &str) -> Result<Recipe, RecipeError>;
}

/// Recipe source backed by a directory of TOML files, refreshed from a
/// remote recipe archive.
pub struct FileRecipeSource {
    dir: PathBuf,
    remote_url: String,
}

impl FileRecipeSource {
    pub fn new(dir: PathBuf, remote_url: String) -> Self {
        Self { dir, remote_url }
    }

    fn stamp_path(&self) -> PathBuf {
        self.dir.join(".refreshed")
    }

    /// Whether the local recipe directory is older than `interval`.
    /// A missing stamp (fresh install) always asks for a refresh.
    pub fn should_refresh(&self, interval: Duration) -> bool {
        let stamp = match std::fs::metadata(self.stamp_path()) {
            Ok(meta) => meta,
            Err(_) => return true,
        };
        match stamp.modified().and_then(|m| {
            m.elapsed()
                .map_err(|e| std::io::Error::other(e.to_string()))
        }) {
            Ok(age) => age > interval,
            Err(_) => true,
        }
    }

    /// Download the recipe archive and re-extract it over the local
    /// recipe directory, then re-stamp.
    pub async fn refresh(&self, client: &reqwest::Client) -> anyhow::Result<()> {
        use crate::io::extract;

        tracing::debug!(url = %self.remote_url, "refreshing recipes");

        let response = client
            .get(&self.remote_url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .send()
            .await
            .context("recipe archive request failed")?
            .error_for_status()
            .context("recipe archive request rejected")?;

        let body = response.bytes().await?;

        let tmp = tempfile::Builder::new().prefix("grab-recipes-").tempdir()?;
        let archive_name = crate::filename_from_url(&self.remote_url);
        let archive_path = tmp.path().join(if archive_name.is_empty() {
            "recipes.tar.gz"
        } else {
            archive_name
        });
        std::fs::write(&archive_path, &body)?;

        let kind = ArchiveKind::from_path(&archive_path);
        std::fs::create_dir_all(&self.dir)?;
        extract::extract(kind, &archive_path, &self.dir)
            .context("failed to unpack recipe archive")?;

        std::fs::write(self.stamp_path(), b"")?;
        Ok(())
    }
}

impl RecipeSource for FileRecipeSource {
    fn find(&self, name: &str) -> Result<Recipe, RecipeError> {
        let path = self.dir.join(format!("{name}.toml"));
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RecipeError::NotFound(name.to_string()));
            }
            Err(e) => return Err(RecipeError::Io(e)),
        };
        toml::from_str(&raw).map_err(|source| RecipeError::Malformed {
            name: name.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe_with_versions(versions: &[&str]) -> Recipe {
        Recipe {
            name: "shed".to_string(),
            versions: versions.iter().map(|v| v.to_string()).collect(),
            platforms: BTreeMap::new(),
        }
    }

    #[test]
    fn test_latest_version_semver() {
        let recipe = recipe_with_versions(&["1.2.0", "1.10.0", "1.9.3"]);
        assert_eq!(recipe.latest_version(), Some("1.10.0"));
    }

    #[test]
    fn test_latest_version_empty() {
        let recipe = recipe_with_versions(&[]);
        assert_eq!(recipe.latest_version(), None);
    }

    #[test]
    fn test_artifact_url_template() {
        let entry = PlatformEntry {
            url: "https://dl.example.com/shed/[VER]/shed-[VER].tar.gz".to_string(),
            archive: ArchiveKind::TarGz,
            renames: vec![],
        };
        assert_eq!(
            entry.artifact_url("1.2.0"),
            "https://dl.example.com/shed/1.2.0/shed-1.2.0.tar.gz"
        );
    }

    #[test]
    fn test_archive_kind_detection() {
        assert_eq!(
            ArchiveKind::from_path(Path::new("foo.tar.gz")),
            ArchiveKind::TarGz
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("foo.tgz")),
            ArchiveKind::TarGz
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("FOO.TAR.ZST")),
            ArchiveKind::TarZst
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("foo.zip")),
            ArchiveKind::Zip
        );
        assert_eq!(
            ArchiveKind::from_path(Path::new("archive.tar")),
            ArchiveKind::Tar
        );
        assert_eq!(ArchiveKind::from_path(Path::new("jq")), ArchiveKind::Binary);
    }

    #[test]
    fn test_recipe_toml_round() {
        let raw = r#"
name = "shed"
versions = ["1.0.0", "1.2.0"]

[platforms.linux-x86_64]
url = "https://dl.example.com/shed/[VER].tar.gz"
archive = "tar.gz"
renames = [{ from = "shed-bin", to = "shed" }]
"#;
        let recipe: Recipe = toml::from_str(raw).unwrap();
        assert_eq!(recipe.name, "shed");
        let entry = recipe.entry_for("linux-x86_64").unwrap();
        assert_eq!(entry.archive, ArchiveKind::TarGz);
        assert_eq!(entry.renames[0].to, "shed");
        assert!(recipe.entry_for("plan9-mips").is_none());
    }

    #[test]
    fn test_file_source_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FileRecipeSource::new(tmp.path().to_path_buf(), String::new());
        assert!(matches!(
            source.find("missing"),
            Err(RecipeError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_source_reads_recipe() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("jq.toml"),
            r#"
name = "jq"
versions = ["1.7.1"]

[platforms.linux-x86_64]
url = "https://example.com/jq-[VER]"
archive = "binary"
"#,
        )
        .unwrap();

        let source = FileRecipeSource::new(tmp.path().to_path_buf(), String::new());
        let recipe = source.find("jq").unwrap();
        assert_eq!(recipe.latest_version(), Some("1.7.1"));
    }

    #[test]
    fn test_should_refresh_without_stamp() {
        let tmp = tempfile::tempdir().unwrap();
        let source = FileRecipeSource::new(tmp.path().to_path_buf(), String::new());
        assert!(source.should_refresh(Duration::from_secs(60)));

        std::fs::write(tmp.path().join(".refreshed"), b"").unwrap();
        assert!(!source.should_refresh(Duration::from_secs(60)));
    }
}
