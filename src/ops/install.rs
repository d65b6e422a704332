//! Installer orchestrator
//!
//! Runs one pipeline per requested package, all concurrently:
//! resolve recipe -> download -> extract -> link. Each pipeline owns one
//! reporter line; a failure in one pipeline never aborts or blocks the
//! others. The orchestrator joins every pipeline before returning and
//! reports how many packages reached the installed state.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::oneshot;
use tokio::task::JoinSet;

use crate::core::recipe::{PlatformEntry, RecipeSource, current_platform};
use crate::core::spec::PackageSpec;
use crate::io::download::download_url;
use crate::io::extract::{self, ExtractedFile};
use crate::io::link::{LinkKind, create_link, link_name_if_exec};
use crate::ops::InstallError;
use crate::ui::MultiReporter;
use crate::{Paths, filename_from_url};

/// A fully installed package, returned to the caller
#[derive(Debug, Clone)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    /// `(link name, link target)` for every executable exposed
    pub binary_paths: Vec<(String, PathBuf)>,
    notes: String,
}

impl InstalledPackage {
    /// Human-readable summary of what was installed where
    pub fn install_notes(&self) -> &str {
        &self.notes
    }
}

/// Aggregate result of an `install_all` run
#[derive(Debug)]
pub struct InstallOutcome {
    pub requested: usize,
    /// Fully installed packages, in request order
    pub installed: Vec<InstalledPackage>,
}

impl InstallOutcome {
    pub fn all_installed(&self) -> bool {
        self.installed.len() == self.requested
    }
}

struct PipelineCtx {
    source: Arc<dyn RecipeSource>,
    paths: Paths,
    client: Client,
    reporter: Arc<MultiReporter>,
    index: usize,
    total: usize,
}

/// Install every requested `name[@version]` token concurrently,
/// reporting progress on one terminal line per request.
pub async fn install_all(
    source: Arc<dyn RecipeSource>,
    paths: &Paths,
    requests: &[String],
) -> anyhow::Result<InstallOutcome> {
    let reporter = MultiReporter::allocate(requests.len());
    install_all_with(source, paths, requests, reporter).await
}

/// [`install_all`] over an explicit reporter (tests pass one backed by
/// an in-memory buffer).
pub async fn install_all_with(
    source: Arc<dyn RecipeSource>,
    paths: &Paths,
    requests: &[String],
    reporter: Arc<MultiReporter>,
) -> anyhow::Result<InstallOutcome> {
    let client = Client::builder()
        .tcp_nodelay(true)
        .pool_max_idle_per_host(8)
        .build()?;

    let total = requests.len();
    let mut set: JoinSet<(usize, Option<InstalledPackage>)> = JoinSet::new();

    for (index, raw) in requests.iter().enumerate() {
        let ctx = PipelineCtx {
            source: Arc::clone(&source),
            paths: paths.clone(),
            client: client.clone(),
            reporter: Arc::clone(&reporter),
            index,
            total,
        };
        let raw = raw.clone();
        set.spawn(async move { install_one(ctx, raw).await });
    }

    // Line index == request order, so slot results by index to keep the
    // returned list stable under interleaved completion.
    let mut slots: Vec<Option<InstalledPackage>> = Vec::new();
    slots.resize_with(total, || None);
    while let Some(res) = set.join_next().await {
        match res {
            Ok((index, pkg)) => slots[index] = pkg,
            Err(err) => tracing::error!(%err, "install pipeline panicked"),
        }
    }

    Ok(InstallOutcome {
        requested: total,
        installed: slots.into_iter().flatten().collect(),
    })
}

/// One package's pipeline: runs the state machine and converts every
/// error into a reported failure on the owning line.
async fn install_one(ctx: PipelineCtx, raw: String) -> (usize, Option<InstalledPackage>) {
    let index = ctx.index;
    match run_pipeline(&ctx, &raw).await {
        Ok(pkg) => (index, Some(pkg)),
        Err(err) => {
            if !err.already_reported() {
                ctx.reporter.print_err(index, &err.to_string());
            }
            (index, None)
        }
    }
}

async fn run_pipeline(ctx: &PipelineCtx, raw: &str) -> Result<InstalledPackage, InstallError> {
    // Pending -> ResolvingRecipe
    let spec = PackageSpec::parse(raw).map_err(|e| InstallError::InvalidSpec(e.to_string()))?;
    ctx.reporter
        .set_prefix(ctx.index, &format!("[{}] ", spec.name));

    let recipe = ctx.source.find(&spec.name)?;
    let platform = current_platform();
    let entry = recipe
        .entry_for(&platform)
        .ok_or_else(|| InstallError::UnsupportedPlatform {
            name: spec.name.clone(),
            platform: platform.clone(),
        })?
        .clone();

    let version = match &spec.version {
        Some(v) => v.clone(),
        None => recipe
            .latest_version()
            .ok_or_else(|| {
                InstallError::Recipe(crate::core::recipe::RecipeError::NoVersions(
                    spec.name.clone(),
                ))
            })?
            .to_string(),
    };

    let version_dir = ctx.paths.pkg_dir.join(&spec.name).join(&version);

    // Installing an exact version twice is idempotent: skip download and
    // extraction, relink what is already on disk.
    if version_dir.is_dir() {
        let files = extract::walk_installed(&version_dir)?;
        let links = link_executables(ctx, &files, &entry, &spec.name, &version)?;
        // A gutted version directory must not relink as a success
        if links.is_empty() {
            cleanup_failed_install(&ctx.paths, &spec.name, &version_dir);
            return Err(InstallError::NoExecutableFound {
                name: spec.name.clone(),
                version: version.clone(),
            });
        }
        ctx.reporter.print_ok(
            ctx.index,
            &format!(
                "[{}/{}] {}@{} is already installed",
                ctx.index + 1,
                ctx.total,
                spec.name,
                version
            ),
        );
        return Ok(finish(&spec.name, &version, links, true));
    }

    // ResolvingRecipe -> Downloading
    let url = entry.artifact_url(&version);
    let tmp = tempfile::Builder::new()
        .prefix("grab-dl-")
        .tempdir_in(&ctx.paths.tmp_dir)?;
    let archive_path = {
        let name = filename_from_url(&url);
        tmp.path()
            .join(if name.is_empty() { "artifact" } else { name })
    };

    let outcome = download_url(
        &ctx.client,
        &url,
        &archive_path,
        &spec.name,
        &version,
        ctx.index,
        ctx.total,
        &ctx.reporter,
    )
    .await;
    if !outcome.success {
        cleanup_failed_install(&ctx.paths, &spec.name, &version_dir);
        return Err(InstallError::Download);
    }
    tracing::debug!(
        pkg = %spec.name,
        bytes = outcome.bytes_written,
        "download complete"
    );

    // Downloading -> Extracting (heartbeat while the blocking task runs)
    let (done_tx, done_rx) = oneshot::channel();
    let heartbeat = Arc::clone(&ctx.reporter).print_until_done(
        ctx.index,
        format!(
            "[{}/{}] Extracting {}@{}",
            ctx.index + 1,
            ctx.total,
            spec.name,
            version
        ),
        done_rx,
        100,
    );

    let kind = entry.archive;
    let archive = archive_path.clone();
    let dest = version_dir.clone();
    let extracted = tokio::task::spawn_blocking(move || extract::extract(kind, &archive, &dest))
        .await
        .map_err(|e| InstallError::Io(std::io::Error::other(e)));

    let _ = done_tx.send(());
    let _ = heartbeat.await;

    let files = match extracted {
        Ok(Ok(files)) => files,
        Ok(Err(err)) => {
            cleanup_failed_install(&ctx.paths, &spec.name, &version_dir);
            return Err(err.into());
        }
        Err(err) => {
            cleanup_failed_install(&ctx.paths, &spec.name, &version_dir);
            return Err(err);
        }
    };

    // Extracting -> Linking
    let links = match link_executables(ctx, &files, &entry, &spec.name, &version) {
        Ok(links) if links.is_empty() => {
            cleanup_failed_install(&ctx.paths, &spec.name, &version_dir);
            return Err(InstallError::NoExecutableFound {
                name: spec.name.clone(),
                version: version.clone(),
            });
        }
        Ok(links) => links,
        Err(err) => {
            cleanup_failed_install(&ctx.paths, &spec.name, &version_dir);
            return Err(err);
        }
    };

    // Linking -> Installed
    ctx.reporter.print_ok(
        ctx.index,
        &format!(
            "[{}/{}] Installed {}@{}",
            ctx.index + 1,
            ctx.total,
            spec.name,
            version
        ),
    );
    Ok(finish(&spec.name, &version, links, false))
}

/// Walk extracted files, linking every executable (or rename match)
/// into the bin directory.
fn link_executables(
    ctx: &PipelineCtx,
    files: &[ExtractedFile],
    entry: &PlatformEntry,
    name: &str,
    version: &str,
) -> Result<Vec<(String, PathBuf, LinkKind)>, InstallError> {
    let mut links = Vec::new();
    for file in files {
        let Some(link_name) = link_name_if_exec(file, &entry.renames) else {
            continue;
        };
        let link = ctx.paths.bin_dir.join(&link_name);
        let created = create_link(&file.absolute_path, &link)?;
        tracing::debug!(
            pkg = %name,
            %version,
            link = %created.path.display(),
            target = %file.absolute_path.display(),
            shim = matches!(created.kind, LinkKind::Shim),
            "linked executable"
        );
        links.push((link_name, file.absolute_path.clone(), created.kind));
    }
    Ok(links)
}

fn finish(
    name: &str,
    version: &str,
    links: Vec<(String, PathBuf, LinkKind)>,
    already_installed: bool,
) -> InstalledPackage {
    let mut notes = if already_installed {
        format!("{name}@{version} was already installed:\n")
    } else {
        format!("{name}@{version} installed:\n")
    };
    let mut shimmed = false;
    for (link_name, target, kind) in &links {
        let _ = writeln!(notes, "  {link_name} -> {}", target.display());
        shimmed |= matches!(kind, LinkKind::Shim);
    }
    if shimmed {
        let _ = writeln!(
            notes,
            "  (native symlinks unavailable; shim scripts were generated)"
        );
    }

    InstalledPackage {
        name: name.to_string(),
        version: version.to_string(),
        binary_paths: links
            .into_iter()
            .map(|(link_name, target, _)| (link_name, target))
            .collect(),
        notes,
    }
}

/// Best-effort cleanup after a failed install: drop the half-made
/// version directory, and the package directory too if no other
/// installed version keeps it alive.
fn cleanup_failed_install(paths: &Paths, name: &str, version_dir: &Path) {
    if version_dir.exists() {
        if let Err(err) = std::fs::remove_dir_all(version_dir) {
            tracing::debug!(%err, dir = %version_dir.display(), "cleanup failed");
        }
    }
    let pkg_dir = paths.pkg_dir.join(name);
    let empty = match std::fs::read_dir(&pkg_dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => false,
    };
    if empty {
        if let Err(err) = std::fs::remove_dir_all(&pkg_dir) {
            tracing::debug!(%err, dir = %pkg_dir.display(), "cleanup failed");
        }
    }
}
