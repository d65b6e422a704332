//! Archive extraction
//!
//! Handles tar.gz, tar.zst, tar, zip and raw binary artifacts. Runs
//! synchronously; the install pipeline drives it through
//! `spawn_blocking`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use zip::ZipArchive;
use zstd::stream::Decoder as ZstdDecoder;

use crate::core::recipe::ArchiveKind;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("archive error: {0}")]
    Archive(String),
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Whether this is an executable
    pub is_executable: bool,
}

/// Extract an archive of a known kind into `dest_dir`
pub fn extract(
    kind: ArchiveKind,
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    match kind {
        ArchiveKind::TarGz => extract_tar_gz(archive_path, dest_dir),
        ArchiveKind::TarZst => extract_tar_zst(archive_path, dest_dir),
        ArchiveKind::Tar => {
            let file = File::open(archive_path)?;
            extract_tar(BufReader::new(file), dest_dir)
        }
        ArchiveKind::Zip => extract_zip(archive_path, dest_dir),
        ArchiveKind::Binary => extract_raw(archive_path, dest_dir),
    }
}

/// Extract a tar.gz archive to a destination directory
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar.zst archive to a destination directory
pub fn extract_tar_zst(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let zstd_decoder = ZstdDecoder::new(reader)?;

    extract_tar(zstd_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?;

        // Skip directories
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let relative_path: PathBuf = entry_path.components().collect();

        // Reject traversal: only plain path segments may reach the join,
        // anything with `..` or a root would escape the destination.
        if relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ExtractError::Archive(format!(
                "invalid path in archive: {}",
                relative_path.display()
            )));
        }
        let absolute_path = dest_dir.join(&relative_path);

        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&absolute_path)?;

        // Unix mode has execute bit
        let is_executable = entry
            .header()
            .mode()
            .map(|m| m & 0o111 != 0)
            .unwrap_or(false);

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let relative_path = match file.enclosed_name() {
            Some(path) => path.to_owned(),
            None => continue,
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        let is_executable = if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
            mode & 0o111 != 0
        } else {
            false
        };
        #[cfg(not(unix))]
        let is_executable = true;

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// "Extract" a raw binary artifact by copying it into place and marking
/// it executable.
fn extract_raw(archive_path: &Path, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;
    let filename = archive_path
        .file_name()
        .ok_or_else(|| ExtractError::Archive("invalid filename".to_string()))?;
    let dest_path = dest_dir.join(filename);
    fs::copy(archive_path, &dest_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(vec![ExtractedFile {
        relative_path: PathBuf::from(filename),
        absolute_path: dest_path,
        is_executable: true,
    }])
}

/// Re-walk an already-installed version directory, rebuilding the same
/// file records extraction would have produced. Used for idempotent
/// reinstalls, where download and extraction are skipped.
pub fn walk_installed(dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            e.into_io_error()
                .unwrap_or_else(|| io::Error::other("walk failed"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let absolute_path = entry.path().to_path_buf();
        let relative_path = absolute_path
            .strip_prefix(dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| absolute_path.clone());

        #[cfg(unix)]
        let is_executable = {
            use std::os::unix::fs::PermissionsExt;
            entry
                .metadata()
                .map(|m| m.permissions().mode() & 0o111 != 0)
                .unwrap_or(false)
        };
        #[cfg(not(unix))]
        let is_executable = true;

        files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }
    Ok(files)
}
