/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Unpacking of uploaded source archives.
//!
//! Archives are gzip compressed tarballs wrapping the project in a single
//! top-level folder. That folder is stripped so the project root becomes the
//! target directory. Incremental uploads carry a `changeList.json` whose
//! `deletedFiles` are removed once the archive is unpacked.

use entity::ChangeManifest;
use entity::manifest::CHANGE_LIST_FILE;
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to decompress archive: {0}")]
    Decompress(#[source] io::Error),
    #[error("Failed to read archive: {0}")]
    Archive(#[source] io::Error),
    #[error("Invalid archive entry {path}: {reason}")]
    InvalidEntry { path: String, reason: String },
    #[error("Failed to parse {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Extraction task failed: {0}")]
    Task(String),
}

impl ExtractError {
    fn io(path: &Path, source: io::Error) -> Self {
        ExtractError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn invalid(path: &Path, reason: &str) -> Self {
        ExtractError::InvalidEntry {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

// Corrupt deflate data surfaces as InvalidData/InvalidInput, tar errors do not.
fn classify(error: io::Error) -> ExtractError {
    match error.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => ExtractError::Decompress(error),
        _ => ExtractError::Archive(error),
    }
}

/// Extracts the gzip tarball at `archive` into `target` on the blocking pool.
pub async fn extract_file(
    archive: PathBuf,
    target: PathBuf,
) -> Result<Option<ChangeManifest>, ExtractError> {
    tokio::task::spawn_blocking(move || {
        let file = File::open(&archive).map_err(|e| ExtractError::io(&archive, e))?;
        extract(file, &target)
    })
    .await
    .map_err(|e| ExtractError::Task(e.to_string()))?
}

/// Extracts a gzip tarball read from `archive` into `target`.
///
/// Returns the change manifest found at the root of the extracted tree, if
/// any, after its deletions have been applied.
pub fn extract<R: Read>(archive: R, target: &Path) -> Result<Option<ChangeManifest>, ExtractError> {
    let mut reader = BufReader::new(archive);
    let head = reader.fill_buf().map_err(ExtractError::Archive)?;
    if head.len() < GZIP_MAGIC.len() || head[..GZIP_MAGIC.len()] != GZIP_MAGIC {
        return Err(ExtractError::Decompress(io::Error::new(
            io::ErrorKind::InvalidData,
            "missing gzip header",
        )));
    }

    fs::create_dir_all(target).map_err(|e| ExtractError::io(target, e))?;
    let root = target
        .canonicalize()
        .map_err(|e| ExtractError::io(target, e))?;

    let mut tarball = tar::Archive::new(GzDecoder::new(reader));
    let mut count = 0usize;

    for entry in tarball.entries().map_err(classify)? {
        let mut entry = entry.map_err(classify)?;
        let path = entry.path().map_err(classify)?.into_owned();
        let entry_type = entry.header().entry_type();

        if entry_type.is_pax_global_extensions() || entry_type.is_pax_local_extensions() {
            continue;
        }

        let Some(relative) = strip_root(&path)? else {
            continue;
        };

        let dest = root.join(&relative);
        let parent = dest.parent().unwrap_or(root.as_path());
        fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;

        let real_parent = parent
            .canonicalize()
            .map_err(|e| ExtractError::io(parent, e))?;
        if !real_parent.starts_with(&root) {
            return Err(ExtractError::invalid(&path, "escapes the target directory"));
        }

        if entry_type.is_hard_link() {
            let link = entry
                .link_name()
                .map_err(classify)?
                .ok_or_else(|| ExtractError::invalid(&path, "hard link without target"))?
                .into_owned();
            let link = strip_root(&link)?
                .ok_or_else(|| ExtractError::invalid(&path, "hard link to archive root"))?;
            fs::hard_link(root.join(link), &dest).map_err(|e| ExtractError::io(&dest, e))?;
        } else {
            entry.unpack(&dest).map_err(|e| ExtractError::io(&dest, e))?;
        }

        if !entry_type.is_symlink() {
            make_permissive(&dest)?;
        }

        count += 1;
    }

    debug!(entries = count, target = %root.display(), "Extracted archive");

    let manifest_path = root.join(CHANGE_LIST_FILE);
    if !manifest_path.is_file() {
        return Ok(None);
    }

    let content = fs::read(&manifest_path).map_err(|e| ExtractError::io(&manifest_path, e))?;
    let manifest =
        ChangeManifest::from_slice(&content).map_err(|source| ExtractError::Manifest {
            path: manifest_path.clone(),
            source,
        })?;

    apply_deletions(&root, &manifest)?;

    Ok(Some(manifest))
}

/// Removes every `deletedFiles` entry of `manifest` below `target`.
///
/// Files that are already gone are skipped. Returns how many paths were
/// actually removed.
pub fn apply_deletions(target: &Path, manifest: &ChangeManifest) -> Result<usize, ExtractError> {
    let mut removed = 0;

    for file in &manifest.deleted_files {
        let relative = relative_path(file)?;
        let path = target.join(relative);

        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(ExtractError::io(&path, e)),
        };

        let result = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };

        match result {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ExtractError::io(&path, e)),
        }
    }

    Ok(removed)
}

/// Drops the wrapping folder of an archive path.
///
/// Returns `None` for the wrapping folder itself.
fn strip_root(path: &Path) -> Result<Option<PathBuf>, ExtractError> {
    let mut components = path.components();

    match components.next() {
        None => return Ok(None),
        Some(Component::Normal(_)) | Some(Component::CurDir) => {}
        Some(_) => return Err(ExtractError::invalid(path, "absolute path")),
    }

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(ExtractError::invalid(path, "path traversal")),
        }
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

fn relative_path(file: &str) -> Result<PathBuf, ExtractError> {
    let normalized = file.replace('\\', "/");
    let path = Path::new(&normalized);
    let mut relative = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(ExtractError::invalid(path, "deleted file outside the project")),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(ExtractError::invalid(path, "empty deleted file path"));
    }

    Ok(relative)
}

#[cfg(unix)]
fn make_permissive(path: &Path) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o777))
        .map_err(|e| ExtractError::io(path, e))
}

#[cfg(not(unix))]
fn make_permissive(path: &Path) -> Result<(), ExtractError> {
    let mut permissions = fs::metadata(path)
        .map_err(|e| ExtractError::io(path, e))?
        .permissions();
    permissions.set_readonly(false);

    fs::set_permissions(path, permissions).map_err(|e| ExtractError::io(path, e))
}
