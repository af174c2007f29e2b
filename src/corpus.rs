use crate::error::{HarvestError, Result};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Renames done by a lowercase pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// `(from, to)` for every renamed file
    pub renamed: Vec<(PathBuf, PathBuf)>,
    /// Files left alone because their lowercase name was taken
    pub collisions: Vec<PathBuf>,
}

/// Every file under `dir`, recursively, whose name ends with `extension` in any case
///
/// Paths are absolute when `dir` is, and sorted.
pub fn find_documents(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let extension = extension.to_lowercase();
    let mut found = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_string_lossy()
                .to_lowercase()
                .ends_with(&extension)
        {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

fn walk_error(dir: &Path, e: walkdir::Error) -> HarvestError {
    let path = e.path().unwrap_or(dir).to_path_buf();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    HarvestError::fs(path, source)
}

/// Renames every document whose name has an uppercase letter to its lowercase form
///
/// Files stay in their directory. A rename whose lowercase name already exists
/// in the directory is not performed and is reported as a collision.
pub fn normalize_names(dir: &Path, extension: &str) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();

    for path in find_documents(dir, extension)? {
        match lowercase_file_name(&path) {
            Ok(Some(target)) => report.renamed.push((path, target)),
            Ok(None) => {}
            Err(RenameError::Collision(target)) => {
                ::log::warn!(
                    "Not renaming {}: {} already exists",
                    path.display(),
                    target.display()
                );
                report.collisions.push(path);
            }
            Err(RenameError::Io(e)) => ::log::error!("Failed to rename: {}", e),
        }
    }

    Ok(report)
}

enum RenameError {
    Collision(PathBuf),
    Io(HarvestError),
}

/// Renames `path` to its lowercase name; `Ok(None)` when already lowercase
fn lowercase_file_name(path: &Path) -> std::result::Result<Option<PathBuf>, RenameError> {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(None);
    };
    if !name.chars().any(char::is_uppercase) {
        return Ok(None);
    }

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let lower = name.to_lowercase();
    let target = parent.join(&lower);

    // Exact-name lookup so that case-insensitive filesystems don't see the file itself
    if name_taken(parent, &lower).map_err(RenameError::Io)? {
        return Err(RenameError::Collision(target));
    }

    fs::rename(path, &target).map_err(|e| RenameError::Io(HarvestError::fs(path, e)))?;
    ::log::info!("Renamed {} -> {}", path.display(), lower);
    Ok(Some(target))
}

fn name_taken(dir: &Path, name: &str) -> Result<bool> {
    let entries = fs::read_dir(dir).map_err(|e| HarvestError::fs(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| HarvestError::fs(dir, e))?;
        if entry.file_name().to_string_lossy() == name {
            return Ok(true);
        }
    }
    Ok(false)
}
