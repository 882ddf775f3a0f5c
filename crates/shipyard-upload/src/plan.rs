//! Mapping local paths to object keys.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{UploadError, UploadResult};

/// One file and the key it is uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadUnit {
    pub source: PathBuf,
    pub key: String,
}

/// Expand `source` into upload units.
///
/// A single file maps straight to `target`. A folder is walked recursively
/// and every file lands at `target/<relative path>`, using `/` separators
/// whatever the host platform.
pub fn plan_uploads(source: &Path, target: &str) -> UploadResult<Vec<UploadUnit>> {
    if source.is_file() {
        return Ok(vec![UploadUnit {
            source: source.to_path_buf(),
            key: target.to_string(),
        }]);
    }
    if !source.is_dir() {
        return Err(UploadError::SourceNotFound(source.to_path_buf()));
    }

    let mut units = Vec::new();
    for entry in WalkDir::new(source).sort_by_file_name() {
        let entry = entry.map_err(|e| UploadError::Walk {
            path: source.to_path_buf(),
            source: e,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        units.push(UploadUnit {
            source: entry.path().to_path_buf(),
            key: join_key(target, relative),
        });
    }
    Ok(units)
}

fn join_key(target: &str, relative: &Path) -> String {
    let relative: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let relative = relative.join("/");

    let target = target.trim_end_matches('/');
    if target.is_empty() {
        relative
    } else {
        format!("{target}/{relative}")
    }
}
