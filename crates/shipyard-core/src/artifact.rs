//! Deployable artifacts: container images and size-bounded code packages.

use std::fmt;
use std::path::Path;

use crate::error::CoreError;

/// Largest code package the control plane accepts inline (20 MiB).
pub const MAX_PACKAGE_BYTES: u64 = 20 * 1024 * 1024;

/// Code to install on the mutable head of a function.
#[derive(Clone, PartialEq, Eq)]
pub enum Artifact {
    /// Container image: `repository:tag`.
    Image { repository: String, tag: String },
    /// Zip package uploaded inline.
    Package { bytes: Vec<u8> },
}

impl Artifact {
    pub fn image(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Artifact::Image {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    pub fn package(bytes: Vec<u8>) -> Self {
        Artifact::Package { bytes }
    }

    /// Load a package from disk.
    ///
    /// The on-disk size is checked before the file is read, so an oversized
    /// package is rejected without loading it.
    pub fn package_from_file(path: &Path) -> Result<Self, CoreError> {
        let read_err = |source| CoreError::ArtifactRead {
            path: path.to_path_buf(),
            source,
        };
        let size = std::fs::metadata(path).map_err(read_err)?.len();
        check_package_size(size)?;
        let bytes = std::fs::read(path).map_err(read_err)?;
        Ok(Artifact::Package { bytes })
    }

    /// Reject packages over [`MAX_PACKAGE_BYTES`]. Images always pass.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            Artifact::Image { .. } => Ok(()),
            Artifact::Package { bytes } => check_package_size(bytes.len() as u64),
        }
    }

    /// Image reference as pushed to the registry, if this is an image.
    pub fn image_uri(&self) -> Option<String> {
        match self {
            Artifact::Image { repository, tag } => Some(format!("{repository}:{tag}")),
            Artifact::Package { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Artifact::Image { .. } => "image",
            Artifact::Package { .. } => "package",
        }
    }
}

// Package bytes are never worth printing.
impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Image { repository, tag } => f
                .debug_struct("Image")
                .field("repository", repository)
                .field("tag", tag)
                .finish(),
            Artifact::Package { bytes } => f
                .debug_struct("Package")
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Image { repository, tag } => write!(f, "image {repository}:{tag}"),
            Artifact::Package { bytes } => write!(f, "package ({} bytes)", bytes.len()),
        }
    }
}

fn check_package_size(size: u64) -> Result<(), CoreError> {
    if size > MAX_PACKAGE_BYTES {
        return Err(CoreError::ArtifactTooLarge {
            size,
            limit: MAX_PACKAGE_BYTES,
        });
    }
    Ok(())
}
