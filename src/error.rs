use std::path::PathBuf;

use thiserror::Error;

/// Library error type for slideshow operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The folder picker was dismissed without choosing anything.
    #[error("no folders selected")]
    NoSelection,

    /// The scan completed but found no images under any root.
    #[error("no images found in the selected folders")]
    EmptyCatalog,

    /// A folder or file could not be read while building the catalog.
    #[error("cannot read {}: {source}", path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// An image could not be loaded or scaled at display time.
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),

    /// Rendering/display error from the GPU layer.
    #[error("render error: {0}")]
    Render(anyhow::Error),
}

impl Error {
    /// Path this error is about, when it concerns a single file or folder.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Scan { path, .. } | Self::Decode { path, .. } => Some(path),
            _ => None,
        }
    }
}
