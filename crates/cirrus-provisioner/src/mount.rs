use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parent directory of the per-volume mount directories
#[derive(Debug, Clone)]
pub struct MountRoot {
    root: PathBuf,
}

impl MountRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mount directory for a volume name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Make sure `<root>/<name>` exists as a directory.
    ///
    /// The root itself must already exist. An existing directory counts as
    /// success; an existing non-directory does not.
    pub async fn ensure(&self, name: &str) -> io::Result<PathBuf> {
        let path = self.path_for(name);

        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                info!("Created mount directory {}", path.display());
                Ok(path)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let metadata = tokio::fs::metadata(&path).await?;
                if metadata.is_dir() {
                    debug!("Mount directory {} already exists", path.display());
                    Ok(path)
                } else {
                    Err(io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        format!("{} exists and is not a directory", path.display()),
                    ))
                }
            }
            Err(e) => Err(e),
        }
    }
}
