use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Bad workspace directory '{path}': does not exist")]
    Missing { path: PathBuf },
    #[error("Bad workspace directory '{path}': not a directory")]
    NotADirectory { path: PathBuf },
    #[error("Bad workspace directory '{path}': not writable ({source})")]
    NotWritable { path: PathBuf, source: io::Error },
}

/// A validated directory the engine's input and output files live in.
///
/// Construction checks that the path exists, is a directory, and accepts new files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WorkspaceError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WorkspaceError::Missing {
                path: path.to_path_buf(),
            });
        }
        if !path.is_dir() {
            return Err(WorkspaceError::NotADirectory {
                path: path.to_path_buf(),
            });
        }
        // The check file is removed as soon as it drops.
        tempfile::Builder::new()
            .prefix(".amp-write-check")
            .tempfile_in(path)
            .map_err(|source| WorkspaceError::NotWritable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}
