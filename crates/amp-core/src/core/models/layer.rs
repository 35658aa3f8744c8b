use std::path::{Path, PathBuf};

/// An environmental raster grid used as a covariate source.
///
/// The name is the final component of the path (`bio1.asc` for `/data/bio1.asc`) and is the
/// key under which the service registers the layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Layer {
    path: PathBuf,
    name: String,
}

impl Layer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The variable name the engine uses for this layer's column: the file name without
    /// its extension.
    pub fn variable(&self) -> &str {
        match self.name.rfind('.') {
            Some(0) | None => &self.name,
            Some(idx) => &self.name[..idx],
        }
    }
}

impl From<&Path> for Layer {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for Layer {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}
