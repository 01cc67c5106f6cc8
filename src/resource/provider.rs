use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, ErrorKind, Read};
use std::path::{Component, Path, PathBuf};

use crate::error::{AtlasError, Result};

/// Source of encoded image bytes keyed by a path-like identifier.
///
/// The returned reader is released when dropped, so callers hold the
/// resource only for as long as they keep the reader.
pub trait ResourceProvider: Sync {
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>>;

    /// Read the whole resource into memory
    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let mut reader = self.open(path)?;
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| AtlasError::ResourceRead {
                path: path.to_string(),
                source: e,
            })?;
        Ok(bytes)
    }
}

/// Resources compiled into the binary, e.g. with `include_bytes!`
#[derive(Debug, Default, Clone)]
pub struct EmbeddedResources {
    entries: HashMap<String, &'static [u8]>,
}

impl EmbeddedResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, bytes: &'static [u8]) -> Self {
        self.insert(path, bytes);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: &'static [u8]) {
        self.entries.insert(path.into(), bytes);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceProvider for EmbeddedResources {
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>> {
        let bytes = self
            .entries
            .get(path)
            .ok_or_else(|| AtlasError::ResourceNotFound(path.to_string()))?;
        Ok(Box::new(Cursor::new(*bytes)))
    }
}

/// Resources stored as files below a root directory
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` below the root, refusing anything that climbs out of it
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl ResourceProvider for DirectoryResources {
    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>> {
        let full = self
            .resolve(path)
            .ok_or_else(|| AtlasError::ResourceNotFound(path.to_string()))?;

        match File::open(&full) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AtlasError::ResourceNotFound(path.to_string()))
            }
            Err(e) => Err(AtlasError::ResourceRead {
                path: path.to_string(),
                source: e,
            }),
        }
    }
}
