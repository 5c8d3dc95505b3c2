//! Durable storage for the catalog checkpoint document.
//!
//! Every save serializes the whole catalog and replaces the file in one
//! rename, so a crash mid-write leaves the previous checkpoint intact.
//! There is exactly one writer; no cross-process locking is attempted.

use std::io::Write;
use std::path::{Path, PathBuf};

use geoscout_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Catalog;

/// Anything that can make the current in-memory catalog durable.
///
/// Implementations must persist the full state passed in, never a delta.
pub trait CheckpointSink: Send + Sync {
    fn checkpoint(&self, catalog: &Catalog) -> Result<()>;
}

/// File-backed catalog store.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<Catalog> {
        load_catalog(&self.path)
    }

    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        save_catalog(&self.path, catalog)
    }
}

impl CheckpointSink for CatalogStore {
    fn checkpoint(&self, catalog: &Catalog) -> Result<()> {
        self.save(catalog)?;
        debug!(path = %self.path.display(), "Checkpoint written");
        Ok(())
    }
}

/// Read a catalog document.
///
/// # Errors
///
/// - [`Error::NotFound`] if nothing exists at `path`.
/// - [`Error::CorruptState`] if the file is not a catalog.
/// - [`Error::Io`] for any other read failure.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    // Directory depth is unbounded; grow the stack instead of capping nesting.
    let mut de = serde_json::Deserializer::from_slice(&bytes);
    de.disable_recursion_limit();
    let catalog = Catalog::deserialize(serde_stacker::Deserializer::new(&mut de))
        .map_err(|e| Error::corrupt_state(path, e))?;
    de.end().map_err(|e| Error::corrupt_state(path, e))?;

    Ok(catalog)
}

/// Write a catalog document, replacing any previous one atomically.
pub fn save_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    catalog
        .serialize(&mut ser)
        .map_err(|e| Error::Io(e.into()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&buf)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    Ok(())
}
