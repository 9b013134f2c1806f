//! Object storage collaborators.
//!
//! Presets (`luts/<name>.cube`) and cached textures (`textures/<key>.png`)
//! are read and written through an [`ObjectStore`]. The host application
//! supplies its own implementation; [`MemoryStore`] and [`FsStore`] cover
//! tests and single-machine deployments.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

#[allow(unused_imports)]
use tracing::{debug, trace};

use crate::{EngineError, EngineResult};

/// Byte storage addressed by `/`-separated keys.
pub trait ObjectStore: Send + Sync {
    /// Reads an object; `Ok(None)` when the key is absent.
    fn read_bytes(&self, key: &str) -> EngineResult<Option<Vec<u8>>>;

    /// Writes an object and returns its URL.
    fn write_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> EngineResult<String>;

    /// URL an object is (or would be) served from.
    fn url(&self, key: &str) -> String;
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded for `key`.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|m| m.get(key).map(|(_, ct)| ct.clone()))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map_or(0, |m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn read_bytes(&self, key: &str) -> EngineResult<Option<Vec<u8>>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| EngineError::Store("memory store lock poisoned".into()))?;
        Ok(objects.get(key).map(|(bytes, _)| bytes.clone()))
    }

    fn write_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> EngineResult<String> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| EngineError::Store("memory store lock poisoned".into()))?;
        objects.insert(key.to_string(), (bytes.to_vec(), content_type.to_string()));
        trace!(key, len = bytes.len(), content_type, "stored object");
        Ok(self.url(key))
    }

    fn url(&self, key: &str) -> String {
        format!("memory://{key}")
    }
}

/// Store rooted at a local directory; keys map to relative paths.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Store rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `key` below the root, rejecting absolute paths and `..`.
    fn path(&self, key: &str) -> EngineResult<PathBuf> {
        let rel = Path::new(key);
        let safe = !key.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(EngineError::Store(format!("invalid key: {key:?}")));
        }
        Ok(self.root.join(rel))
    }
}

impl ObjectStore for FsStore {
    fn read_bytes(&self, key: &str) -> EngineResult<Option<Vec<u8>>> {
        let path = self.path(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::Store(format!("{}: {e}", path.display()))),
        }
    }

    fn write_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> EngineResult<String> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EngineError::Store(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(&path, bytes).map_err(|e| EngineError::Store(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), len = bytes.len(), content_type, "wrote object");
        Ok(self.url(key))
    }

    fn url(&self, key: &str) -> String {
        format!("file://{}", self.root.join(key).display())
    }
}
