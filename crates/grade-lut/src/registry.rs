//! Named LUT presets.
//!
//! A [`LutRegistry`] is built once by the host application from a directory
//! of `.cube` files and handed to whoever needs to resolve preset names.
//! Presets are keyed by file stem: `presets/Teal Orange.cube` resolves as
//! `"Teal Orange"`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::{LutError, LutResult, LutVolume, cube};

/// Name -> volume map of preset LUTs.
#[derive(Debug, Clone, Default)]
pub struct LutRegistry {
    luts: BTreeMap<String, LutVolume>,
}

impl LutRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `*.cube` file in `dir`.
    ///
    /// Files that fail to parse are skipped with a warning; a missing or
    /// unreadable directory is an error.
    pub fn load<P: AsRef<Path>>(dir: P) -> LutResult<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_cube = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("cube"));
            if !is_cube {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            match cube::read_cube(&path) {
                Ok(lut) => {
                    debug!(name, size = lut.size(), "loaded preset");
                    registry.luts.insert(name.to_string(), lut);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable preset"),
            }
        }

        debug!(dir = %dir.display(), presets = registry.len(), "registry loaded");
        Ok(registry)
    }

    /// Adds or replaces a preset.
    pub fn insert(&mut self, name: impl Into<String>, lut: LutVolume) {
        self.luts.insert(name.into(), lut);
    }

    /// Looks up a preset by name.
    pub fn lookup(&self, name: &str) -> Option<&LutVolume> {
        self.luts.get(name)
    }

    /// Looks up a preset, failing with [`LutError::LutNotFound`].
    pub fn resolve(&self, name: &str) -> LutResult<&LutVolume> {
        self.lookup(name)
            .ok_or_else(|| LutError::LutNotFound(name.to_string()))
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.luts.keys().map(String::as_str)
    }

    /// Number of presets.
    pub fn len(&self) -> usize {
        self.luts.len()
    }

    /// Whether the registry holds no presets.
    pub fn is_empty(&self) -> bool {
        self.luts.is_empty()
    }
}
