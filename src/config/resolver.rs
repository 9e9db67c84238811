//! Dotted-path configuration lookups.
//!
//! A path such as `uploads.profiles.avatar` names a config document by its
//! first segment (`uploads`) and walks the remaining segments as object keys,
//! or as array indices when numeric.

use crate::models::UploadOptions;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolves named configuration values, falling back to a caller default
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, path: &str, default: Value) -> Value;
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config document name: {0}")]
    InvalidName(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn lookup<'a, 'p>(mut value: &'a Value, segments: impl Iterator<Item = &'p str>) -> Option<&'a Value> {
    for segment in segments {
        value = match value {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// Reads `<dir>/<document>.json` on every lookup
#[derive(Debug, Clone)]
pub struct JsonConfigResolver {
    dir: PathBuf,
}

impl JsonConfigResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads one config document; `Ok(None)` when the file does not exist
    pub fn load_document(&self, name: &str) -> Result<Option<Value>, ConfigError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ConfigError::InvalidName(name.to_string()));
        }

        let path = self.dir.join(format!("{}.json", name));
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| ConfigError::Parse { path, source })
    }
}

impl ConfigResolver for JsonConfigResolver {
    fn resolve(&self, path: &str, default: Value) -> Value {
        let mut segments = path.split('.');
        let Some(name) = segments.next() else {
            return default;
        };

        match self.load_document(name) {
            Ok(Some(document)) => lookup(&document, segments).cloned().unwrap_or(default),
            Ok(None) => {
                tracing::debug!("Config document '{}' not found in {:?}", name, self.dir);
                default
            }
            Err(e) => {
                tracing::warn!("Config lookup '{}' failed: {}", path, e);
                default
            }
        }
    }
}

/// In-memory resolver whose top-level keys play the role of documents
#[derive(Debug, Clone, Default)]
pub struct StaticConfigResolver {
    root: Value,
}

impl StaticConfigResolver {
    pub fn new(root: Value) -> Self {
        Self { root }
    }
}

impl ConfigResolver for StaticConfigResolver {
    fn resolve(&self, path: &str, default: Value) -> Value {
        lookup(&self.root, path.split('.'))
            .cloned()
            .unwrap_or(default)
    }
}

/// Name of the profile that exists even when not configured
pub const DEFAULT_PROFILE: &str = "default";

/// Looks up the named upload profile at `uploads.profiles.<name>`.
///
/// Returns `Ok(None)` for unknown profiles, except `default` which falls back
/// to unrestricted options.
pub fn upload_profile(
    resolver: &dyn ConfigResolver,
    name: &str,
) -> Result<Option<UploadOptions>, serde_json::Error> {
    if name.is_empty() || name.contains('.') {
        return Ok(None);
    }

    match resolver.resolve(&format!("uploads.profiles.{}", name), Value::Null) {
        Value::Null if name == DEFAULT_PROFILE => Ok(Some(UploadOptions::default())),
        Value::Null => Ok(None),
        value => serde_json::from_value(value).map(Some),
    }
}
