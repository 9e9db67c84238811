use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use crate::utils::validation::{normalized_extension, normalized_stem};

/// Upstream signal telling whether a file arrived intact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportStatus {
    #[default]
    Ok,
    /// The transport's own size ceiling was hit while receiving
    SizeExceeded,
    /// The body was cut off mid-file
    Partial,
    /// The field was submitted without a file
    NoFile,
    /// Any other transport-side failure (temp file I/O, etc.)
    Failed,
}

impl TransportStatus {
    pub fn is_ok(self) -> bool {
        self == TransportStatus::Ok
    }
}

/// One physical uploaded file, already fully received into a temporary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    /// Filename as sent by the client
    pub original_name: String,
    pub status: TransportStatus,
    /// Size in bytes
    pub size: u64,
    /// Temporary location; the pipeline moves it away on success
    pub temp_path: PathBuf,
}

impl FileItem {
    pub fn new(original_name: impl Into<String>, size: u64, temp_path: impl Into<PathBuf>) -> Self {
        Self {
            original_name: original_name.into(),
            status: TransportStatus::Ok,
            size,
            temp_path: temp_path.into(),
        }
    }

    pub fn with_status(mut self, status: TransportStatus) -> Self {
        self.status = status;
        self
    }

    /// Lower-cased extension of the client filename, empty when it has none
    pub fn extension(&self) -> String {
        normalized_extension(&self.original_name)
    }

    /// Client filename without directories or extension
    pub fn stem(&self) -> String {
        normalized_stem(&self.original_name)
    }
}

/// Raw submitted value of a form field: a single file or a list of files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    One(FileItem),
    Many(Vec<FileItem>),
}

impl From<FileItem> for FieldValue {
    fn from(item: FileItem) -> Self {
        FieldValue::One(item)
    }
}

impl From<Vec<FileItem>> for FieldValue {
    fn from(items: Vec<FileItem>) -> Self {
        FieldValue::Many(items)
    }
}

/// A named form field with its files in submission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadField {
    pub name: String,
    pub files: Vec<FileItem>,
}

/// Size ceilings, either one value for every file of a field or keyed by the
/// file's index within its field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMaxSize", into = "RawMaxSize")]
pub enum MaxSize {
    Uniform(u64),
    PerIndex(BTreeMap<usize, u64>),
}

impl MaxSize {
    pub fn ceiling_for(&self, index: usize) -> Option<u64> {
        match self {
            MaxSize::Uniform(limit) => Some(*limit),
            MaxSize::PerIndex(limits) => limits.get(&index).copied(),
        }
    }
}

impl From<u64> for MaxSize {
    fn from(limit: u64) -> Self {
        MaxSize::Uniform(limit)
    }
}

impl<const N: usize> From<[(usize, u64); N]> for MaxSize {
    fn from(limits: [(usize, u64); N]) -> Self {
        MaxSize::PerIndex(limits.into_iter().collect())
    }
}

// JSON object keys are always strings, so per-index maps go through string keys.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawMaxSize {
    Uniform(u64),
    PerIndex(BTreeMap<String, u64>),
}

impl From<MaxSize> for RawMaxSize {
    fn from(max_size: MaxSize) -> Self {
        match max_size {
            MaxSize::Uniform(limit) => RawMaxSize::Uniform(limit),
            MaxSize::PerIndex(limits) => RawMaxSize::PerIndex(
                limits
                    .into_iter()
                    .map(|(index, limit)| (index.to_string(), limit))
                    .collect(),
            ),
        }
    }
}

impl TryFrom<RawMaxSize> for MaxSize {
    type Error = String;

    fn try_from(raw: RawMaxSize) -> Result<Self, Self::Error> {
        match raw {
            RawMaxSize::Uniform(limit) => Ok(MaxSize::Uniform(limit)),
            RawMaxSize::PerIndex(limits) => limits
                .into_iter()
                .map(|(index, limit)| {
                    index
                        .trim()
                        .parse::<usize>()
                        .map(|index| (index, limit))
                        .map_err(|_| format!("maxSize key '{}' is not a file index", index))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(MaxSize::PerIndex),
        }
    }
}

/// Per-call intake policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadOptions {
    /// Destination directory; empty or absent means the configured uploads root
    #[serde(alias = "path")]
    pub directory: Option<String>,
    pub max_size: Option<MaxSize>,
    /// Lower-case allowed extensions; absent means unrestricted
    #[serde(deserialize_with = "lowercase_extensions")]
    pub extensions: Option<BTreeSet<String>>,
    /// Field names skipped entirely
    pub ignore: BTreeSet<String>,
    /// Stored filename override
    pub filename: Option<String>,
}

fn lowercase_extensions<'de, D>(deserializer: D) -> Result<Option<BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let extensions = Option::<BTreeSet<String>>::deserialize(deserializer)?;
    Ok(extensions.map(|set| set.into_iter().map(|e| e.to_lowercase()).collect()))
}

impl UploadOptions {
    pub fn directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn max_size(mut self, max_size: impl Into<MaxSize>) -> Self {
        self.max_size = Some(max_size.into());
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = Some(
            extensions
                .into_iter()
                .map(|e| e.as_ref().to_lowercase())
                .collect(),
        );
        self
    }

    pub fn ignore(mut self, field: impl Into<String>) -> Self {
        self.ignore.insert(field.into());
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Why a file was not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[error("No file found")]
    NoFile,
    #[error("Size of file is too big")]
    SizeExceeded,
    #[error("File extension is not allowed")]
    ExtensionDenied,
    #[error("Create path failed")]
    PathCreationFailed,
    #[error("Upload failed")]
    MoveFailed,
}

/// Per-field, per-file report of one intake call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadOutcome {
    /// field -> file index -> public URL of the stored file
    #[schema(value_type = Object)]
    pub successes: BTreeMap<String, BTreeMap<usize, String>>,
    /// field -> file index -> error kind
    #[schema(value_type = Object)]
    pub errors: BTreeMap<String, BTreeMap<usize, ErrorKind>>,
}

impl UploadOutcome {
    pub(crate) fn record_success(&mut self, field: &str, index: usize, url: String) {
        debug_assert!(self.error(field, index).is_none());
        self.successes
            .entry(field.to_string())
            .or_default()
            .insert(index, url);
    }

    pub(crate) fn record_error(&mut self, field: &str, index: usize, kind: ErrorKind) {
        debug_assert!(self.success(field, index).is_none());
        self.errors
            .entry(field.to_string())
            .or_default()
            .insert(index, kind);
    }

    pub fn success(&self, field: &str, index: usize) -> Option<&str> {
        self.successes
            .get(field)
            .and_then(|files| files.get(&index))
            .map(String::as_str)
    }

    pub fn error(&self, field: &str, index: usize) -> Option<ErrorKind> {
        self.errors
            .get(field)
            .and_then(|files| files.get(&index))
            .copied()
    }

    /// Total number of recorded entries across both mappings
    pub fn len(&self) -> usize {
        self.successes.values().map(BTreeMap::len).sum::<usize>()
            + self.errors.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
