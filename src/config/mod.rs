pub mod resolver;

use serde_json::Value;
use std::env;
use std::path::PathBuf;

pub use resolver::{ConfigResolver, JsonConfigResolver, StaticConfigResolver, upload_profile};

/// Configuration of the intake pipeline and its HTTP transport
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Filesystem root that maps onto `public_base_url` (default: "./data/")
    pub storage_root: PathBuf,

    /// Default destination when a call names no directory (default: "<storage_root>/uploads")
    pub uploads_dir: PathBuf,

    /// Public URL prefix of `storage_root` (default: "http://127.0.0.1:3000/")
    pub public_base_url: String,

    /// Per-file transport ceiling in bytes (default: 64 MB)
    pub max_file_size: usize,

    /// Whole-request body limit in bytes (default: 256 MB)
    pub max_request_size: usize,

    /// Directory holding `<name>.json` files for dotted-path lookups (default: "./config")
    pub config_dir: PathBuf,

    /// Port for the API server (default: 3000)
    pub port: u16,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        let storage_root = PathBuf::from("./data/");
        Self {
            uploads_dir: storage_root.join("uploads"),
            storage_root,
            public_base_url: "http://127.0.0.1:3000/".to_string(),
            max_file_size: 64 * 1024 * 1024,     // 64 MB
            max_request_size: 256 * 1024 * 1024, // 256 MB
            config_dir: PathBuf::from("./config"),
            port: 3000,
        }
    }
}

impl IntakeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let storage_root = env::var("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or(default.storage_root);

        Self {
            uploads_dir: env::var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| storage_root.join("uploads")),

            storage_root,

            public_base_url: env::var("PUBLIC_BASE_URL").unwrap_or(default.public_base_url),

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_request_size: env::var("MAX_REQUEST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_request_size),

            config_dir: env::var("CONFIG_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.config_dir),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.port),
        }
    }

    /// Config rooted at a given directory, for local runs and tests
    pub fn development(storage_root: impl Into<PathBuf>) -> Self {
        let storage_root = storage_root.into();
        Self {
            uploads_dir: storage_root.join("uploads"),
            storage_root,
            public_base_url: "http://localhost:3000/".to_string(),
            max_file_size: 1024 * 1024 * 1024,
            max_request_size: 1024 * 1024 * 1024,
            ..Self::default()
        }
    }

    /// Applies values found through the dotted-path resolver on top of this config.
    ///
    /// `uploads.root` replaces the default uploads directory and
    /// `app.urls.server` the public base URL.
    pub fn with_resolver(mut self, resolver: &dyn ConfigResolver) -> Self {
        if let Value::String(dir) = resolver.resolve("uploads.root", Value::Null) {
            if !dir.trim().is_empty() {
                self.uploads_dir = PathBuf::from(dir);
            }
        }
        if let Value::String(url) = resolver.resolve("app.urls.server", Value::Null) {
            if !url.trim().is_empty() {
                self.public_base_url = url;
            }
        }
        self
    }
}
