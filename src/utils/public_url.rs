use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use std::path::{Component, Path, PathBuf};

/// Characters escaped inside one URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Translates saved file paths under a storage root into public URLs
#[derive(Debug, Clone)]
pub struct PublicUrl {
    storage_root: PathBuf,
    base_url: String,
}

impl PublicUrl {
    pub fn new(storage_root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            storage_root: storage_root.into(),
            base_url: base_url.into(),
        }
    }

    /// Public URL for a saved path.
    ///
    /// The storage root prefix is replaced by the base URL and platform
    /// separators become `/`. Paths outside the root keep their full path,
    /// separators normalized.
    pub fn for_path(&self, saved: &Path) -> String {
        match saved.strip_prefix(&self.storage_root) {
            Ok(relative) => {
                let segments: Vec<String> = relative
                    .components()
                    .filter_map(|component| match component {
                        Component::Normal(part) => Some(part.to_string_lossy()),
                        _ => None,
                    })
                    .flat_map(|part| {
                        // Backslashes are separators on the wire even on unix
                        part.split('\\')
                            .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
                            .collect::<Vec<_>>()
                    })
                    .collect();
                format!(
                    "{}/{}",
                    self.base_url.trim_end_matches('/'),
                    segments.join("/")
                )
            }
            Err(_) => {
                tracing::debug!(
                    "Saved path {:?} is outside storage root {:?}",
                    saved,
                    self.storage_root
                );
                saved.to_string_lossy().replace('\\', "/")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_under_root() {
        let urls = PublicUrl::new("/var/www/site/", "https://example.com/");
        assert_eq!(
            urls.for_path(Path::new("/var/www/site/data/uploads/photo.png")),
            "https://example.com/data/uploads/photo.png"
        );
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let urls = PublicUrl::new("/srv", "http://localhost:3000");
        assert_eq!(
            urls.for_path(Path::new("/srv/uploads/a.txt")),
            "http://localhost:3000/uploads/a.txt"
        );
    }

    #[test]
    fn test_segments_are_escaped() {
        let urls = PublicUrl::new("/srv", "http://localhost");
        assert_eq!(
            urls.for_path(Path::new("/srv/uploads/my report#1.pdf")),
            "http://localhost/uploads/my%20report%231.pdf"
        );
    }

    #[test]
    fn test_root_is_component_aware() {
        let urls = PublicUrl::new("/data", "http://localhost");
        assert_eq!(
            urls.for_path(Path::new("/database/file.txt")),
            "/database/file.txt"
        );
    }
}
