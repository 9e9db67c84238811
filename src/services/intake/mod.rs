//! Synchronous upload intake: normalize each field, validate each file, then
//! persist the ones that pass, collecting one outcome entry per file.

pub mod normalize;
pub mod persist;
pub mod validate;

use crate::config::IntakeConfig;
use crate::models::{FieldValue, UploadField, UploadOptions, UploadOutcome};
use crate::utils::public_url::PublicUrl;
use persist::Persister;

pub struct Intake {
    persister: Persister,
}

impl Intake {
    pub fn new(config: &IntakeConfig) -> Self {
        let public_url = PublicUrl::new(&config.storage_root, config.public_base_url.clone());
        Self {
            persister: Persister::new(&config.uploads_dir, public_url),
        }
    }

    /// Processes every submitted field in order.
    ///
    /// Never fails as a whole: each file of each non-ignored field ends up in
    /// exactly one of `successes` or `errors`.
    pub fn process<I, S>(&self, fields: I, options: &UploadOptions) -> UploadOutcome
    where
        I: IntoIterator<Item = (S, FieldValue)>,
        S: Into<String>,
    {
        let mut outcome = UploadOutcome::default();
        for (name, value) in fields {
            let field = normalize::normalize_field(name, value);
            self.process_field(&field, options, &mut outcome);
        }

        tracing::info!(
            stored = outcome.successes.values().map(|f| f.len()).sum::<usize>(),
            failed = outcome.errors.values().map(|f| f.len()).sum::<usize>(),
            "Upload intake finished"
        );
        outcome
    }

    fn process_field(&self, field: &UploadField, options: &UploadOptions, outcome: &mut UploadOutcome) {
        if validate::is_ignored(&field.name, options) {
            tracing::debug!(field = %field.name, "Skipping ignored field");
            return;
        }

        for (index, item) in field.files.iter().enumerate() {
            let result = validate::check(item, index, options)
                .inspect_err(|kind| {
                    tracing::debug!(
                        field = %field.name,
                        index,
                        file = %item.original_name,
                        "Rejected upload: {}",
                        kind
                    )
                })
                .and_then(|()| self.persister.persist(item, index, options));

            match result {
                Ok(url) => {
                    tracing::info!(field = %field.name, index, url = %url, "Stored upload");
                    outcome.record_success(&field.name, index, url);
                }
                Err(kind) => outcome.record_error(&field.name, index, kind),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, FileItem, TransportStatus};
    use std::fs;
    use std::path::Path;

    fn setup() -> (tempfile::TempDir, Intake) {
        let root = tempfile::tempdir().unwrap();
        let mut config = IntakeConfig::development(root.path());
        config.public_base_url = "http://localhost:3000/".to_string();
        let intake = Intake::new(&config);
        (root, intake)
    }

    fn temp_file(dir: &Path, name: &str, contents: &[u8]) -> FileItem {
        let incoming = dir.join("incoming");
        fs::create_dir_all(&incoming).unwrap();
        let path = incoming.join(format!("{}.tmp", name.replace('.', "_")));
        fs::write(&path, contents).unwrap();
        FileItem::new(name, contents.len() as u64, path)
    }

    #[test]
    fn test_ignored_field_has_no_entries() {
        let (root, intake) = setup();
        let item = temp_file(root.path(), "a.txt", b"abc");
        let options = UploadOptions::default().ignore("token");

        let outcome = intake.process([("token", FieldValue::One(item.clone()))], &options);
        assert!(outcome.is_empty());
        assert!(item.temp_path.exists());
    }

    #[test]
    fn test_every_file_gets_exactly_one_entry() {
        let (root, intake) = setup();
        let ok = temp_file(root.path(), "ok.txt", b"fine");
        let big = temp_file(root.path(), "big.txt", b"too large");
        let missing = FileItem::new("", 0, root.path().join("nothing"))
            .with_status(TransportStatus::NoFile);
        let options = UploadOptions::default().max_size([(1, 4)]);

        let outcome = intake.process(
            [("docs", FieldValue::Many(vec![ok, big, missing]))],
            &options,
        );

        assert_eq!(outcome.len(), 3);
        assert!(outcome.success("docs", 0).is_some());
        assert_eq!(outcome.error("docs", 1), Some(ErrorKind::SizeExceeded));
        assert_eq!(outcome.error("docs", 2), Some(ErrorKind::NoFile));
    }

    #[test]
    fn test_failure_does_not_stop_later_fields() {
        let (root, intake) = setup();
        let bad = FileItem::new("gone.txt", 3, root.path().join("gone.tmp"));
        let good = temp_file(root.path(), "kept.txt", b"abc");

        let outcome = intake.process(
            [
                ("first", FieldValue::One(bad)),
                ("second", FieldValue::One(good)),
            ],
            &UploadOptions::default(),
        );

        assert_eq!(outcome.error("first", 0), Some(ErrorKind::MoveFailed));
        assert_eq!(
            outcome.success("second", 0),
            Some("http://localhost:3000/uploads/kept.txt")
        );
        assert!(root.path().join("uploads/kept.txt").is_file());
    }
}
