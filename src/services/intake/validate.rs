use crate::models::{ErrorKind, FileItem, UploadOptions};

/// Whether the whole field is excluded from processing and from the outcome
pub fn is_ignored(field: &str, options: &UploadOptions) -> bool {
    options.ignore.contains(field)
}

/// Runs the per-file checks in order, stopping at the first failure:
/// transport status, size ceiling for the file's index, extension allow-list.
pub fn check(item: &FileItem, index: usize, options: &UploadOptions) -> Result<(), ErrorKind> {
    if !item.status.is_ok() {
        return Err(ErrorKind::NoFile);
    }

    if let Some(ceiling) = options
        .max_size
        .as_ref()
        .and_then(|max_size| max_size.ceiling_for(index))
    {
        if item.size > ceiling {
            return Err(ErrorKind::SizeExceeded);
        }
    }

    if let Some(allowed) = &options.extensions {
        if !allowed.contains(&item.extension()) {
            return Err(ErrorKind::ExtensionDenied);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransportStatus;

    fn file(name: &str, size: u64) -> FileItem {
        FileItem::new(name, size, "/tmp/upload")
    }

    #[test]
    fn test_no_policy_accepts_everything() {
        let options = UploadOptions::default();
        assert_eq!(check(&file("anything.exe", u64::MAX), 3, &options), Ok(()));
        assert_eq!(check(&file("README", 0), 0, &options), Ok(()));
    }

    #[test]
    fn test_transport_failure_is_no_file() {
        let options = UploadOptions::default();
        for status in [
            TransportStatus::SizeExceeded,
            TransportStatus::Partial,
            TransportStatus::NoFile,
            TransportStatus::Failed,
        ] {
            let item = file("a.png", 1).with_status(status);
            assert_eq!(check(&item, 0, &options), Err(ErrorKind::NoFile));
        }
    }

    #[test]
    fn test_size_ceiling_per_index() {
        let options = UploadOptions::default().max_size([(1, 100)]);
        assert_eq!(check(&file("a.txt", 500), 0, &options), Ok(()));
        assert_eq!(check(&file("a.txt", 100), 1, &options), Ok(()));
        assert_eq!(
            check(&file("a.txt", 101), 1, &options),
            Err(ErrorKind::SizeExceeded)
        );
    }

    #[test]
    fn test_size_checked_before_extension() {
        let options = UploadOptions::default()
            .max_size(10u64)
            .extensions(["png"]);
        assert_eq!(
            check(&file("virus.exe", 11), 0, &options),
            Err(ErrorKind::SizeExceeded)
        );
        assert_eq!(
            check(&file("virus.exe", 10), 0, &options),
            Err(ErrorKind::ExtensionDenied)
        );
    }

    #[test]
    fn test_extension_compared_lower_cased() {
        let options = UploadOptions::default().extensions(["png", "jpg"]);
        assert_eq!(check(&file("photo.PNG", 1), 0, &options), Ok(()));
        assert_eq!(
            check(&file("photo", 1), 0, &options),
            Err(ErrorKind::ExtensionDenied)
        );
    }

    #[test]
    fn test_ignored_fields() {
        let options = UploadOptions::default().ignore("csrf");
        assert!(is_ignored("csrf", &options));
        assert!(!is_ignored("avatar", &options));
    }
}
