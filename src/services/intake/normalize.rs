use crate::models::{FieldValue, FileItem, UploadField};

/// Flattens a one-or-many field value into files in submission order
pub fn normalize(value: FieldValue) -> Vec<FileItem> {
    match value {
        FieldValue::One(item) => vec![item],
        FieldValue::Many(items) => items,
    }
}

pub fn normalize_field(name: impl Into<String>, value: FieldValue) -> UploadField {
    UploadField {
        name: name.into(),
        files: normalize(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_becomes_sequence() {
        let item = FileItem::new("a.png", 1, "/tmp/a");
        let field = normalize_field("avatar", FieldValue::One(item.clone()));
        assert_eq!(field.name, "avatar");
        assert_eq!(field.files, vec![item]);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let a = FileItem::new("a.txt", 1, "/tmp/a");
        let b = FileItem::new("b.txt", 2, "/tmp/b");
        let files = normalize(FieldValue::Many(vec![b.clone(), a.clone(), b.clone()]));
        assert_eq!(files, vec![b.clone(), a, b]);
    }

    #[test]
    fn test_empty_list_stays_empty() {
        assert!(normalize(FieldValue::Many(Vec::new())).is_empty());
    }
}
