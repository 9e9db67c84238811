/// Maximum length of a single stored filename component, in bytes
pub const MAX_NAME_LEN: usize = 255;

/// Fallback stem for client names that sanitize down to nothing
pub const UNNAMED: &str = "unnamed";

/// Returns the last path component of a client-supplied filename.
///
/// Browsers (and some older clients) may submit the full local path, using
/// either separator regardless of the server platform, so both are stripped.
pub fn client_basename(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Splits a client filename into its base name (without directories) and its
/// extension. A leading dot does not start an extension, so `.htaccess` has
/// an empty extension.
pub fn split_client_filename(filename: &str) -> (&str, &str) {
    let base = client_basename(filename);
    match base.rfind('.') {
        Some(0) | None => (base, ""),
        Some(dot) => (&base[..dot], &base[dot + 1..]),
    }
}

/// Sanitizes one filename component to prevent injection of path separators,
/// reserved characters and hidden files.
pub fn sanitize_component(component: &str) -> String {
    let sanitized: String = component
        .trim()
        .chars()
        .map(|c| {
            if c.is_control()
                || c == '/'
                || c == '\\'
                || c == ':'
                || c == '*'
                || c == '?'
                || c == '"'
                || c == '<'
                || c == '>'
                || c == '|'
                || c == ';'
            {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Never produce a hidden file
    let sanitized = match sanitized.strip_prefix('.') {
        Some(rest) => format!("_{}", rest),
        None => sanitized,
    };

    truncate_utf8(&sanitized, MAX_NAME_LEN).to_string()
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Sanitized, lower-cased extension of a client filename (empty if none)
pub fn normalized_extension(filename: &str) -> String {
    let (_, ext) = split_client_filename(filename);
    sanitize_component(&ext.to_lowercase())
}

/// Sanitized stem of a client filename, never empty
pub fn normalized_stem(filename: &str) -> String {
    let (stem, _) = split_client_filename(filename);
    let stem = sanitize_component(stem);
    if stem.is_empty() {
        if !filename.is_empty() {
            tracing::warn!("Client filename '{}' has no usable stem", filename);
        }
        UNNAMED.to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_basename() {
        assert_eq!(client_basename("photo.png"), "photo.png");
        assert_eq!(client_basename("../../../etc/passwd"), "passwd");
        assert_eq!(client_basename("C:\\Users\\me\\report.pdf"), "report.pdf");
        assert_eq!(client_basename("dir/"), "");
    }

    #[test]
    fn test_split_client_filename() {
        assert_eq!(split_client_filename("photo.PNG"), ("photo", "PNG"));
        assert_eq!(split_client_filename("archive.tar.gz"), ("archive.tar", "gz"));
        assert_eq!(split_client_filename("README"), ("README", ""));
        assert_eq!(split_client_filename(".htaccess"), (".htaccess", ""));
        assert_eq!(split_client_filename("trailing."), ("trailing", ""));
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("my file"), "my file");
        assert_eq!(sanitize_component("test<script>"), "test_script_");
        assert_eq!(sanitize_component("测试"), "测试");
        assert_eq!(sanitize_component(".hidden"), "_hidden");

        let long = "é".repeat(200);
        let sanitized = sanitize_component(&long);
        assert!(sanitized.len() <= MAX_NAME_LEN);
        assert!(sanitized.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate_utf8("short", 10), "short");
        assert_eq!(truncate_utf8("abcdef", 3), "abc");
        // 'é' is two bytes, never cut in half
        assert_eq!(truncate_utf8("éé", 3), "é");
        assert_eq!(truncate_utf8("abc", 0), "");
    }

    #[test]
    fn test_normalized_parts() {
        assert_eq!(normalized_extension("photo.PNG"), "png");
        assert_eq!(normalized_extension("README"), "");
        assert_eq!(normalized_stem("C:\\tmp\\photo.PNG"), "photo");
        assert_eq!(normalized_stem(""), UNNAMED);
        assert_eq!(normalized_stem(".png"), "_png");
    }
}
