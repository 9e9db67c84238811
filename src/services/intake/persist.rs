use crate::models::{ErrorKind, FileItem, UploadOptions};
use crate::utils::public_url::PublicUrl;
use crate::utils::validation::{MAX_NAME_LEN, truncate_utf8};
use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Moves validated files into their destination directory
#[derive(Debug, Clone)]
pub struct Persister {
    default_dir: PathBuf,
    public_url: PublicUrl,
}

impl Persister {
    pub fn new(default_dir: impl Into<PathBuf>, public_url: PublicUrl) -> Self {
        Self {
            default_dir: default_dir.into(),
            public_url,
        }
    }

    /// Destination directory for a call, ending with exactly one separator
    pub fn resolve_directory(&self, options: &UploadOptions) -> String {
        let dir = options
            .directory
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.default_dir.to_string_lossy().into_owned());
        with_trailing_separator(&dir)
    }

    /// Stores one file and returns its public URL
    pub fn persist(
        &self,
        item: &FileItem,
        index: usize,
        options: &UploadOptions,
    ) -> Result<String, ErrorKind> {
        let dir = self.resolve_directory(options);

        ensure_directory(Path::new(&dir)).map_err(|e| {
            tracing::warn!(directory = %dir, error = %e, "Failed to create upload directory");
            ErrorKind::PathCreationFailed
        })?;

        let filename = derive_filename(item, index, options.filename.as_deref());
        let destination = PathBuf::from(format!("{}{}", dir, filename));

        move_file(&item.temp_path, &destination).map_err(|e| {
            tracing::warn!(
                from = ?item.temp_path,
                to = ?destination,
                error = %e,
                "Failed to move uploaded file"
            );
            ErrorKind::MoveFailed
        })?;

        Ok(self.public_url.for_path(&destination))
    }
}

fn with_trailing_separator(dir: &str) -> String {
    let trimmed = dir.trim_end_matches(['/', MAIN_SEPARATOR]);
    format!("{}{}", trimmed, MAIN_SEPARATOR)
}

/// Creates the directory and its parents if missing.
///
/// A directory that exists by the time creation fails (a concurrent call won
/// the race) counts as created.
pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o775);
    }

    match builder.create(dir) {
        Ok(()) => {
            tracing::debug!("Created upload directory {:?}", dir);
            Ok(())
        }
        Err(_) if dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Stored filename for the file at `index` of its field.
///
/// With an override, files after the first get an `_<index>` suffix ahead of
/// the extension. An override containing a `.` (other than a leading one)
/// carries its own extension; otherwise the file's lower-cased extension is
/// appended. Without an override the sanitized client stem is kept.
///
/// The base name is shortened so the whole name fits in `MAX_NAME_LEN` bytes.
pub fn derive_filename(item: &FileItem, index: usize, override_name: Option<&str>) -> String {
    let override_name = override_name.filter(|name| !name.is_empty());

    let (base, tail): (Cow<'_, str>, String) = match override_name {
        Some(name) => match name.rfind('.') {
            Some(dot) if dot > 0 => (Cow::Borrowed(&name[..dot]), name[dot..].to_string()),
            _ if name.contains('.') => (Cow::Borrowed(name), String::new()),
            _ => (Cow::Borrowed(name), extension_tail(item)),
        },
        None => (Cow::Owned(item.stem()), extension_tail(item)),
    };

    let suffix = match override_name {
        Some(_) if index > 0 => format!("_{}", index),
        _ => String::new(),
    };

    let budget = MAX_NAME_LEN.saturating_sub(suffix.len() + tail.len());
    let name = format!("{}{}{}", truncate_utf8(&base, budget), suffix, tail);
    truncate_utf8(&name, MAX_NAME_LEN).to_string()
}

fn extension_tail(item: &FileItem) -> String {
    let extension = item.extension();
    if extension.is_empty() {
        extension
    } else {
        format!(".{}", extension)
    }
}

/// Moves a file, falling back to a copy when a plain rename is not possible
/// (temp dir on another filesystem).
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };

    if !from.is_file() {
        return Err(rename_err);
    }

    copy_into_place(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        tracing::warn!("Moved {:?} by copy but could not remove it: {}", from, e);
    }
    Ok(())
}

/// Copies into a hidden sibling of `to` and renames it over `to` once complete,
/// so a failed copy never leaves a truncated file at the destination.
fn copy_into_place(from: &Path, to: &Path) -> io::Result<()> {
    let dir = match to.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut staged = tempfile::Builder::new()
        .prefix(".intake-")
        .tempfile_in(dir)?;
    let mut source = fs::File::open(from)?;
    io::copy(&mut source, staged.as_file_mut())?;
    staged.as_file().sync_all()?;
    staged.persist(to).map_err(|e| e.error)?;
    Ok(())
}
