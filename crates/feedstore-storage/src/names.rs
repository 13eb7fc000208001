//! Mapping between storage keys and file names.
//!
//! Keys and journal names are arbitrary strings (`ss::`, `_session:` and so
//! on), so they are stored hex-encoded with a fixed extension. A name whose
//! encoding would not fit in one path component has no plain file name;
//! callers fall back to [`hashed_file_path`].

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

pub(crate) const CONTENT_EXTENSION: &str = "entry";
/// Content files named by key digest; the key is stored in the file.
pub(crate) const KEYED_CONTENT_EXTENSION: &str = "keyed";
pub(crate) const JOURNAL_EXTENSION: &str = "journal";

/// Longest file name accepted by common filesystems, in bytes.
pub(crate) const MAX_FILE_NAME: usize = 255;

/// File path for `name` inside `dir`, or `None` if the encoded name would
/// exceed [`MAX_FILE_NAME`].
pub(crate) fn file_path(dir: &Path, name: &str, extension: &str) -> Option<PathBuf> {
    let file_name = format!("{}.{extension}", hex::encode(name.as_bytes()));
    (file_name.len() <= MAX_FILE_NAME).then(|| dir.join(file_name))
}

/// Fixed-length file path for `name` inside `dir`, derived from its BLAKE3
/// digest. The name cannot be recovered from the path.
pub(crate) fn hashed_file_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{extension}", blake3::hash(name.as_bytes()).to_hex()))
}

/// Recover the storage name from a file name, or `None` if the file was not
/// written by us.
pub(crate) fn decode_file_name(file_name: &OsStr, extension: &str) -> Option<String> {
    let stem = strip_extension(file_name, extension)?;
    let bytes = hex::decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

/// Returns `true` if `file_name` carries `extension`.
pub(crate) fn has_extension(file_name: &OsStr, extension: &str) -> bool {
    strip_extension(file_name, extension).is_some()
}

fn strip_extension<'a>(file_name: &'a OsStr, extension: &str) -> Option<&'a str> {
    file_name.to_str()?.strip_suffix(extension)?.strip_suffix('.')
}
