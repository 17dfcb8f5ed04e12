use std::ffi::OsString;
use std::path::{Path, PathBuf, MAIN_SEPARATOR_STR};

use crate::torrent::FileEntry;

/// Where `entry` lives on disk: the data directory, the torrent folder when
/// given, then the entry's path segments.
///
/// Segments are joined verbatim; none of them is interpreted as absolute.
pub fn resolve_path(
    entry: &FileEntry<'_>,
    data_dir: &Path,
    torrent_folder: Option<&[u8]>,
) -> PathBuf {
    let mut path = OsString::from(data_dir.as_os_str());
    path.push(MAIN_SEPARATOR_STR);
    if let Some(folder) = torrent_folder {
        path.push(segment(folder));
        path.push(MAIN_SEPARATOR_STR);
    }
    for (i, part) in entry.path.iter().enumerate() {
        if i > 0 {
            path.push(MAIN_SEPARATOR_STR);
        }
        path.push(segment(part));
    }
    PathBuf::from(path)
}

#[cfg(unix)]
fn segment(bytes: &[u8]) -> &std::ffi::OsStr {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(bytes)
}

#[cfg(not(unix))]
fn segment(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}
