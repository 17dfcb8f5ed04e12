//! Loading and inspecting torrent files.

mod error;
mod fetch;
mod info;
mod metainfo;
mod summary;


use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

pub use error::{FieldError, MetainfoError};
pub use fetch::{fetch, fetch_with_progress, DownloadProgress};
pub use info::{FileEntry, FileIter, Layout};
pub use metainfo::{InfoHash, Metainfo, PieceHash, PIECE_HASH_LEN};
pub use summary::{Summary, UNKNOWN_NAME};

/// Torrents larger than this are refused before parsing.
pub const MAX_TORRENT_SIZE: u64 = 128 * 1024 * 1024;

/// Load a torrent from a local path or an `http://` / `https://` URL.
pub fn load(source: &str) -> Result<Metainfo, MetainfoError> {
    load_with_progress(source, &mut |_| {})
}

/// Like [`load`], reporting progress of slow downloads to `on_progress`.
pub fn load_with_progress(
    source: &str,
    on_progress: &mut dyn FnMut(DownloadProgress),
) -> Result<Metainfo, MetainfoError> {
    let bytes = if fetch::is_url(source) {
        fetch_with_progress(source, MAX_TORRENT_SIZE, on_progress)?
    } else {
        read_file(Path::new(source), MAX_TORRENT_SIZE)?
    };
    Metainfo::from_bytes(bytes)
}

/// Read a whole file, refusing anything larger than `limit`.
pub fn read_file(path: &Path, limit: u64) -> Result<Vec<u8>, MetainfoError> {
    let read_err = |source| MetainfoError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let size = file.metadata().map_err(read_err)?.len();
    if size > limit {
        return Err(MetainfoError::TooLarge { size, limit });
    }

    // The file may grow between the size check and the read.
    let mut bytes = Vec::with_capacity(size as usize);
    file.take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(read_err)?;
    let size = bytes.len() as u64;
    if size > limit {
        return Err(MetainfoError::TooLarge { size, limit });
    }

    debug!(path = %path.display(), size, "read torrent file");
    Ok(bytes)
}
