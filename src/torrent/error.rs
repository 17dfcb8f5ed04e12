use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::bencode::BencodeError;

/// Errors raised while loading or walking a torrent file.
#[derive(Debug, Error)]
pub enum MetainfoError {
    /// The torrent file could not be opened or read.
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The torrent is over the size cap; nothing was parsed.
    #[error("torrent is {size} bytes, over the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// The HTTP request for a remote torrent failed.
    #[error("failed to fetch {url}: {source}")]
    Fetch { url: String, source: reqwest::Error },

    /// The HTTP response body could not be read.
    #[error("failed to download {url}: {source}")]
    Transfer { url: String, source: io::Error },

    #[error("malformed bencode: {0}")]
    Bencode(#[from] BencodeError),

    #[error("not a valid .torrent file: top-level value is not a dictionary")]
    NotADictionary,

    #[error("not a valid .torrent file: no info dictionary")]
    MissingInfo,

    #[error("torrent describes a single file")]
    NotMultiFile,

    #[error("torrent describes multiple files")]
    NotSingleFile,

    #[error("file entry {index} has a missing or invalid `{field}`")]
    MalformedFileEntry { index: usize, field: &'static str },

    #[error(transparent)]
    Field(#[from] FieldError),
}

impl MetainfoError {
    /// True for failures to obtain the bytes at all, as opposed to bytes that
    /// do not form a usable torrent.
    pub fn is_resource(&self) -> bool {
        matches!(
            self,
            MetainfoError::Read { .. }
                | MetainfoError::TooLarge { .. }
                | MetainfoError::Fetch { .. }
                | MetainfoError::Transfer { .. }
        )
    }
}

/// Why an optional field could not be returned. Neither case is fatal.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("`{0}` is not present")]
    Absent(&'static str),

    #[error("`{0}` has the wrong type")]
    WrongType(&'static str),
}
