use std::borrow::Cow;
use std::path::MAIN_SEPARATOR_STR;

use bytes::Bytes;
use tracing::debug;

use crate::bencode::{BValue, ListIter};

use super::error::MetainfoError;

/// How the payload of a torrent is laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// One file named after the torrent.
    SingleFile { length: u64 },
    /// Several files, kept as the encoded `files` list and decoded on demand.
    MultiFile { files: Bytes },
}

impl Layout {
    pub fn is_multi_file(&self) -> bool {
        matches!(self, Layout::MultiFile { .. })
    }
}

/// One file of the payload. Path segments borrow from the torrent buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry<'a> {
    pub path: Vec<&'a [u8]>,
    pub length: u64,
}

impl FileEntry<'_> {
    /// Path segments joined with the platform separator, for display.
    pub fn display_path(&self) -> String {
        self.path
            .iter()
            .map(|segment| String::from_utf8_lossy(segment))
            .collect::<Vec<Cow<'_, str>>>()
            .join(MAIN_SEPARATOR_STR)
    }
}

/// Iterator over the `files` list of a multi-file torrent.
///
/// Each item is decoded when reached, so a malformed entry surfaces as an
/// error at its position without affecting the entries before it.
pub struct FileIter<'a> {
    entries: ListIter<'a>,
    index: usize,
}

impl<'a> FileIter<'a> {
    pub(super) fn new(entries: ListIter<'a>) -> Self {
        Self { entries, index: 0 }
    }
}

impl<'a> Iterator for FileIter<'a> {
    type Item = Result<FileEntry<'a>, MetainfoError>;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.entries.next()?;
        let index = self.index;
        self.index += 1;
        Some(file_entry(index, value))
    }
}

fn file_entry(index: usize, value: BValue<'_>) -> Result<FileEntry<'_>, MetainfoError> {
    let malformed = |field| MetainfoError::MalformedFileEntry { index, field };
    let dict = value.as_dict().ok_or(malformed("entry"))?;

    let mut length = None;
    let mut path = None;
    for (key, value) in dict {
        match key {
            b"length" => {
                let n = value.as_integer().ok_or(malformed("length"))?;
                length = Some(u64::try_from(n).map_err(|_| malformed("length"))?);
            }
            b"path" => {
                let segments = value.as_list().ok_or(malformed("path"))?;
                let segments = segments
                    .iter()
                    .map(|segment| segment.as_bytes())
                    .collect::<Option<Vec<_>>>()
                    .filter(|segments| !segments.is_empty())
                    .ok_or(malformed("path"))?;
                path = Some(segments);
            }
            other => debug!(
                index,
                "ignoring key in file entry: {}",
                String::from_utf8_lossy(other)
            ),
        }
    }

    Ok(FileEntry {
        path: path.ok_or(malformed("path"))?,
        length: length.ok_or(malformed("length"))?,
    })
}
