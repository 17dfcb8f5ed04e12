//! BitTorrent metainfo file parser.
//!
//! A torrent file (also known as a metainfo file) is a bencoded dictionary:
//!
//! - `announce`: URL of the tracker server
//! - `created by`, `creation date`, `comment`: optional provenance
//! - `info`: dictionary with the core metadata:
//!   - `name`: suggested file or directory name
//!   - `piece length`: number of bytes per piece
//!   - `pieces`: concatenated SHA-1 hashes of all pieces
//!   - `length`: payload size (single-file torrents)
//!   - `files`: list of `{length, path}` dictionaries (multi-file torrents)
//!   - `private`, `source`: optional flags
//!
//! [`Metainfo`] keeps the encoded bytes alive and hands out views into them.
//! The info hash is taken over the `info` dictionary exactly as it was
//! encoded, so it matches what every other client computes for the same
//! file even when the encoding is not canonical.

use std::borrow::Cow;

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::bencode::{BDict, BValue, Bencode};

use super::error::{FieldError, MetainfoError};
use super::info::{FileEntry, FileIter, Layout};

/// SHA-1 of the encoded `info` dictionary.
pub type InfoHash = [u8; 20];

/// SHA-1 of one piece of payload.
pub type PieceHash = [u8; 20];

pub const PIECE_HASH_LEN: usize = 20;

#[derive(Debug, Clone, Default)]
enum StrField {
    #[default]
    Absent,
    Present(Bytes),
    WrongType,
}

impl StrField {
    fn get(&self, name: &'static str) -> Result<&[u8], FieldError> {
        match self {
            StrField::Present(bytes) => Ok(bytes.as_ref()),
            StrField::Absent => Err(FieldError::Absent(name)),
            StrField::WrongType => Err(FieldError::WrongType(name)),
        }
    }
}

/// A parsed torrent file.
#[derive(Debug, Clone)]
pub struct Metainfo {
    raw: Bytes,
    info_hash: InfoHash,
    announce: StrField,
    created_by: StrField,
    creation_date: Option<i64>,
    comment: StrField,
    name: StrField,
    piece_length: Option<u64>,
    pieces: Vec<PieceHash>,
    private: bool,
    source: StrField,
    layout: Layout,
}

#[derive(Default)]
struct Fields {
    announce: StrField,
    created_by: StrField,
    creation_date: Option<i64>,
    comment: StrField,
    name: StrField,
    piece_length: Option<u64>,
    pieces: Vec<PieceHash>,
    private: bool,
    source: StrField,
    layout: Option<Layout>,
}

impl Metainfo {
    /// Parse a torrent file from its raw bytes.
    ///
    /// Only malformed bencode, a top level that is not a dictionary, or a
    /// missing `info` dictionary are fatal. Unknown keys and fields of the
    /// wrong type are logged and skipped.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Result<Self, MetainfoError> {
        let raw: Bytes = bytes.into();
        let (root, consumed) = Bencode::decode_prefix(&raw)?;
        if consumed < raw.len() {
            warn!(
                trailing = raw.len() - consumed,
                "ignoring bytes after the torrent dictionary"
            );
        }
        let BValue::Dict(root) = root else {
            return Err(MetainfoError::NotADictionary);
        };

        let mut fields = Fields::default();
        let mut info_hash = None;
        for (key, value) in root {
            match key {
                b"announce" => fields.announce = string_field(&raw, "announce", value),
                b"created by" => fields.created_by = string_field(&raw, "created by", value),
                b"creation date" => fields.creation_date = integer_field("creation date", value),
                b"comment" => fields.comment = string_field(&raw, "comment", value),
                b"info" => match value {
                    BValue::Dict(info) => info_hash = Some(fields.read_info(&raw, info)),
                    other => warn!("`info` is a {}, expected a dictionary", other.type_name()),
                },
                other => warn!(
                    "ignoring unknown key in torrent: {}",
                    String::from_utf8_lossy(other)
                ),
            }
        }
        let info_hash = info_hash.ok_or(MetainfoError::MissingInfo)?;

        let layout = fields.layout.unwrap_or_else(|| {
            warn!("info dictionary has neither `length` nor `files`; assuming an empty file");
            Layout::SingleFile { length: 0 }
        });
        debug!(info_hash = %hex::encode(info_hash), pieces = fields.pieces.len(), "parsed torrent");

        Ok(Self {
            raw,
            info_hash,
            announce: fields.announce,
            created_by: fields.created_by,
            creation_date: fields.creation_date,
            comment: fields.comment,
            name: fields.name,
            piece_length: fields.piece_length,
            pieces: fields.pieces,
            private: fields.private,
            source: fields.source,
            layout,
        })
    }

    /// The bytes the torrent was parsed from.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn info_hash(&self) -> &InfoHash {
        &self.info_hash
    }

    pub fn announce(&self) -> Result<&[u8], FieldError> {
        self.announce.get("announce")
    }

    pub fn created_by(&self) -> Result<&[u8], FieldError> {
        self.created_by.get("created by")
    }

    /// Seconds since the Unix epoch, if present and representable.
    pub fn creation_date(&self) -> Option<i64> {
        self.creation_date
    }

    pub fn comment(&self) -> Result<&[u8], FieldError> {
        self.comment.get("comment")
    }

    pub fn name(&self) -> Result<&[u8], FieldError> {
        self.name.get("name")
    }

    /// The name for display, or `placeholder` when there is none.
    pub fn display_name<'s>(&'s self, placeholder: &'s str) -> Cow<'s, str> {
        match self.name() {
            Ok(name) => String::from_utf8_lossy(name),
            Err(_) => Cow::Borrowed(placeholder),
        }
    }

    pub fn source(&self) -> Result<&[u8], FieldError> {
        self.source.get("source")
    }

    /// Bytes per piece; `None` when missing or not positive.
    pub fn piece_length(&self) -> Option<u64> {
        self.piece_length
    }

    pub fn piece_hashes(&self) -> &[PieceHash] {
        &self.pieces
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn piece_hash(&self, index: usize) -> Option<&PieceHash> {
        self.pieces.get(index)
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn is_multi_file(&self) -> bool {
        self.layout.is_multi_file()
    }

    /// Iterate the `files` list of a multi-file torrent, in stream order.
    ///
    /// Every call starts over from the first entry.
    pub fn files(&self) -> Result<FileIter<'_>, MetainfoError> {
        match &self.layout {
            Layout::MultiFile { files } => {
                let list = Bencode::decode_bytes(files)?
                    .as_list()
                    .ok_or(MetainfoError::NotMultiFile)?;
                Ok(FileIter::new(list.iter()))
            }
            Layout::SingleFile { .. } => Err(MetainfoError::NotMultiFile),
        }
    }

    /// The payload of a single-file torrent, named after the torrent.
    pub fn single_file(&self) -> Result<FileEntry<'_>, MetainfoError> {
        match self.layout {
            Layout::SingleFile { length } => Ok(FileEntry {
                path: vec![self.name()?],
                length,
            }),
            Layout::MultiFile { .. } => Err(MetainfoError::NotSingleFile),
        }
    }

    /// Number of payload files; entries are counted whether or not they are
    /// well formed.
    pub fn file_count(&self) -> usize {
        match self.files() {
            Ok(files) => files.count(),
            Err(_) => 1,
        }
    }

    /// Size of the whole payload.
    pub fn total_length(&self) -> Result<u64, MetainfoError> {
        match self.layout {
            Layout::SingleFile { length } => Ok(length),
            Layout::MultiFile { .. } => self
                .files()?
                .try_fold(0u64, |total, entry| Ok(total.saturating_add(entry?.length))),
        }
    }

    /// Number of pieces the payload splits into, rounding the last one up.
    pub fn expected_piece_count(&self) -> Option<u64> {
        let piece_length = self.piece_length?;
        Some(self.total_length().ok()?.div_ceil(piece_length))
    }

    /// Size of piece `index`; every piece is full except possibly the last.
    pub fn piece_size(&self, index: usize) -> Option<u64> {
        let piece_length = self.piece_length?;
        let total = self.total_length().ok()?;
        let start = u64::try_from(index).ok()?.checked_mul(piece_length)?;
        if start >= total {
            return None;
        }
        Some((total - start).min(piece_length))
    }
}

impl Fields {
    /// Record the fields of the `info` dictionary and return its hash.
    fn read_info(&mut self, raw: &Bytes, info: BDict<'_>) -> InfoHash {
        let info_hash: InfoHash = Sha1::digest(info.raw()).into();

        for (key, value) in info {
            match key {
                b"name" => self.name = string_field(raw, "name", value),
                b"piece length" => {
                    self.piece_length = integer_field("piece length", value).and_then(|n| {
                        let positive = u64::try_from(n).ok().filter(|&n| n > 0);
                        if positive.is_none() {
                            warn!("`piece length` is {n}, expected a positive integer");
                        }
                        positive
                    })
                }
                b"pieces" => match value {
                    BValue::String(pieces) => self.pieces = piece_table(pieces),
                    other => warn!("`pieces` is a {}, expected a string", other.type_name()),
                },
                b"length" => {
                    if let Some(n) = integer_field("length", value) {
                        if matches!(self.layout, Some(Layout::MultiFile { .. })) {
                            warn!("both `files` and `length` present; using `length`");
                        }
                        let length = u64::try_from(n).unwrap_or_else(|_| {
                            warn!("`length` is {n}; treating it as 0");
                            0
                        });
                        self.layout = Some(Layout::SingleFile { length });
                    }
                }
                b"files" => match value {
                    BValue::List(files) => {
                        if matches!(self.layout, Some(Layout::SingleFile { .. })) {
                            warn!("both `length` and `files` present; using `files`");
                        }
                        self.layout = Some(Layout::MultiFile {
                            files: raw.slice_ref(files.raw()),
                        });
                    }
                    other => warn!("`files` is a {}, expected a list", other.type_name()),
                },
                b"private" => {
                    self.private = integer_field("private", value).is_some_and(|n| n != 0)
                }
                b"source" => self.source = string_field(raw, "source", value),
                other => warn!(
                    "ignoring unknown key in info dictionary: {}",
                    String::from_utf8_lossy(other)
                ),
            }
        }

        info_hash
    }
}

fn string_field(raw: &Bytes, name: &'static str, value: BValue<'_>) -> StrField {
    match value {
        BValue::String(s) => StrField::Present(raw.slice_ref(s)),
        other => {
            warn!("`{name}` is a {}, expected a string", other.type_name());
            StrField::WrongType
        }
    }
}

fn integer_field(name: &'static str, value: BValue<'_>) -> Option<i64> {
    match value {
        BValue::Integer(int) => match int.value() {
            Ok(n) => Some(n),
            Err(e) => {
                warn!("`{name}` is unusable: {e}");
                None
            }
        },
        other => {
            warn!("`{name}` is a {}, expected an integer", other.type_name());
            None
        }
    }
}

/// Split the `pieces` string into hashes, dropping a partial trailing one.
fn piece_table(pieces: &[u8]) -> Vec<PieceHash> {
    let remainder = pieces.len() % PIECE_HASH_LEN;
    if remainder != 0 {
        warn!(
            len = pieces.len(),
            "`pieces` is not a multiple of {PIECE_HASH_LEN} bytes; ignoring the last {remainder}"
        );
    }
    pieces
        .chunks_exact(PIECE_HASH_LEN)
        .map(|chunk| {
            let mut hash = [0u8; PIECE_HASH_LEN];
            hash.copy_from_slice(chunk);
            hash
        })
        .collect()
}
