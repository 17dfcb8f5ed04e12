//! Check data on disk against the piece hashes of a .torrent file.
//!
//! [`torrent`] parses torrent files into a zero-copy [`torrent::Metainfo`],
//! [`verify`] walks the payload files and compares every piece.

pub mod bencode;
pub mod torrent;
pub mod utils;
pub mod verify;

#[cfg(test)]
mod test_support;
