//! Torrent fixtures shared by the unit tests.

use std::fs;
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::bencode::Encoder;

pub const ANNOUNCE: &str = "http://tracker.example/announce";

pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Concatenated hashes of `data` cut into `piece_length` pieces.
pub fn piece_hashes(data: &[u8], piece_length: usize) -> Vec<u8> {
    data.chunks(piece_length).flat_map(sha1).collect()
}

/// Deterministic, non-repeating-looking payload.
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ (i >> 8) as u8)
        .collect()
}

/// Encoded single-file torrent whose hashes match `data`.
pub fn single_file_torrent(name: &str, data: &[u8], piece_length: usize) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder
        .begin_dict()
        .encode_string("announce")
        .encode_string(ANNOUNCE)
        .encode_string("info")
        .begin_dict()
        .encode_string("length")
        .encode_integer(data.len() as i64)
        .encode_string("name")
        .encode_string(name)
        .encode_string("piece length")
        .encode_integer(piece_length as i64)
        .encode_string("pieces")
        .encode_string(piece_hashes(data, piece_length))
        .end()
        .end();
    encoder.into_bytes()
}

/// Encoded multi-file torrent with explicit file lengths and piece table.
pub fn multi_file_torrent_with_pieces(
    name: &str,
    files: &[(&[&str], u64)],
    piece_length: usize,
    pieces: &[u8],
) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder
        .begin_dict()
        .encode_string("announce")
        .encode_string(ANNOUNCE)
        .encode_string("info")
        .begin_dict()
        .encode_string("files")
        .begin_list();
    for (path, length) in files {
        encoder
            .begin_dict()
            .encode_string("length")
            .encode_integer(*length as i64)
            .encode_string("path")
            .begin_list();
        for segment in path.iter() {
            encoder.encode_string(segment);
        }
        encoder.end().end();
    }
    encoder
        .end()
        .encode_string("name")
        .encode_string(name)
        .encode_string("piece length")
        .encode_integer(piece_length as i64)
        .encode_string("pieces")
        .encode_string(pieces)
        .end()
        .end();
    encoder.into_bytes()
}

/// Encoded multi-file torrent whose hashes match the concatenated contents.
pub fn multi_file_torrent(name: &str, files: &[(&[&str], &[u8])], piece_length: usize) -> Vec<u8> {
    let stream: Vec<u8> = files.iter().flat_map(|(_, data)| data.iter().copied()).collect();
    let lengths: Vec<(&[&str], u64)> = files
        .iter()
        .map(|(path, data)| (*path, data.len() as u64))
        .collect();
    multi_file_torrent_with_pieces(
        name,
        &lengths,
        piece_length,
        &piece_hashes(&stream, piece_length),
    )
}

/// Write `data` to `root/segments...`, creating parent directories.
pub fn write_file(root: &Path, segments: &[&str], data: &[u8]) {
    let path = segments.iter().fold(root.to_path_buf(), |path, s| path.join(s));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, data).unwrap();
}
