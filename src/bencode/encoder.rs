//! Bencode encoder implementation following the BitTorrent protocol specification.
//!
//! This module provides functionality to write data in the Bencode format as defined in the
//! [BitTorrent protocol specification](http://www.bittorrent.org/beps/bep_0003.html#bencoding).
//!
//! The encoding rules are:
//! - Strings are length-prefixed base10 followed by a colon and the string
//! - Integers are 'i' followed by the number in base10 followed by 'e'
//! - Lists are 'l' followed by their elements followed by 'e'
//! - Dictionaries are 'd' followed by alternating keys and values followed by 'e'
//!
//! The encoder is a plain writer: it does not sort dictionary keys or check
//! that containers are balanced, so callers control the exact bytes produced.

/// An encoder for writing values into Bencode format.
#[derive(Debug, Default)]
pub struct Encoder {
    output: Vec<u8>,
}

impl Encoder {
    /// Creates a new encoder with an empty output buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes an integer in the format: i<number>e
    pub fn encode_integer(&mut self, n: i64) -> &mut Self {
        self.output.push(b'i');
        self.output.extend_from_slice(n.to_string().as_bytes());
        self.output.push(b'e');
        self
    }

    /// Encodes a byte string in the format: <length>:<bytes>
    pub fn encode_string(&mut self, s: impl AsRef<[u8]>) -> &mut Self {
        let s = s.as_ref();
        self.output.extend_from_slice(s.len().to_string().as_bytes());
        self.output.push(b':');
        self.output.extend_from_slice(s);
        self
    }

    /// Opens a list; close it with [`Encoder::end`].
    pub fn begin_list(&mut self) -> &mut Self {
        self.output.push(b'l');
        self
    }

    /// Opens a dictionary; close it with [`Encoder::end`].
    pub fn begin_dict(&mut self) -> &mut Self {
        self.output.push(b'd');
        self
    }

    pub fn end(&mut self) -> &mut Self {
        self.output.push(b'e');
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::Decoder;

    #[test]
    fn test_encode_integer() {
        let mut encoder = Encoder::new();
        encoder.encode_integer(42).encode_integer(-42).encode_integer(0);
        assert_eq!(encoder.into_bytes(), b"i42ei-42ei0e");
    }

    #[test]
    fn test_encode_string() {
        let mut encoder = Encoder::new();
        encoder.encode_string("spam");
        assert_eq!(encoder.into_bytes(), b"4:spam");

        let mut encoder = Encoder::new();
        encoder.encode_string("");
        assert_eq!(encoder.into_bytes(), b"0:");

        let mut encoder = Encoder::new();
        encoder.encode_string([0u8, 255, 10]);
        assert_eq!(encoder.into_bytes(), b"3:\x00\xff\x0a");
    }

    #[test]
    fn test_encode_list() {
        let mut encoder = Encoder::new();
        encoder.begin_list().encode_string("spam").encode_integer(42).end();
        assert_eq!(encoder.into_bytes(), b"l4:spami42ee");
    }

    #[test]
    fn test_encode_dict() {
        let mut encoder = Encoder::new();
        encoder
            .begin_dict()
            .encode_string("bar")
            .encode_string("spam")
            .encode_string("foo")
            .encode_integer(42)
            .end();
        assert_eq!(encoder.into_bytes(), b"d3:bar4:spam3:fooi42ee");
    }

    #[test]
    fn test_encode_nested() {
        let mut encoder = Encoder::new();
        encoder
            .begin_dict()
            .encode_string("dict")
            .begin_dict()
            .encode_string("x")
            .encode_string("y")
            .encode_string("z")
            .encode_integer(42)
            .end()
            .encode_string("list")
            .begin_list()
            .encode_string("a")
            .encode_string("b")
            .end()
            .end();
        let encoded = encoder.into_bytes();

        // Decode it back and check the structure survived
        let decoded = Decoder::new(&encoded).parse().unwrap().as_dict().unwrap();
        let inner = decoded.get(b"dict").and_then(|v| v.as_dict()).unwrap();
        assert_eq!(inner.get(b"z").and_then(|v| v.as_integer()), Some(42));
        let list = decoded.get(b"list").and_then(|v| v.as_list()).unwrap();
        let items: Vec<_> = list.iter().filter_map(|v| v.as_bytes()).collect();
        assert_eq!(items, vec![&b"a"[..], &b"b"[..]]);
    }
}
