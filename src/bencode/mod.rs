//! Zero-copy bencode decoding, plus a small encoder.

mod bvalue;
mod decoder;
mod encoder;
mod error;

pub use bvalue::{BDict, BInt, BList, BValue, DictIter, ListIter};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::BencodeError;

/// Bencode decoder
#[derive(Debug, Clone, Copy)]
pub struct Bencode;

impl Bencode {
    /// Decode a buffer holding exactly one value.
    pub fn decode_bytes(input: &[u8]) -> Result<BValue<'_>, BencodeError> {
        Decoder::new(input).parse()
    }

    /// Decode the leading value of a buffer, returning it together with the
    /// offset where the unconsumed bytes start.
    pub fn decode_prefix(input: &[u8]) -> Result<(BValue<'_>, usize), BencodeError> {
        let mut decoder = Decoder::new(input);
        let value = decoder.next_value()?;
        Ok((value, decoder.position()))
    }
}
