use super::decoder::Decoder;
use super::error::BencodeError;

/// A Bencode value as defined in the BitTorrent specification, borrowed from
/// the buffer it was decoded from.
///
/// Bencode (pronounced like B-encode) supports four different types of values:
/// - Byte strings
/// - Integers
/// - Lists
/// - Dictionaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BValue<'a> {
    /// An integer value, can be positive or negative
    /// Example: `i42e` represents 42
    Integer(BInt<'a>),

    /// A byte string, prefixed with its length
    /// Example: `4:spam` represents "spam"
    String(&'a [u8]),

    /// A list of values
    /// Example: `l4:spami42ee` represents ["spam", 42]
    List(BList<'a>),

    /// A dictionary mapping byte strings to values
    /// Example: `d3:bar4:spam3:fooi42ee` represents {"bar": "spam", "foo": 42}
    Dict(BDict<'a>),
}

impl<'a> BValue<'a> {
    pub fn type_name(&self) -> &'static str {
        match self {
            BValue::Integer(_) => "integer",
            BValue::String(_) => "string",
            BValue::List(_) => "list",
            BValue::Dict(_) => "dictionary",
        }
    }

    /// The integer value, or `None` for other types and for integers that do
    /// not fit in an `i64`.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BValue::Integer(int) => int.value().ok(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            BValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<BList<'a>> {
        match *self {
            BValue::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<BDict<'a>> {
        match *self {
            BValue::Dict(dict) => Some(dict),
            _ => None,
        }
    }
}

/// An integer whose digits were validated but not yet converted.
///
/// Conversion is deferred so that an out-of-range value only affects the
/// field that holds it, not the decoding of the surrounding structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BInt<'a> {
    digits: &'a [u8],
}

impl<'a> BInt<'a> {
    pub(super) fn new(digits: &'a [u8]) -> Self {
        Self { digits }
    }

    pub fn digits(&self) -> &'a [u8] {
        self.digits
    }

    pub fn value(&self) -> Result<i64, BencodeError> {
        let text = String::from_utf8_lossy(self.digits);
        text.parse::<i64>()
            .map_err(|_| BencodeError::IntegerOverflow(text.into_owned()))
    }
}

/// A list, held as its encoded span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BList<'a> {
    raw: &'a [u8],
}

impl<'a> BList<'a> {
    pub(super) fn new(raw: &'a [u8]) -> Self {
        Self { raw }
    }

    /// The list exactly as it appears in the input, `l` and `e` included.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn iter(&self) -> ListIter<'a> {
        ListIter {
            decoder: Decoder::new(body(self.raw)),
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        body(self.raw).is_empty()
    }
}

impl<'a> IntoIterator for BList<'a> {
    type Item = BValue<'a>;
    type IntoIter = ListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct ListIter<'a> {
    decoder: Decoder<'a>,
}

impl<'a> Iterator for ListIter<'a> {
    type Item = BValue<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.decoder.is_at_end() {
            return None;
        }
        // The span was fully validated when the list itself was decoded.
        self.decoder.next_value().ok()
    }
}

/// A dictionary, held as its encoded span. Keys are yielded in encoded
/// order; sortedness is not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BDict<'a> {
    raw: &'a [u8],
}

impl<'a> BDict<'a> {
    pub(super) fn new(raw: &'a [u8]) -> Self {
        Self { raw }
    }

    /// The dictionary exactly as it appears in the input, `d` and `e`
    /// included, byte for byte.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    pub fn iter(&self) -> DictIter<'a> {
        DictIter {
            decoder: Decoder::new(body(self.raw)),
        }
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<BValue<'a>> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        body(self.raw).is_empty()
    }
}

impl<'a> IntoIterator for BDict<'a> {
    type Item = (&'a [u8], BValue<'a>);
    type IntoIter = DictIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct DictIter<'a> {
    decoder: Decoder<'a>,
}

impl<'a> Iterator for DictIter<'a> {
    type Item = (&'a [u8], BValue<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.decoder.is_at_end() {
            return None;
        }
        let key = self.decoder.next_value().ok()?.as_bytes()?;
        let value = self.decoder.next_value().ok()?;
        Some((key, value))
    }
}

fn body(raw: &[u8]) -> &[u8] {
    &raw[1..raw.len() - 1]
}
