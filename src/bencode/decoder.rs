use super::bvalue::{BDict, BInt, BList, BValue};
use super::error::BencodeError;

const MAX_DEPTH: usize = 64;

/// A forward-only cursor over a bencoded buffer.
///
/// Decoding never copies. Strings come back as slices of the input, and lists
/// and dictionaries come back as their raw encoded span, which is validated
/// once here and then iterated lazily.
pub struct Decoder<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, position: 0 }
    }

    /// Offset of the cursor from the start of the input.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Decodes exactly one value spanning the whole input.
    pub fn parse(mut self) -> Result<BValue<'a>, BencodeError> {
        let value = self.next_value()?;
        if !self.is_at_end() {
            return Err(BencodeError::TrailingData(self.position));
        }
        Ok(value)
    }

    /// Decodes the value under the cursor and advances past it.
    pub fn next_value(&mut self) -> Result<BValue<'a>, BencodeError> {
        self.parse_value(0)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.position).copied()
    }

    fn consume_until(&mut self, delimiter: u8) -> Result<&'a [u8], BencodeError> {
        let rest = &self.input[self.position..];
        match rest.iter().position(|&b| b == delimiter) {
            Some(offset) => {
                self.position += offset + 1; // skip the delimiter too
                Ok(&rest[..offset])
            }
            None => {
                self.position = self.input.len();
                Err(BencodeError::UnexpectedEof(self.position))
            }
        }
    }

    fn parse_value(&mut self, depth: usize) -> Result<BValue<'a>, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::NestingTooDeep(self.position));
        }

        match self.peek_byte() {
            Some(b'i') => self.parse_integer().map(BValue::Integer),
            Some(b'l') => self
                .parse_container(depth, false)
                .map(|raw| BValue::List(BList::new(raw))),
            Some(b'd') => self
                .parse_container(depth, true)
                .map(|raw| BValue::Dict(BDict::new(raw))),
            Some(b'0'..=b'9') => self.parse_string().map(BValue::String),
            Some(c) => Err(BencodeError::UnexpectedChar(c as char, self.position)),
            None => Err(BencodeError::UnexpectedEof(self.position)),
        }
    }

    fn parse_integer(&mut self) -> Result<BInt<'a>, BencodeError> {
        let start = self.position;
        self.position += 1; // 'i'
        let digits = self.consume_until(b'e')?;

        let magnitude = digits.strip_prefix(b"-").unwrap_or(digits);
        if magnitude.is_empty() || !magnitude.iter().all(u8::is_ascii_digit) {
            return Err(BencodeError::InvalidInteger(start));
        }
        Ok(BInt::new(digits))
    }

    fn parse_string(&mut self) -> Result<&'a [u8], BencodeError> {
        let start = self.position;
        let len_digits = self.consume_until(b':')?;
        let len = std::str::from_utf8(len_digits)
            .ok()
            .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(BencodeError::InvalidStringLength(start))?;

        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or(BencodeError::UnexpectedEof(self.input.len()))?;

        let string = &self.input[self.position..end];
        self.position = end;
        Ok(string)
    }

    /// Walks a list or dictionary to its closing `e`, validating every nested
    /// value, and returns the encoded span including both delimiters.
    fn parse_container(&mut self, depth: usize, is_dict: bool) -> Result<&'a [u8], BencodeError> {
        let start = self.position;
        self.position += 1; // 'l' or 'd'

        loop {
            match self.peek_byte() {
                Some(b'e') => {
                    self.position += 1;
                    return Ok(&self.input[start..self.position]);
                }
                Some(c) => {
                    if is_dict {
                        if !c.is_ascii_digit() {
                            return Err(BencodeError::NonStringKey(self.position));
                        }
                        self.parse_string()?;
                    }
                    self.parse_value(depth + 1)?;
                }
                None => return Err(BencodeError::UnexpectedEof(self.position)),
            }
        }
    }
}
