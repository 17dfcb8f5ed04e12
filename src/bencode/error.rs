use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BencodeError {
    #[error("unexpected end of input at position {0}")]
    UnexpectedEof(usize),

    #[error("invalid integer at position {0}")]
    InvalidInteger(usize),

    #[error("integer out of range: {0}")]
    IntegerOverflow(String),

    #[error("invalid string length at position {0}")]
    InvalidStringLength(usize),

    #[error("unexpected character {0:?} at position {1}")]
    UnexpectedChar(char, usize),

    #[error("dictionary key must be a string (position {0})")]
    NonStringKey(usize),

    #[error("trailing data after value at position {0}")]
    TrailingData(usize),

    #[error("nesting too deep at position {0}")]
    NestingTooDeep(usize),
}
