use std::error::Error;
use std::fmt;

/// An error type indicating a malformed persisted packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PacketError {
    /// The record string's token count is not a multiple of four.
    UnevenTokenCount(usize),
    /// A token could not be parsed as the expected number.
    InvalidNumber(String),
    /// An active-state token was something other than 0 or 1.
    InvalidStateFlag(String),
    /// A perceptron count was zero.
    NonPositiveCount(&'static str),
    /// A declared count does not match the decoded records.
    CountMismatch {
        field: &'static str,
        declared: usize,
        decoded: usize,
    },
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnevenTokenCount(count) => {
                write!(f, "record string has {} tokens, expected a multiple of 4", count)
            }
            Self::InvalidNumber(token) => write!(f, "unparseable numeric token {:?}", token),
            Self::InvalidStateFlag(token) => {
                write!(f, "active-state token {:?} is neither 0 nor 1", token)
            }
            Self::NonPositiveCount(field) => write!(f, "packet field {} must be positive", field),
            Self::CountMismatch {
                field,
                declared,
                decoded,
            } => write!(
                f,
                "packet declares {} {} but its string decodes to {}",
                declared, field, decoded
            ),
        }
    }
}

impl Error for PacketError {}
