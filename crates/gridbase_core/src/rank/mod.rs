//! Rank keys for drag-and-drop ordering of rows and columns.
//!
//! # Responsibility
//! - Define the `Rank` value stored on every row and column.
//! - Compute new ranks so one reorder rewrites exactly one record.
//!
//! # Invariants
//! - Byte-wise comparison of two ranks is their semantic order.
//! - Between any two distinct ranks another rank can always be produced.
//! - Ranks are only comparable within one rank space (rows of a table, or
//!   columns of a table).
//!
//! # Key format
//! A rank is an integer part followed by an optional fraction part, both over
//! the base-62 alphabet `0-9A-Za-z`. The first character of the integer part
//! encodes its length: `a`..`z` mean 2..27 characters, `A`..`Z` mean 27..2.
//! The fraction part never ends with `0`.

mod engine;
mod reorder;

pub use engine::{append, between, initial, prepend};
pub use reorder::{reorder, reorder_columns, HeaderSlot};

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub(crate) const DIGITS: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
pub(crate) const BASE: usize = 62;
pub(crate) const ZERO: u8 = b'0';
pub(crate) const LAST_DIGIT: u8 = b'z';

/// Integer part reserved as the lower bound of the key space.
pub(crate) const SMALLEST_INTEGER: &str = "A00000000000000000000000000";

/// Result type used by rank computations.
pub type RankResult<T> = Result<T, RankError>;

/// Errors from rank parsing and rank computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankError {
    /// Value is not a well-formed rank key.
    InvalidRank(String),
    /// No rank exists strictly between the bounds (equal or inverted).
    EmptyNeighbor { lower: Rank, upper: Rank },
    /// Index is outside the sibling list.
    IndexOutOfRange { index: usize, len: usize },
    /// Sibling list is not strictly ascending at `index`.
    UnorderedSiblings {
        index: usize,
        lower: Rank,
        upper: Rank,
    },
    /// Header slot at `index` is a UI-only column and has no rank.
    SentinelNotMovable { index: usize },
    /// Key space boundary reached.
    Exhausted,
}

impl Display for RankError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRank(value) => write!(f, "invalid rank `{value}`"),
            Self::EmptyNeighbor { lower, upper } => {
                write!(f, "no rank exists between `{lower}` and `{upper}`")
            }
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for {len} sibling(s)")
            }
            Self::UnorderedSiblings {
                index,
                lower,
                upper,
            } => write!(
                f,
                "sibling ranks not strictly ascending at index {index}: `{lower}` >= `{upper}`"
            ),
            Self::SentinelNotMovable { index } => {
                write!(f, "header slot {index} is not a rankable column")
            }
            Self::Exhausted => write!(f, "rank key space exhausted"),
        }
    }
}

impl Error for RankError {}

/// Ordering key for one row or column.
///
/// `Ord` is derived from the inner string, which compares byte-wise; this is
/// the same order SQLite's `BINARY` collation produces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rank(String);

impl Rank {
    /// Parses and validates a rank key.
    ///
    /// # Errors
    /// - `RankError::InvalidRank` when the key is empty, contains characters
    ///   outside the alphabet, has a malformed integer part, or has a
    ///   fraction ending in `0`.
    pub fn parse(value: impl Into<String>) -> RankResult<Self> {
        let value = value.into();
        validate_key(&value)?;
        Ok(Self(value))
    }

    /// Returns the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the rank and returns the key text.
    pub fn into_string(self) -> String {
        self.0
    }

    pub(crate) fn from_validated(value: String) -> Self {
        debug_assert!(validate_key(&value).is_ok(), "invalid generated rank {value}");
        Self(value)
    }

    pub(crate) fn integer_part(&self) -> &str {
        // Validated keys always carry a complete integer part.
        let len = integer_length(self.0.as_bytes()[0]).unwrap_or(self.0.len());
        &self.0[..len]
    }

    pub(crate) fn fraction_part(&self) -> &str {
        &self.0[self.integer_part().len()..]
    }
}

impl Display for Rank {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Rank {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Rank {
    type Error = RankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for Rank {
    type Error = RankError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Rank> for String {
    fn from(value: Rank) -> Self {
        value.0
    }
}

pub(crate) fn digit_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some(usize::from(byte - b'0')),
        b'A'..=b'Z' => Some(usize::from(byte - b'A') + 10),
        b'a'..=b'z' => Some(usize::from(byte - b'a') + 36),
        _ => None,
    }
}

pub(crate) fn integer_length(head: u8) -> Option<usize> {
    match head {
        b'a'..=b'z' => Some(usize::from(head - b'a') + 2),
        b'A'..=b'Z' => Some(usize::from(b'Z' - head) + 2),
        _ => None,
    }
}

fn validate_key(value: &str) -> RankResult<()> {
    let invalid = || RankError::InvalidRank(value.to_string());
    let bytes = value.as_bytes();
    let head = *bytes.first().ok_or_else(invalid)?;
    if bytes.iter().any(|byte| digit_value(*byte).is_none()) {
        return Err(invalid());
    }
    let int_len = integer_length(head).ok_or_else(invalid)?;
    if int_len > bytes.len() {
        return Err(invalid());
    }
    if value == SMALLEST_INTEGER {
        return Err(invalid());
    }
    if int_len < bytes.len() && bytes[bytes.len() - 1] == ZERO {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Rank, RankError};

    #[test]
    fn parse_accepts_well_formed_keys() {
        for key in ["a0", "a1V", "Zz", "b00", "zzzzzzzzzzzzzzzzzzzzzzzzzzz", "a0001"] {
            assert!(Rank::parse(key).is_ok(), "{key} should parse");
        }
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        for key in ["", "a", "b0", "a10", "a0 ", "0a", "a-", "A00000000000000000000000000"] {
            assert!(
                matches!(Rank::parse(key), Err(RankError::InvalidRank(_))),
                "{key:?} should be rejected"
            );
        }
    }

    #[test]
    fn ordering_is_byte_wise() {
        let mut ranks = ["a1", "Zz", "a0V", "b00", "a0"]
            .into_iter()
            .map(|key| Rank::parse(key).unwrap())
            .collect::<Vec<_>>();
        ranks.sort();
        let keys = ranks.iter().map(Rank::as_str).collect::<Vec<_>>();
        assert_eq!(keys, ["Zz", "a0", "a0V", "a1", "b00"]);
    }

    #[test]
    fn serde_round_trips_through_plain_string() {
        let rank = Rank::parse("a0V").unwrap();
        let json = serde_json::to_string(&rank).unwrap();
        assert_eq!(json, "\"a0V\"");
        let bad = serde_json::from_str::<Rank>("\"a00\"");
        assert!(bad.is_err());
    }

    #[test]
    fn splits_integer_and_fraction() {
        let rank = Rank::parse("b01x").unwrap();
        assert_eq!(rank.integer_part(), "b01");
        assert_eq!(rank.fraction_part(), "x");
    }
}
