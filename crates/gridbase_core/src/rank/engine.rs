//! Rank generation primitives.
//!
//! All functions here are pure: they only compute a key. Persisting it and
//! notifying observers is the caller's job.

use super::{
    digit_value, integer_length, Rank, RankError, RankResult, BASE, DIGITS, LAST_DIGIT,
    SMALLEST_INTEGER, ZERO,
};

const INITIAL_KEY: &str = "a0";

/// Returns the rank given to the first item of an empty collection.
pub fn initial() -> Rank {
    Rank::from_validated(INITIAL_KEY.to_string())
}

/// Returns a rank strictly greater than `last`.
///
/// Increments the integer part when possible, so a long run of appends grows
/// key length logarithmically and never touches earlier ranks.
pub fn append(last: &Rank) -> Rank {
    let integer = last.integer_part();
    match increment_integer(integer) {
        Some(next) => Rank::from_validated(next),
        None => {
            let mut key = integer.to_string();
            key.push_str(&midpoint(last.fraction_part(), None));
            Rank::from_validated(key)
        }
    }
}

/// Returns a rank strictly less than `first`.
///
/// # Errors
/// - `RankError::Exhausted` when `first` sits at the bottom of the key space.
pub fn prepend(first: &Rank) -> RankResult<Rank> {
    let integer = first.integer_part();
    let fraction = first.fraction_part();
    if integer == SMALLEST_INTEGER {
        let mut key = integer.to_string();
        key.push_str(&midpoint("", Some(fraction)));
        return Ok(Rank::from_validated(key));
    }
    if !fraction.is_empty() {
        return Ok(Rank::from_validated(integer.to_string()));
    }
    decrement_integer(integer)
        .map(Rank::from_validated)
        .ok_or(RankError::Exhausted)
}

/// Returns a rank strictly between `lower` and `upper`.
///
/// # Errors
/// - `RankError::EmptyNeighbor` when `lower >= upper`.
pub fn between(lower: &Rank, upper: &Rank) -> RankResult<Rank> {
    if lower >= upper {
        return Err(RankError::EmptyNeighbor {
            lower: lower.clone(),
            upper: upper.clone(),
        });
    }

    let lower_integer = lower.integer_part();
    let upper_integer = upper.integer_part();
    if lower_integer == upper_integer {
        let mut key = lower_integer.to_string();
        key.push_str(&midpoint(lower.fraction_part(), Some(upper.fraction_part())));
        return Ok(Rank::from_validated(key));
    }

    let next = increment_integer(lower_integer).ok_or(RankError::Exhausted)?;
    if next.as_str() < upper.as_str() {
        return Ok(Rank::from_validated(next));
    }
    let mut key = lower_integer.to_string();
    key.push_str(&midpoint(lower.fraction_part(), None));
    Ok(Rank::from_validated(key))
}

/// Midpoint of two fraction strings; `None` as upper bound means 1.
///
/// Callers guarantee `lower < upper` and that neither ends with `0`.
fn midpoint(lower: &str, upper: Option<&str>) -> String {
    if let Some(upper) = upper {
        let lower_bytes = lower.as_bytes();
        let upper_bytes = upper.as_bytes();
        let mut shared = 0;
        while shared < upper_bytes.len()
            && lower_bytes.get(shared).copied().unwrap_or(ZERO) == upper_bytes[shared]
        {
            shared += 1;
        }
        if shared > 0 {
            let mut key = upper[..shared].to_string();
            key.push_str(&midpoint(
                lower.get(shared..).unwrap_or(""),
                Some(&upper[shared..]),
            ));
            return key;
        }
    }

    let lower_digit = lower.bytes().next().and_then(digit_value).unwrap_or(0);
    let upper_digit = upper
        .and_then(|value| value.bytes().next())
        .and_then(digit_value)
        .unwrap_or(BASE);

    if upper_digit - lower_digit > 1 {
        let mid = (lower_digit + upper_digit + 1) / 2;
        return char::from(DIGITS[mid]).to_string();
    }

    match upper {
        Some(upper) if upper.len() > 1 => upper[..1].to_string(),
        _ => {
            let mut key = char::from(DIGITS[lower_digit]).to_string();
            key.push_str(&midpoint(lower.get(1..).unwrap_or(""), None));
            key
        }
    }
}

fn increment_integer(integer: &str) -> Option<String> {
    let bytes = integer.as_bytes();
    let head = bytes[0];
    debug_assert_eq!(integer_length(head), Some(bytes.len()));

    let mut digits = bytes[1..].to_vec();
    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        let value = digit_value(*digit).unwrap_or(0) + 1;
        if value == BASE {
            *digit = ZERO;
        } else {
            *digit = DIGITS[value];
            carry = false;
            break;
        }
    }

    if !carry {
        return Some(assemble(head, &digits));
    }
    match head {
        b'Z' => Some("a0".to_string()),
        b'z' => None,
        _ => {
            let next_head = head + 1;
            if next_head > b'a' {
                digits.push(ZERO);
            } else {
                digits.pop();
            }
            Some(assemble(next_head, &digits))
        }
    }
}

fn decrement_integer(integer: &str) -> Option<String> {
    let bytes = integer.as_bytes();
    let head = bytes[0];
    debug_assert_eq!(integer_length(head), Some(bytes.len()));

    let mut digits = bytes[1..].to_vec();
    let mut borrow = true;
    for digit in digits.iter_mut().rev() {
        match digit_value(*digit).unwrap_or(0) {
            0 => *digit = LAST_DIGIT,
            value => {
                *digit = DIGITS[value - 1];
                borrow = false;
                break;
            }
        }
    }

    if !borrow {
        return Some(assemble(head, &digits));
    }
    match head {
        b'a' => Some(assemble(b'Z', &[LAST_DIGIT])),
        b'A' => None,
        _ => {
            let next_head = head - 1;
            if next_head < b'Z' {
                digits.push(LAST_DIGIT);
            } else {
                digits.pop();
            }
            Some(assemble(next_head, &digits))
        }
    }
}

fn assemble(head: u8, digits: &[u8]) -> String {
    let mut key = String::with_capacity(digits.len() + 1);
    key.push(char::from(head));
    key.extend(digits.iter().copied().map(char::from));
    key
}
