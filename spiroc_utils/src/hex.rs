//! Conversion between the hexadecimal bitstream text and bit vectors.
//!
//! Bit vectors are kept in *stream order*: element `i` is bit `i` of the integer written by the
//! hexadecimal text, so the last hex digit holds the first four bits of the stream.
use nom::{
    bytes::complete::tag,
    character::complete::{
        alphanumeric1,
        multispace0,
    },
    combinator::all_consuming,
    sequence::{
        delimited,
        preceded,
    },
    IResult,
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("the config file is not hex")]
    NotHex,
    #[error("Invalid hexadecimal digit `{digit}` at position {position}")]
    Digit { digit: char, position: usize },
    #[error("Invalid binary digit `{digit}` at position {position}")]
    Binary { digit: char, position: usize },
    #[error("A bit string of length {0} is not a whole number of hex digits")]
    Length(usize),
}

fn prefixed_hex(input: &str) -> IResult<&str, &str> {
    all_consuming(delimited(
        multispace0,
        preceded(tag("0x"), alphanumeric1),
        multispace0,
    ))(input)
}

/// Parse a single bitstream line of the form `0x0123ABC...`, returning the digits without the
/// prefix
/// # Errors
/// Returns [`Error::NotHex`] if the line is not a `0x` prefixed word
pub fn bitstream_line(input: &str) -> Result<&str, Error> {
    let (_, digits) = prefixed_hex(input).map_err(|_| Error::NotHex)?;
    Ok(digits)
}

/// Convert hexadecimal digits (no prefix) into stream ordered bits
/// # Errors
/// Returns an error on non-hexadecimal characters
pub fn hex_to_bits(hex: &str) -> Result<Vec<bool>, Error> {
    let digits: Vec<char> = hex.chars().collect();
    let mut bits = vec![false; digits.len() * 4];
    for (k, c) in digits.iter().rev().enumerate() {
        let nibble = c.to_digit(16).ok_or(Error::Digit {
            digit: *c,
            position: digits.len() - 1 - k,
        })?;
        for (j, bit) in bits[4 * k..4 * k + 4].iter_mut().enumerate() {
            *bit = (nibble >> j) & 1 == 1;
        }
    }
    Ok(bits)
}

/// Convert stream ordered bits back into uppercase hexadecimal digits (no prefix)
/// # Errors
/// Returns an error if the number of bits is not a multiple of four
pub fn bits_to_hex(bits: &[bool]) -> Result<String, Error> {
    if bits.len() % 4 != 0 {
        return Err(Error::Length(bits.len()));
    }
    Ok(bits
        .chunks(4)
        .rev()
        .map(|nibble| {
            let n = nibble
                .iter()
                .enumerate()
                .fold(0u32, |acc, (j, b)| acc | (u32::from(*b) << j));
            // n < 16 so this always succeeds
            char::from_digit(n, 16).map_or('0', |c| c.to_ascii_uppercase())
        })
        .collect())
}

/// Render bits as a `'0'`/`'1'` string, in the given order
#[must_use]
pub fn bits_to_string(bits: &[bool]) -> String {
    bits.iter().map(|b| if *b { '1' } else { '0' }).collect()
}

/// Parse a `'0'`/`'1'` string into bits, in the given order
/// # Errors
/// Returns an error on any other character
pub fn string_to_bits(s: &str) -> Result<Vec<bool>, Error> {
    s.chars()
        .enumerate()
        .map(|(position, digit)| match digit {
            '0' => Ok(false),
            '1' => Ok(true),
            _ => Err(Error::Binary { digit, position }),
        })
        .collect()
}
