//! Steering unit text protocol.
//!
//! A steering frame is a `;`-separated list of `key:value` tokens:
//!
//! ```text
//! b3:1;b4:0;b12:1
//! ```
//!
//! - `key` - 1 to 3 bytes, no `:`. Keys starting with `b` address a button,
//!   the remaining digits are the button index (0-15).
//! - `value` - signed decimal integer, read up to the first non-digit. `1`
//!   presses the button, anything else releases it.
//!
//! Decoding is best-effort per token: a malformed token is reported as an
//! error item and the iterator carries on with the next token.

use crate::types::{Buttons, InputEvent, BUTTON_COUNT};

/// Working buffer size for one steering frame, terminator included.
pub const STEERING_BUFFER_LEN: usize = 128;

/// Maximum key length in a `key:value` token.
pub const MAX_KEY_LEN: usize = 3;

const TOKEN_SEPARATOR: u8 = b';';
const KEY_SEPARATOR: u8 = b':';
const BUTTON_KEY: u8 = b'b';

/// Why a single steering token was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TokenError {
    /// Token does not match `key:integer`.
    Malformed,
    /// Well-formed token with a key this hub does not handle.
    UnknownKey,
    /// Button key with an index above 15.
    ButtonOutOfRange { index: u8 },
}

/// Decode a steering frame into an iterator of per-token results.
///
/// At most `STEERING_BUFFER_LEN - 1` bytes are considered and the frame ends
/// at the first NUL byte. Empty and all-whitespace tokens are skipped silently.
///
/// # Example
///
/// ```
/// use wheel_proto::{decode_steering, InputEvent, TokenError};
///
/// let mut tokens = decode_steering(b"b3:1;xx;b4:0");
/// assert_eq!(tokens.next(), Some(Ok(InputEvent::Button { button: 3, pressed: true })));
/// assert_eq!(tokens.next(), Some(Err(TokenError::Malformed)));
/// assert_eq!(tokens.next(), Some(Ok(InputEvent::Button { button: 4, pressed: false })));
/// assert_eq!(tokens.next(), None);
/// ```
pub fn decode_steering(frame: &[u8]) -> SteeringTokens<'_> {
    SteeringTokens {
        rest: working_frame(frame),
    }
}

/// Iterator returned by [`decode_steering`].
#[derive(Debug, Clone)]
pub struct SteeringTokens<'a> {
    rest: &'a [u8],
}

impl Iterator for SteeringTokens<'_> {
    type Item = Result<InputEvent, TokenError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }

            let (token, rest) = match self.rest.iter().position(|&b| b == TOKEN_SEPARATOR) {
                Some(pos) => (&self.rest[..pos], &self.rest[pos + 1..]),
                None => (self.rest, &self.rest[self.rest.len()..]),
            };
            self.rest = rest;

            if !token.iter().all(u8::is_ascii_whitespace) {
                return Some(parse_token(token));
            }
        }
    }
}

/// Bound the frame to the working buffer and cut it at the first NUL.
fn working_frame(frame: &[u8]) -> &[u8] {
    let bounded = &frame[..frame.len().min(STEERING_BUFFER_LEN - 1)];
    match bounded.iter().position(|&b| b == 0) {
        Some(nul) => &bounded[..nul],
        None => bounded,
    }
}

/// Parse one `key:value` token that is not blank.
fn parse_token(token: &[u8]) -> Result<InputEvent, TokenError> {
    let colon = token
        .iter()
        .position(|&b| b == KEY_SEPARATOR)
        .ok_or(TokenError::Malformed)?;

    let key = &token[..colon];
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(TokenError::Malformed);
    }
    let value = parse_i32(&token[colon + 1..]).ok_or(TokenError::Malformed)?;

    if key[0] != BUTTON_KEY {
        return Err(TokenError::UnknownKey);
    }

    let index = parse_index(&key[1..]).ok_or(TokenError::Malformed)?;
    if Buttons::from_index(index).is_none() {
        return Err(TokenError::ButtonOutOfRange { index });
    }
    debug_assert!(index < BUTTON_COUNT);

    Ok(InputEvent::Button {
        button: index,
        pressed: value == 1,
    })
}

/// Parse the 1-2 decimal digits following a button key.
#[inline]
fn parse_index(digits: &[u8]) -> Option<u8> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0u8, |acc, &b| {
        if b.is_ascii_digit() {
            acc.checked_mul(10)?.checked_add(b - b'0')
        } else {
            None
        }
    })
}

/// Parse a signed decimal i32 prefix.
///
/// Leading ASCII whitespace is skipped, then an optional sign and at least one
/// digit are read. Anything after the last digit is ignored.
#[inline]
fn parse_i32(s: &[u8]) -> Option<i32> {
    let start = s.iter().position(|b| !b.is_ascii_whitespace())?;
    let s = &s[start..];
    let (negative, digits) = match s[0] {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let len = digits.iter().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 {
        return None;
    }

    // Accumulate as a negative number so i32::MIN parses.
    let mut value: i32 = 0;
    for &b in &digits[..len] {
        value = value.checked_mul(10)?.checked_sub((b - b'0') as i32)?;
    }

    if negative {
        Some(value)
    } else {
        value.checked_neg()
    }
}
