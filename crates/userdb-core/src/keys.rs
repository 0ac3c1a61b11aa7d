//! Order-preserving key codec.
//!
//! Keys are tuples of typed parts. Every part starts with a type tag, so
//! parts of different types never compare equal and sort by tag:
//!
//! | Tag    | Type   | Payload                                         |
//! |--------|--------|-------------------------------------------------|
//! | `0x01` | bytes  | raw bytes, `0x00` escaped as `0x00 0xFF`, `0x00` terminator |
//! | `0x02` | string | UTF-8, escaped and terminated like bytes        |
//! | `0x15` | u64    | 8 bytes, big-endian                             |
//!
//! Comparing two encoded tuples byte-wise gives the same result as
//! comparing the tuples element by element. Account records live under
//! the `("user", email)` namespace, so a range scan over the encoded
//! `("user",)` prefix returns all and only account records, in email order.

use std::ops::Bound;

use crate::error::{Result, UserDbError};

/// Leading tuple element of every account key.
pub const USER_NAMESPACE: &str = "user";

const TAG_BYTES: u8 = 0x01;
const TAG_STRING: u8 = 0x02;
const TAG_U64: u8 = 0x15;

const TERMINATOR: u8 = 0x00;
const ESCAPE: u8 = 0xFF;

/// One element of an encoded key tuple.
///
/// Variant order matches tag order, so the derived `Ord` agrees with the
/// byte order of the encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeyPart {
    Bytes(Vec<u8>),
    Str(String),
    U64(u64),
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_string())
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        KeyPart::U64(value)
    }
}

/// Encode a tuple of key parts.
pub fn encode_tuple(parts: &[KeyPart]) -> Vec<u8> {
    let mut buf = Vec::new();
    for part in parts {
        encode_part(part, &mut buf);
    }
    buf
}

fn encode_part(part: &KeyPart, buf: &mut Vec<u8>) {
    match part {
        KeyPart::Bytes(bytes) => {
            buf.push(TAG_BYTES);
            encode_escaped(bytes, buf);
        }
        KeyPart::Str(value) => {
            buf.push(TAG_STRING);
            encode_escaped(value.as_bytes(), buf);
        }
        KeyPart::U64(value) => {
            buf.push(TAG_U64);
            buf.extend_from_slice(&value.to_be_bytes());
        }
    }
}

fn encode_escaped(bytes: &[u8], buf: &mut Vec<u8>) {
    for &byte in bytes {
        buf.push(byte);
        if byte == TERMINATOR {
            buf.push(ESCAPE);
        }
    }
    buf.push(TERMINATOR);
}

/// Decode an encoded tuple back into its parts.
///
/// # Errors
///
/// Returns `UserDbError::Decode` on an unknown tag, a truncated part, or a
/// string part that is not valid UTF-8.
pub fn decode_tuple(mut bytes: &[u8]) -> Result<Vec<KeyPart>> {
    let mut parts = Vec::new();
    while let Some((&tag, rest)) = bytes.split_first() {
        let (part, remaining) = match tag {
            TAG_BYTES => {
                let (raw, remaining) = decode_escaped(rest)?;
                (KeyPart::Bytes(raw), remaining)
            }
            TAG_STRING => {
                let (raw, remaining) = decode_escaped(rest)?;
                let value = String::from_utf8(raw)
                    .map_err(|e| UserDbError::Decode(format!("Invalid UTF-8 in key: {}", e)))?;
                (KeyPart::Str(value), remaining)
            }
            TAG_U64 => {
                if rest.len() < 8 {
                    return Err(UserDbError::Decode(
                        "Truncated integer in key".to_string(),
                    ));
                }
                let (raw, remaining) = rest.split_at(8);
                let mut array = [0u8; 8];
                array.copy_from_slice(raw);
                (KeyPart::U64(u64::from_be_bytes(array)), remaining)
            }
            other => {
                return Err(UserDbError::Decode(format!(
                    "Unknown key tag 0x{:02x}",
                    other
                )));
            }
        };
        parts.push(part);
        bytes = remaining;
    }
    Ok(parts)
}

fn decode_escaped(bytes: &[u8]) -> Result<(Vec<u8>, &[u8])> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        if byte == TERMINATOR {
            if bytes.get(i + 1) == Some(&ESCAPE) {
                out.push(TERMINATOR);
                i += 2;
                continue;
            }
            return Ok((out, &bytes[i + 1..]));
        }
        out.push(byte);
        i += 1;
    }
    Err(UserDbError::Decode(
        "Unterminated key component".to_string(),
    ))
}

/// Encoded prefix shared by every account key.
pub fn user_prefix() -> Vec<u8> {
    encode_tuple(&[KeyPart::from(USER_NAMESPACE)])
}

/// Turn an email into a key.
pub fn encode_user_key(email: &str) -> Vec<u8> {
    encode_tuple(&[KeyPart::from(USER_NAMESPACE), KeyPart::from(email)])
}

/// Turn a key back into an email.
///
/// # Errors
///
/// Returns `UserDbError::Decode` if the key is malformed, belongs to a
/// different namespace, or has the wrong number of parts.
pub fn decode_user_key(key: &[u8]) -> Result<String> {
    let mut parts = decode_tuple(key)?.into_iter();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(KeyPart::Str(namespace)), Some(KeyPart::Str(email)), None)
            if namespace == USER_NAMESPACE =>
        {
            Ok(email)
        }
        _ => Err(UserDbError::Decode(
            "Key is not an account key".to_string(),
        )),
    }
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// Returns `None` when no such string exists (empty or all-`0xFF` prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

/// Map email bounds onto engine key bounds, clamped to the account namespace.
pub fn user_key_bounds(
    lower: Bound<&str>,
    upper: Bound<&str>,
) -> (Bound<Vec<u8>>, Bound<Vec<u8>>) {
    let prefix = user_prefix();
    let lower = match lower {
        Bound::Included(email) => Bound::Included(encode_user_key(email)),
        Bound::Excluded(email) => Bound::Excluded(encode_user_key(email)),
        Bound::Unbounded => Bound::Included(prefix.clone()),
    };
    let upper = match upper {
        Bound::Included(email) => Bound::Included(encode_user_key(email)),
        Bound::Excluded(email) => Bound::Excluded(encode_user_key(email)),
        Bound::Unbounded => match prefix_successor(&prefix) {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        },
    };
    (lower, upper)
}
