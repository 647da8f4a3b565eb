//! Value packing and unpacking.
//!
//! Every packed value starts with a little-endian header word. The top nibble
//! selects the type, the low 28 bits give the content length in 4-byte words.
//!
//! | Type    | Tag | Content                                              |
//! |---------|-----|------------------------------------------------------|
//! | false   | 0x0 | none                                                 |
//! | true    | 0x1 | none                                                 |
//! | null    | 0x2 | none                                                 |
//! | integer | 0x4 | 1 word (i32) or 2 words (i64)                        |
//! | float   | 0x5 | 1 word (f32) or 2 words (f64)                        |
//! | list    | 0x8 | packed items                                         |
//! | map     | 0x9 | packed key, value, key, value...                     |
//! | string  | 0xC | UTF-8 bytes, NUL terminator, zero padding            |
//! | binary  | 0xD | raw bytes, zero padding                              |
//!
//! Packs are therefore always a whole number of words long.

use bytes::BufMut;

use crate::error::{PackError, PackResult};
use crate::value::Value;

// ============================================================================
// Header Constants
// ============================================================================

/// Header of `false`.
pub const BP_FALSE: u32 = 0x0000_0000;
/// Header of `true`.
pub const BP_TRUE: u32 = 0x1000_0000;
/// Header of null.
pub const BP_NONE: u32 = 0x2000_0000;
/// Integer type tag.
pub const BP_INTEGER: u32 = 0x4000_0000;
/// Float type tag.
pub const BP_FLOAT: u32 = 0x5000_0000;
/// List type tag.
pub const BP_LIST: u32 = 0x8000_0000;
/// Map type tag.
pub const BP_MAP: u32 = 0x9000_0000;
/// String type tag.
pub const BP_STRING: u32 = 0xC000_0000;
/// Binary type tag.
pub const BP_BINARY: u32 = 0xD000_0000;

/// Largest content length a header can express, in words.
pub const BP_LENGTH_MAX: u32 = 0x0FFF_FFFF;
/// Mask selecting the content length.
pub const BP_LENGTH_MASK: u32 = 0x0FFF_FFFF;
/// Mask selecting the type tag.
pub const BP_TYPE_MASK: u32 = 0xF000_0000;
/// Bit distinguishing `true` from `false`.
pub const BP_BOOLEAN_MASK: u32 = 0x1000_0000;

/// Size of a header or content word in bytes.
pub const WORD_SIZE: usize = 4;

// ============================================================================
// Packing
// ============================================================================

/// Pack a value. Floats keep the width of their variant.
pub fn pack(value: &Value) -> PackResult<Vec<u8>> {
    pack_with(value, false)
}

/// Pack a value, widening every float in the tree to double precision when
/// `use_double` is set.
pub fn pack_with(value: &Value, use_double: bool) -> PackResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(64);
    pack_into(&mut buf, value, use_double)?;
    Ok(buf)
}

/// Append a packed value to `buf`.
///
/// On error `buf` may hold a partially written value.
pub fn pack_into(buf: &mut Vec<u8>, value: &Value, use_double: bool) -> PackResult<()> {
    match value {
        Value::Null => buf.put_u32_le(BP_NONE),
        Value::Bool(v) => buf.put_u32_le(if *v { BP_TRUE } else { BP_FALSE }),
        Value::Integer(v) => match i32::try_from(*v) {
            Ok(small) => {
                buf.put_u32_le(BP_INTEGER | 1);
                buf.put_i32_le(small);
            }
            Err(_) => {
                buf.put_u32_le(BP_INTEGER | 2);
                buf.put_i64_le(*v);
            }
        },
        Value::Float32(v) if !use_double => {
            buf.put_u32_le(BP_FLOAT | 1);
            buf.put_f32_le(*v);
        }
        Value::Float32(v) => {
            buf.put_u32_le(BP_FLOAT | 2);
            buf.put_f64_le(*v as f64);
        }
        Value::Float64(v) => {
            buf.put_u32_le(BP_FLOAT | 2);
            buf.put_f64_le(*v);
        }
        Value::Text(s) => {
            // +1 reserves the NUL terminator
            let words = (s.len() + 1).div_ceil(WORD_SIZE);
            buf.put_u32_le(header(BP_STRING, words, "string")?);
            buf.put_slice(s.as_bytes());
            buf.put_bytes(0, words * WORD_SIZE - s.len());
        }
        Value::Bytes(b) => {
            let words = b.len().div_ceil(WORD_SIZE);
            buf.put_u32_le(header(BP_BINARY, words, "binary")?);
            buf.put_slice(b);
            buf.put_bytes(0, words * WORD_SIZE - b.len());
        }
        Value::List(items) => {
            let start = open_container(buf);
            for item in items {
                pack_into(buf, item, use_double)?;
            }
            close_container(buf, start, BP_LIST, "list")?;
        }
        Value::Map(entries) => {
            let start = open_container(buf);
            for (key, item) in entries {
                pack_into(buf, key, use_double)?;
                pack_into(buf, item, use_double)?;
            }
            close_container(buf, start, BP_MAP, "map")?;
        }
    }
    Ok(())
}

/// Build a header word, rejecting lengths the 28-bit field cannot hold.
fn header(tag: u32, words: usize, kind: &'static str) -> PackResult<u32> {
    if words > BP_LENGTH_MAX as usize {
        return Err(PackError::TooLong { kind, words });
    }
    Ok(tag | words as u32)
}

/// Reserve a header word and return its position.
fn open_container(buf: &mut Vec<u8>) -> usize {
    let start = buf.len();
    buf.put_u32_le(0);
    start
}

/// Patch the header reserved by [`open_container`] once the content is known.
fn close_container(
    buf: &mut [u8],
    start: usize,
    tag: u32,
    kind: &'static str,
) -> PackResult<()> {
    let words = (buf.len() - start - WORD_SIZE) / WORD_SIZE;
    let word = header(tag, words, kind)?;
    buf[start..start + WORD_SIZE].copy_from_slice(&word.to_le_bytes());
    Ok(())
}

// ============================================================================
// Unpacking
// ============================================================================

/// A container whose content is still being decoded.
enum Open {
    List {
        end: usize,
        items: Vec<Value>,
    },
    Map {
        end: usize,
        entries: Vec<(Value, Value)>,
        key: Option<Value>,
    },
}

impl Open {
    fn end(&self) -> usize {
        match self {
            Open::List { end, .. } | Open::Map { end, .. } => *end,
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Open::List { items, .. } => items.push(value),
            Open::Map { entries, key, .. } => match key.take() {
                Some(k) => entries.push((k, value)),
                None => *key = Some(value),
            },
        }
    }

    fn finish(self) -> PackResult<Value> {
        match self {
            Open::List { items, .. } => Ok(Value::List(items)),
            Open::Map { key: Some(_), end, .. } => Err(PackError::DanglingKey { offset: end }),
            Open::Map { entries, .. } => Ok(Value::Map(entries)),
        }
    }
}

/// Unpack one value from the front of `data`.
///
/// Returns the value and the bytes that follow it. Nested lists and maps are
/// decoded with an explicit stack, so hostile nesting depth cannot overflow
/// the call stack.
pub fn unpack(data: &[u8]) -> PackResult<(Value, &[u8])> {
    let mut stack: Vec<Open> = Vec::new();
    let mut pos = 0;

    loop {
        let offset = pos;
        let limit = stack.last().map_or(data.len(), Open::end);
        let available = limit - offset;
        if available < WORD_SIZE {
            return Err(PackError::Truncated {
                offset,
                needed: WORD_SIZE,
                available,
            });
        }

        let word = read_u32(&data[offset..]);
        let words = word & BP_LENGTH_MASK;
        let content_len = words as usize * WORD_SIZE;
        if content_len > available - WORD_SIZE {
            return Err(PackError::Truncated {
                offset,
                needed: content_len + WORD_SIZE,
                available,
            });
        }
        let content_start = offset + WORD_SIZE;
        let end = content_start + content_len;

        let mut value = match word & BP_TYPE_MASK {
            BP_LIST | BP_MAP if content_len > 0 => {
                stack.push(if word & BP_TYPE_MASK == BP_MAP {
                    Open::Map {
                        end,
                        entries: Vec::new(),
                        key: None,
                    }
                } else {
                    Open::List {
                        end,
                        items: Vec::new(),
                    }
                });
                pos = content_start;
                continue;
            }
            BP_LIST => Value::List(Vec::new()),
            BP_MAP => Value::Map(Vec::new()),
            tag => decode_scalar(tag, words, &data[content_start..end], offset)?,
        };
        pos = end;

        // Hand the value to its parent, closing every container it completes.
        loop {
            let mut parent = match stack.pop() {
                Some(parent) => parent,
                None => return Ok((value, &data[pos..])),
            };
            parent.push(value);
            if pos < parent.end() {
                stack.push(parent);
                break;
            }
            value = parent.finish()?;
        }
    }
}

/// Unpack consecutive values until `data` is exhausted.
pub fn unpack_all(mut data: &[u8]) -> PackResult<Vec<Value>> {
    let mut values = Vec::new();
    while !data.is_empty() {
        let (value, rest) = unpack(data)?;
        values.push(value);
        data = rest;
    }
    Ok(values)
}

fn decode_scalar(tag: u32, words: u32, content: &[u8], offset: usize) -> PackResult<Value> {
    let value = match tag {
        BP_FALSE | BP_TRUE => Value::Bool(tag & BP_BOOLEAN_MASK != 0),
        BP_NONE => Value::Null,
        BP_INTEGER => match words {
            1 => Value::Integer(read_u32(content) as i32 as i64),
            2 => Value::Integer(read_u64(content) as i64),
            _ => {
                return Err(PackError::InvalidLength {
                    kind: "integer",
                    words,
                })
            }
        },
        BP_FLOAT => match words {
            1 => Value::Float32(f32::from_bits(read_u32(content))),
            2 => Value::Float64(f64::from_bits(read_u64(content))),
            _ => {
                return Err(PackError::InvalidLength {
                    kind: "float",
                    words,
                })
            }
        },
        BP_STRING => {
            let text = content.split(|&b| b == 0).next().unwrap_or_default();
            // Bad UTF-8 degrades to an empty string rather than failing the frame.
            Value::Text(String::from_utf8(text.to_vec()).unwrap_or_default())
        }
        BP_BINARY => {
            // Padding is at most the last three bytes of the final word. Data
            // ending in zero bytes loses them; the header has no byte count.
            let padding = content
                .iter()
                .rev()
                .take(WORD_SIZE - 1)
                .take_while(|&&b| b == 0)
                .count();
            Value::Bytes(content[..content.len() - padding].to_vec())
        }
        _ => {
            return Err(PackError::UnknownType {
                offset,
                tag: (tag >> 28) as u8,
            })
        }
    };
    Ok(value)
}

fn read_u32(data: &[u8]) -> u32 {
    u32::from_le_bytes([data[0], data[1], data[2], data[3]])
}

fn read_u64(data: &[u8]) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&data[..8]);
    u64::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(value: Value) {
        let packed = pack(&value).expect("should pack");
        assert_eq!(packed.len() % WORD_SIZE, 0, "{} is not word aligned", value);
        let (decoded, rest) = unpack(&packed).expect("should unpack");
        assert_eq!(decoded, value);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_header_only_values() {
        assert_eq!(pack(&Value::Bool(false)).unwrap(), vec![0, 0, 0, 0x00]);
        assert_eq!(pack(&Value::Bool(true)).unwrap(), vec![0, 0, 0, 0x10]);
        assert_eq!(pack(&Value::Null).unwrap(), vec![0, 0, 0, 0x20]);
        round_trip(Value::Bool(false));
        round_trip(Value::Bool(true));
        round_trip(Value::Null);
    }

    #[test]
    fn test_boolean_bit() {
        let (value, _) = unpack(&BP_TRUE.to_le_bytes()).unwrap();
        assert_eq!(value, Value::Bool(true));
        assert_eq!(BP_TRUE & BP_BOOLEAN_MASK, BP_BOOLEAN_MASK);
        assert_eq!(BP_FALSE & BP_BOOLEAN_MASK, 0);
    }

    #[test]
    fn test_integer_width_selection() {
        let small = pack(&Value::Integer(-37)).unwrap();
        assert_eq!(small, vec![0x01, 0, 0, 0x40, 0xDB, 0xFF, 0xFF, 0xFF]);

        let edge = pack(&Value::Integer(i32::MIN as i64)).unwrap();
        assert_eq!(edge.len(), 8);

        let big = pack(&Value::Integer(1 << 40)).unwrap();
        assert_eq!(big.len(), 12);
        assert_eq!(&big[..4], &[0x02, 0, 0, 0x40]);

        round_trip(Value::Integer(0));
        round_trip(Value::Integer(i32::MAX as i64 + 1));
        round_trip(Value::Integer(i64::MIN));
        round_trip(Value::Integer(i64::MAX));
    }

    #[test]
    fn test_float_widths() {
        assert_eq!(pack(&Value::Float32(1.5)).unwrap().len(), 8);
        assert_eq!(pack(&Value::Float64(1.5)).unwrap().len(), 12);
        round_trip(Value::Float32(21.5));
        round_trip(Value::Float64(-0.1));

        let widened = pack_with(&Value::List(vec![Value::Float32(2.5)]), true).unwrap();
        let (decoded, _) = unpack(&widened).unwrap();
        assert_eq!(decoded, Value::List(vec![Value::Float64(2.5)]));
    }

    #[test]
    fn test_string_layout() {
        // 3 bytes + NUL fit in one word
        assert_eq!(
            pack(&Value::from("abc")).unwrap(),
            vec![0x01, 0, 0, 0xC0, b'a', b'b', b'c', 0]
        );
        // 4 bytes + NUL need two words
        assert_eq!(pack(&Value::from("abcd")).unwrap().len(), 12);
        // Empty string still carries its terminator
        assert_eq!(pack(&Value::from("")).unwrap(), vec![0x01, 0, 0, 0xC0, 0, 0, 0, 0]);
        round_trip(Value::from(""));
        round_trip(Value::from("héllo wörld"));
    }

    #[test]
    fn test_string_truncated_at_nul() {
        let packed = pack(&Value::from("ab\0cd")).unwrap();
        let (decoded, rest) = unpack(&packed).unwrap();
        assert_eq!(decoded, Value::from("ab"));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_invalid_utf8_becomes_empty_string() {
        let data = [0x01, 0, 0, 0xC0, 0xFF, 0xFE, b'a', 0];
        let (decoded, _) = unpack(&data).unwrap();
        assert_eq!(decoded, Value::from(""));
    }

    #[test]
    fn test_binary_padding() {
        assert_eq!(pack(&Value::Bytes(vec![])).unwrap(), vec![0, 0, 0, 0xD0]);
        assert_eq!(
            pack(&Value::Bytes(vec![1, 2, 3, 4, 5])).unwrap(),
            vec![0x02, 0, 0, 0xD0, 1, 2, 3, 4, 5, 0, 0, 0]
        );
        round_trip(Value::Bytes(vec![]));
        round_trip(Value::Bytes(vec![0x7E, 0x7D, 0x01]));
        round_trip(Value::Bytes(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01]));
        round_trip(Value::Bytes(vec![0, 0, 0, 9]));
    }

    #[test]
    fn test_binary_trailing_zeros_are_lost() {
        let unpack_bytes = |bytes: Vec<u8>| {
            let packed = pack(&Value::Bytes(bytes)).unwrap();
            unpack(&packed).unwrap().0
        };
        assert_eq!(unpack_bytes(vec![1, 0, 0, 0]), Value::Bytes(vec![1]));
        assert_eq!(unpack_bytes(vec![0, 0, 0, 0]), Value::Bytes(vec![0]));
        // A 6-byte identifier ending in 0x00 comes back one byte short.
        assert_eq!(
            unpack_bytes(vec![0xAB, 0xCD, 0xEF, 0x01, 0x02, 0x00]),
            Value::Bytes(vec![0xAB, 0xCD, 0xEF, 0x01, 0x02])
        );
    }

    #[test]
    fn test_list_and_map_order() {
        round_trip(Value::List(vec![1.into(), "x".into(), true.into()]));
        round_trip(Value::map([("a", 1), ("b", 2)]));
        round_trip(Value::List(vec![]));
        round_trip(Value::Map(vec![]));

        let packed = pack(&Value::List(vec![1.into(), "x".into(), true.into()])).unwrap();
        // header + integer(2 words) + string(2 words) + true(1 word)
        assert_eq!(&packed[..4], &[0x05, 0, 0, 0x80]);
    }

    #[test]
    fn test_nested_containers() {
        round_trip(Value::map([
            (
                Value::from("sensors"),
                Value::List(vec![
                    Value::map([("id", Value::from(0)), ("temp", Value::Float32(21.5))]),
                    Value::List(vec![Value::List(vec![]), Value::Null]),
                ]),
            ),
            (Value::from(7), Value::Bytes(vec![1, 2])),
        ]));
    }

    #[test]
    fn test_deep_nesting_does_not_recurse() {
        let depth = 100_000;
        let mut data = Vec::with_capacity((depth + 1) * WORD_SIZE);
        for level in 0..depth {
            let words = (depth - level) as u32;
            data.extend_from_slice(&(BP_LIST | words).to_le_bytes());
        }
        data.extend_from_slice(&BP_NONE.to_le_bytes());

        let (value, rest) = unpack(&data).expect("should unpack deep nesting");
        assert!(rest.is_empty());
        assert!(matches!(value, Value::List(_)));
        // Dropping a deeply nested value recurses; leak it in the test.
        std::mem::forget(value);
    }

    #[test]
    fn test_back_to_back_values() {
        let mut data = pack(&Value::Integer(7)).unwrap();
        data.extend(pack(&Value::from("x")).unwrap());
        let (first, rest) = unpack(&data).unwrap();
        assert_eq!(first, Value::Integer(7));
        let (second, rest) = unpack(rest).unwrap();
        assert_eq!(second, Value::from("x"));
        assert!(rest.is_empty());

        assert_eq!(
            unpack_all(&data).unwrap(),
            vec![Value::Integer(7), Value::from("x")]
        );
    }

    #[test]
    fn test_truncated_input() {
        assert!(matches!(unpack(&[]), Err(PackError::Truncated { .. })));
        assert!(matches!(unpack(&[0, 0]), Err(PackError::Truncated { .. })));

        let packed = pack(&Value::from("hello")).unwrap();
        let err = unpack(&packed[..packed.len() - 4]).unwrap_err();
        assert_eq!(
            err,
            PackError::Truncated {
                offset: 0,
                needed: 12,
                available: 8
            }
        );
    }

    #[test]
    fn test_child_overruns_container() {
        // List claims one word, but its child claims two more.
        let mut data = (BP_LIST | 1).to_le_bytes().to_vec();
        data.extend_from_slice(&(BP_INTEGER | 1).to_le_bytes());
        data.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            unpack(&data),
            Err(PackError::Truncated { offset: 4, .. })
        ));
    }

    #[test]
    fn test_bad_numeric_lengths() {
        let mut data = (BP_INTEGER | 3).to_le_bytes().to_vec();
        data.extend_from_slice(&[0; 12]);
        assert_eq!(
            unpack(&data).unwrap_err(),
            PackError::InvalidLength {
                kind: "integer",
                words: 3
            }
        );

        let data = BP_FLOAT.to_le_bytes();
        assert_eq!(
            unpack(&data).unwrap_err(),
            PackError::InvalidLength {
                kind: "float",
                words: 0
            }
        );
    }

    #[test]
    fn test_unknown_type_tag() {
        let data = 0xE000_0000u32.to_le_bytes();
        assert_eq!(
            unpack(&data).unwrap_err(),
            PackError::UnknownType { offset: 0, tag: 0xE }
        );
    }

    #[test]
    fn test_map_with_dangling_key() {
        let key = pack(&Value::from("a")).unwrap();
        let mut data = (BP_MAP | (key.len() / WORD_SIZE) as u32).to_le_bytes().to_vec();
        data.extend(key);
        assert_eq!(
            unpack(&data).unwrap_err(),
            PackError::DanglingKey { offset: 12 }
        );
    }

    #[test]
    fn test_length_limit() {
        assert!(header(BP_STRING, BP_LENGTH_MAX as usize, "string").is_ok());
        assert_eq!(
            header(BP_BINARY, BP_LENGTH_MAX as usize + 1, "binary"),
            Err(PackError::TooLong {
                kind: "binary",
                words: 0x1000_0000
            })
        );
    }
}
