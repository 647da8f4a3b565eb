//! BigPacks Value Packing
//!
//! This crate provides a compact, self-describing binary format for a small
//! closed set of value kinds: null, booleans, integers, floats, strings,
//! binary blobs, lists and maps.
//!
//! # Format Overview
//!
//! Every value is a little-endian header word followed by its content. The
//! header carries a 4-bit type tag and a 28-bit content length counted in
//! 4-byte words, so every pack is word aligned and can be skipped without
//! understanding its content.
//!
//! # Example
//!
//! ```rust
//! use bigpacks::{pack, unpack, Value};
//!
//! let path = Value::List(vec!["sensors".into(), 0.into()]);
//! let packed = pack(&path).unwrap();
//! assert_eq!(packed.len() % 4, 0);
//!
//! let (decoded, rest) = unpack(&packed).unwrap();
//! assert_eq!(decoded, path);
//! assert!(rest.is_empty());
//! ```

mod codec;
mod error;
mod value;

pub use codec::*;
pub use error::*;
pub use value::*;
