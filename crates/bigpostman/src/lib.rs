//! BigPostman Serial Resource Protocol
//!
//! This crate lets a host read and modify the resources of a small device
//! reachable over a serial link, using GET/POST/PUT/DELETE requests.
//!
//! # Protocol Overview
//!
//! - **Values** are packed with [`bigpacks`].
//! - **Frames** carry packed values plus a CRC-32, byte-stuffed between
//!   `0x7E` flags so they survive a link with no message boundaries.
//! - **Requests** (host → device) start with `method << 24 | token`.
//! - **Responses** (device → host) start with `status << 24 | token`; the
//!   token must match the request.
//!
//! # Example
//!
//! ```rust,ignore
//! use bigpostman::{ClientConfig, PostmanClient, Status};
//! use bigpacks::Value;
//!
//! let mut client = PostmanClient::connect("127.0.0.1:9000", ClientConfig::default())?;
//! let path = Value::List(vec!["sensors".into(), 0.into()]);
//! let response = client.get(&path, None)?;
//! if response.status() == Status::Content {
//!     println!("{}", response.payload.unwrap_or(Value::Null));
//! }
//! ```

mod client;
mod constants;
mod crc;
mod error;
mod frame;
mod stream;
mod types;

pub use client::*;
pub use constants::*;
pub use crc::*;
pub use error::*;
pub use frame::*;
pub use stream::*;
pub use types::*;
