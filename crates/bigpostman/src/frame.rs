//! Frame encoding/decoding utilities.
//!
//! A frame is a payload followed by its CRC-32 (little-endian), byte-stuffed
//! between two flag bytes:
//!
//! ```text
//! +------+-------------------------------+---------+------+
//! | 0x7E | payload (stuffed)             | crc32   | 0x7E |
//! +------+-------------------------------+---------+------+
//! ```
//!
//! Inside a frame `0x7E` is sent as `0x7D 0x5E` and `0x7D` as `0x7D 0x5D`.
//! A bare flag byte carries no frame and is used to resynchronize the link.

use bytes::{BufMut, BytesMut};
use log::{debug, trace, warn};
use std::collections::VecDeque;

use crate::constants::*;
use crate::crc::crc32;
use crate::error::{PostmanError, PostmanResult};
use crate::stream::ByteStream;

/// Frames larger than this still decode; it only sizes the initial buffer.
const INITIAL_BUFFER_SIZE: usize = 256;

/// Bytes requested from the stream per read.
const READ_CHUNK_SIZE: usize = 64;

/// A codec for stuffing and unstuffing frames.
///
/// Decoding is incremental: feed raw link bytes with [`push`](Self::push) and
/// collect complete frame bodies with [`decode`](Self::decode).
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Unstuffed bytes of the frame being received.
    buffer: BytesMut,
    /// Whether the previous byte was an escape.
    escape: bool,
    /// Complete frame bodies not yet taken.
    frames: VecDeque<Vec<u8>>,
}

impl FrameCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            escape: false,
            frames: VecDeque::new(),
        }
    }

    /// Add received data.
    pub fn push(&mut self, data: &[u8]) {
        for &byte in data {
            if self.escape {
                self.escape = false;
                self.buffer.put_u8(byte ^ ESCAPE_MASK);
            } else if byte == ESCAPE_BYTE {
                self.escape = true;
            } else if byte == FLAG_BYTE {
                // Back-to-back flags delimit nothing.
                if !self.buffer.is_empty() {
                    let body = self.buffer.split().to_vec();
                    self.frames.push_back(body);
                }
            } else {
                self.buffer.put_u8(byte);
            }
        }
    }

    /// Take the next complete frame body, CRC included.
    ///
    /// Returns `None` if more data is needed.
    pub fn decode(&mut self) -> Option<Vec<u8>> {
        self.frames.pop_front()
    }

    /// Check a frame body and strip its CRC, leaving the payload.
    pub fn validate(mut body: Vec<u8>) -> PostmanResult<Vec<u8>> {
        if body.len() >= MIN_FRAME_SIZE && crc32(&body) == CRC_RESIDUE {
            body.truncate(body.len() - CRC_SIZE);
            return Ok(body);
        }

        let split = body.len().saturating_sub(CRC_SIZE);
        let (payload, tail) = body.split_at(split);
        let mut carried = [0u8; CRC_SIZE];
        carried[..tail.len()].copy_from_slice(tail);
        Err(PostmanError::Integrity {
            computed: crc32(payload),
            expected: u32::from_le_bytes(carried),
        })
    }

    /// Encode a payload as a complete frame, flags included.
    pub fn encode(payload: &[u8]) -> Vec<u8> {
        let crc = crc32(payload).to_le_bytes();
        // Worst case every byte is escaped.
        let mut buf = Vec::with_capacity(2 * (payload.len() + CRC_SIZE) + 2);
        buf.push(FLAG_BYTE);
        stuff_into(&mut buf, payload);
        stuff_into(&mut buf, &crc);
        buf.push(FLAG_BYTE);
        buf
    }

    /// Get the number of buffered bytes of the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial or undelivered frames.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.escape = false;
        self.frames.clear();
    }
}

/// Append `data` to `buf`, escaping flag and escape bytes.
fn stuff_into(buf: &mut Vec<u8>, data: &[u8]) {
    for &byte in data {
        if byte == FLAG_BYTE || byte == ESCAPE_BYTE {
            buf.push(ESCAPE_BYTE);
            buf.push(byte ^ ESCAPE_MASK);
        } else {
            buf.push(byte);
        }
    }
}

/// Format bytes as `7E 01 ... [n]` for frame logging.
pub(crate) fn hex_dump(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3 + 8);
    for byte in data {
        out.push_str(&format!("{:02X} ", byte));
    }
    out.push_str(&format!("[{}]", data.len()));
    out
}

/// Sends and receives frames over a [`ByteStream`].
///
/// Only one frame is expected at a time; bytes read past the end of a frame
/// are kept for the next [`receive`](Self::receive).
pub struct FrameTransport<S> {
    stream: S,
    codec: FrameCodec,
    debug: bool,
}

impl<S: ByteStream> FrameTransport<S> {
    /// Wrap a byte stream.
    pub fn new(stream: S) -> Self {
        FrameTransport {
            stream,
            codec: FrameCodec::new(),
            debug: false,
        }
    }

    /// Log raw frame bytes at debug level.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Frame `payload` and write it.
    pub fn send(&mut self, payload: &[u8]) -> PostmanResult<()> {
        if self.debug {
            let mut body = payload.to_vec();
            body.extend_from_slice(&crc32(payload).to_le_bytes());
            debug!("TX: {}", hex_dump(&body));
        }
        let frame = FrameCodec::encode(payload);
        trace!(
            "sending frame: {} payload bytes, {} on the wire",
            payload.len(),
            frame.len()
        );
        self.stream.write_bytes(&frame)?;
        Ok(())
    }

    /// Write a lone flag byte.
    pub fn send_null(&mut self) -> PostmanResult<()> {
        trace!("sending flag byte");
        self.stream.write_bytes(&[FLAG_BYTE])?;
        Ok(())
    }

    /// Block until a frame arrives and return its validated payload.
    pub fn receive(&mut self) -> PostmanResult<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            if let Some(body) = self.codec.decode() {
                if self.debug {
                    debug!("RX: {}", hex_dump(&body));
                }
                let payload =
                    FrameCodec::validate(body).inspect_err(|e| warn!("dropping frame: {}", e))?;
                trace!("received frame: {} payload bytes", payload.len());
                return Ok(payload);
            }

            let n = self.stream.read_bytes(&mut chunk)?;
            if n == 0 {
                self.codec.clear();
                return Err(PostmanError::Timeout);
            }
            self.codec.push(&chunk[..n]);
        }
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}
