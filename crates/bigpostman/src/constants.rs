//! Protocol constants
//!
//! These constants define the framing bytes, integrity check, request methods
//! and response codes used on the postman serial link.

use std::time::Duration;

// ============================================================================
// Framing
// ============================================================================

/// Delimits frames on the byte stream.
pub const FLAG_BYTE: u8 = 0x7E;
/// Prefixes an escaped byte inside a frame.
pub const ESCAPE_BYTE: u8 = 0x7D;
/// XOR applied to a byte that follows [`ESCAPE_BYTE`].
pub const ESCAPE_MASK: u8 = 0x20;

/// Size of the trailing CRC-32.
pub const CRC_SIZE: usize = 4;
/// CRC-32 of any payload followed by its own little-endian CRC.
pub const CRC_RESIDUE: u32 = 0x2144_DF1C;
/// Smallest valid frame body: two minimal packs and the CRC.
pub const MIN_FRAME_SIZE: usize = 12;

// ============================================================================
// Request Methods (host → device)
// ============================================================================

/// Read a resource.
pub const PM_GET: u8 = 0x01;
/// Create a resource.
pub const PM_POST: u8 = 0x02;
/// Update a resource.
pub const PM_PUT: u8 = 0x03;
/// Delete a resource.
pub const PM_DELETE: u8 = 0x04;

// ============================================================================
// Response Codes (device → host)
// ============================================================================

/// 201 Created.
pub const PM_201_CREATED: u8 = 0x21;
/// 202 Deleted.
pub const PM_202_DELETED: u8 = 0x22;
/// 204 Changed.
pub const PM_204_CHANGED: u8 = 0x24;
/// 205 Content.
pub const PM_205_CONTENT: u8 = 0x25;
/// 400 Bad Request.
pub const PM_400_BAD_REQUEST: u8 = 0x40;
/// 401 Unauthorized.
pub const PM_401_UNAUTHORIZED: u8 = 0x41;
/// 403 Forbidden.
pub const PM_403_FORBIDDEN: u8 = 0x43;
/// 404 Not Found.
pub const PM_404_NOT_FOUND: u8 = 0x44;
/// 405 Method Not Allowed.
pub const PM_405_METHOD_NOT_ALLOWED: u8 = 0x45;
/// 413 Request Entity Too Large.
pub const PM_413_REQUEST_ENTITY_TOO_LARGE: u8 = 0x4D;

// ============================================================================
// Tokens
// ============================================================================

/// Bits of the method/status word that carry the token.
pub const TOKEN_MASK: u32 = 0x00FF_FFFF;
/// Shift placing the method or status above the token.
pub const CODE_SHIFT: u32 = 24;

// ============================================================================
// Defaults
// ============================================================================

/// Read timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
