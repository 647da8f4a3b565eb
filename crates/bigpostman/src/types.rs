//! Request methods, response codes and decoded responses.

use bigpacks::{pack_into, PackResult, Value};

use crate::constants::*;

/// Request method, carried in the top byte of the request word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read a resource.
    Get,
    /// Create a resource.
    Post,
    /// Update a resource.
    Put,
    /// Delete a resource.
    Delete,
}

impl Method {
    /// Wire code of the method.
    pub fn code(self) -> u8 {
        match self {
            Method::Get => PM_GET,
            Method::Post => PM_POST,
            Method::Put => PM_PUT,
            Method::Delete => PM_DELETE,
        }
    }

    /// Decode a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            PM_GET => Some(Method::Get),
            PM_POST => Some(Method::Post),
            PM_PUT => Some(Method::Put),
            PM_DELETE => Some(Method::Delete),
            _ => None,
        }
    }

    /// Status a device answers with when the method succeeds.
    pub fn expected_status(self) -> Status {
        match self {
            Method::Get => Status::Content,
            Method::Post => Status::Created,
            Method::Put => Status::Changed,
            Method::Delete => Status::Deleted,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "get"),
            Method::Post => write!(f, "post"),
            Method::Put => write!(f, "put"),
            Method::Delete => write!(f, "delete"),
        }
    }
}

/// Response code, carried in the top byte of the response word.
///
/// The high nibble is the class and the low nibble the detail, so `0x25`
/// reads as 2.05 and `0x4D` as 4.13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// 201 Created.
    Created,
    /// 202 Deleted.
    Deleted,
    /// 204 Changed.
    Changed,
    /// 205 Content.
    Content,
    /// 400 Bad Request.
    BadRequest,
    /// 401 Unauthorized.
    Unauthorized,
    /// 403 Forbidden.
    Forbidden,
    /// 404 Not Found.
    NotFound,
    /// 405 Method Not Allowed.
    MethodNotAllowed,
    /// 413 Request Entity Too Large.
    RequestEntityTooLarge,
    /// Any other code.
    Unknown(u8),
}

impl Status {
    /// Whether the code is in the 2.xx success class.
    pub fn is_success(self) -> bool {
        u8::from(self) >> 4 == 2
    }
}

impl From<u8> for Status {
    fn from(code: u8) -> Self {
        match code {
            PM_201_CREATED => Status::Created,
            PM_202_DELETED => Status::Deleted,
            PM_204_CHANGED => Status::Changed,
            PM_205_CONTENT => Status::Content,
            PM_400_BAD_REQUEST => Status::BadRequest,
            PM_401_UNAUTHORIZED => Status::Unauthorized,
            PM_403_FORBIDDEN => Status::Forbidden,
            PM_404_NOT_FOUND => Status::NotFound,
            PM_405_METHOD_NOT_ALLOWED => Status::MethodNotAllowed,
            PM_413_REQUEST_ENTITY_TOO_LARGE => Status::RequestEntityTooLarge,
            _ => Status::Unknown(code),
        }
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        match status {
            Status::Created => PM_201_CREATED,
            Status::Deleted => PM_202_DELETED,
            Status::Changed => PM_204_CHANGED,
            Status::Content => PM_205_CONTENT,
            Status::BadRequest => PM_400_BAD_REQUEST,
            Status::Unauthorized => PM_401_UNAUTHORIZED,
            Status::Forbidden => PM_403_FORBIDDEN,
            Status::NotFound => PM_404_NOT_FOUND,
            Status::MethodNotAllowed => PM_405_METHOD_NOT_ALLOWED,
            Status::RequestEntityTooLarge => PM_413_REQUEST_ENTITY_TOO_LARGE,
            Status::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Created => write!(f, "201 Created"),
            Status::Deleted => write!(f, "202 Deleted"),
            Status::Changed => write!(f, "204 Changed"),
            Status::Content => write!(f, "205 Content"),
            Status::BadRequest => write!(f, "400 Bad Request"),
            Status::Unauthorized => write!(f, "401 Unauthorized"),
            Status::Forbidden => write!(f, "403 Forbidden"),
            Status::NotFound => write!(f, "404 Not Found"),
            Status::MethodNotAllowed => write!(f, "405 Method Not Allowed"),
            Status::RequestEntityTooLarge => write!(f, "413 Request Entity Too Large"),
            Status::Unknown(code) => write!(f, "0x{:02X}", code),
        }
    }
}

/// A decoded response, minus the echoed token and path.
///
/// Devices may stop after any field, so everything past the status is
/// optional.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Raw status byte.
    pub status: u8,
    /// Resource content.
    pub payload: Option<Value>,
    /// Time the response was produced.
    pub timestamp: Option<Value>,
    /// Device identifier.
    pub identifier: Option<Value>,
    /// Signature over the response.
    pub signature: Option<Value>,
}

impl Response {
    /// Create a response carrying only a status.
    pub fn new(status: impl Into<u8>) -> Self {
        Response {
            status: status.into(),
            payload: None,
            timestamp: None,
            identifier: None,
            signature: None,
        }
    }

    /// Attach content.
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Typed view of the status byte.
    pub fn status(&self) -> Status {
        Status::from(self.status)
    }

    /// The status followed by every field up to the last one present.
    ///
    /// A response with only content yields `[status, payload]`. Gaps before
    /// a later field are filled with null.
    pub fn fields(&self) -> Vec<Value> {
        let optional = self.optional_fields();
        let present = present_len(&optional);

        let mut fields = Vec::with_capacity(1 + present);
        fields.push(Value::from(self.status));
        fields.extend(
            optional[..present]
                .iter()
                .map(|f| f.cloned().unwrap_or(Value::Null)),
        );
        fields
    }

    /// Pack this response as a device would send it, echoing `token` and
    /// `path`. The result still needs framing.
    pub fn encode(&self, token: u32, path: Option<&Value>) -> PackResult<Vec<u8>> {
        let optional = self.optional_fields();
        let present = present_len(&optional);

        let word = ((self.status as u32) << CODE_SHIFT) | (token & TOKEN_MASK);
        let mut buf = Vec::new();
        pack_into(&mut buf, &Value::Integer(word as i32 as i64), false)?;

        if path.is_some() || present > 0 {
            pack_into(&mut buf, path.unwrap_or(&Value::Null), false)?;
        }
        for field in &optional[..present] {
            pack_into(&mut buf, field.unwrap_or(&Value::Null), false)?;
        }
        Ok(buf)
    }

    fn optional_fields(&self) -> [Option<&Value>; 4] {
        [
            self.payload.as_ref(),
            self.timestamp.as_ref(),
            self.identifier.as_ref(),
            self.signature.as_ref(),
        ]
    }
}

/// Number of leading fields up to and including the last present one.
fn present_len(fields: &[Option<&Value>]) -> usize {
    fields.iter().rposition(Option::is_some).map_or(0, |last| last + 1)
}
