//! Request/response client.
//!
//! Each request is one frame holding, in order:
//!
//! ```text
//! [method << 24 | token] [path] [payload]?
//! ```
//!
//! and each response one frame holding:
//!
//! ```text
//! [status << 24 | token] [path]? [payload]? [timestamp]? [identifier]? [signature]?
//! ```
//!
//! Only one request is in flight at a time. The token advances after every
//! request, whether or not it succeeds, and wraps at 24 bits so it never
//! spills into the method byte.

use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bigpacks::{pack_into, unpack, Value};
use log::{debug, trace, warn};

use crate::constants::*;
use crate::error::{PostmanError, PostmanResult};
use crate::frame::FrameTransport;
use crate::stream::ByteStream;
use crate::types::{Method, Response};

/// Configuration for a [`PostmanClient`].
///
/// `timeout` is applied by [`PostmanClient::connect`]. A stream handed to
/// [`PostmanClient::new`] keeps whatever timeout it was opened with.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long to wait for each read of a response. Only used by `connect`.
    pub timeout: Duration,
    /// Log raw frames.
    pub debug: bool,
    /// Pack every float of a request payload as a double.
    pub use_double: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            timeout: DEFAULT_TIMEOUT,
            debug: false,
            use_double: false,
        }
    }
}

impl ClientConfig {
    /// Set the read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable raw frame logging.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Pack floats as doubles.
    pub fn with_double(mut self, use_double: bool) -> Self {
        self.use_double = use_double;
        self
    }
}

/// A client for the resources of one device.
pub struct PostmanClient<S> {
    transport: FrameTransport<S>,
    token: u32,
    use_double: bool,
}

impl PostmanClient<TcpStream> {
    /// Connect to a serial-over-TCP bridge.
    pub fn connect<A: ToSocketAddrs>(addr: A, config: ClientConfig) -> PostmanResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(config.timeout))?;
        stream.set_nodelay(true)?;
        debug!("connected to {}", stream.peer_addr()?);
        Ok(Self::new(stream, config))
    }
}

impl<S: ByteStream> PostmanClient<S> {
    /// Create a client over an open stream.
    ///
    /// `config.timeout` is not applied here; the stream enforces its own
    /// read timeout and reports expiry as a zero-length read.
    pub fn new(stream: S, config: ClientConfig) -> Self {
        debug!(
            "client over caller stream; configured timeout {:?} left to the stream",
            config.timeout
        );
        let mut transport = FrameTransport::new(stream);
        transport.set_debug(config.debug);
        PostmanClient {
            transport,
            token: 0,
            use_double: config.use_double,
        }
    }

    /// Token the next request will carry.
    pub fn token(&self) -> u32 {
        self.token
    }

    /// Override the next token. Only the low 24 bits are kept.
    pub fn set_token(&mut self, token: u32) {
        self.token = token & TOKEN_MASK;
    }

    /// Enable or disable raw frame logging.
    pub fn set_debug(&mut self, debug: bool) {
        self.transport.set_debug(debug);
    }

    /// Read a resource, optionally with a query.
    pub fn get(&mut self, path: &Value, query: Option<&Value>) -> PostmanResult<Response> {
        self.request(Method::Get, path, query)
    }

    /// Create a resource.
    pub fn post(&mut self, path: &Value, data: Option<&Value>) -> PostmanResult<Response> {
        self.request(Method::Post, path, data)
    }

    /// Update a resource.
    pub fn put(&mut self, path: &Value, data: Option<&Value>) -> PostmanResult<Response> {
        self.request(Method::Put, path, data)
    }

    /// Delete a resource, optionally with a query.
    pub fn delete(&mut self, path: &Value, query: Option<&Value>) -> PostmanResult<Response> {
        self.request(Method::Delete, path, query)
    }

    /// Send one request and wait for its response.
    pub fn request(
        &mut self,
        method: Method,
        path: &Value,
        payload: Option<&Value>,
    ) -> PostmanResult<Response> {
        let token = self.token;
        self.token = (token + 1) & TOKEN_MASK;

        let word = ((method.code() as u32) << CODE_SHIFT) | token;
        let mut frame = Vec::new();
        pack_into(&mut frame, &Value::Integer(word as i64), false)?;
        pack_into(&mut frame, path, false)?;
        if let Some(payload) = payload {
            pack_into(&mut frame, payload, self.use_double)?;
        }

        trace!("{} {} (token {:#08X})", method, path, token);
        self.transport.send(&frame)?;
        let reply = self.transport.receive()?;
        let (response, echoed) = parse_response(&reply)?;

        if echoed != token {
            warn!(
                "token mismatch: sent {:#08X}, device answered {:#08X}",
                token, echoed
            );
            return Err(PostmanError::TokenMismatch {
                sent: token,
                received: echoed,
            });
        }
        trace!("{} {} -> {}", method, path, response.status());
        Ok(response)
    }

    /// Write a lone flag byte, which a device treats as an empty frame.
    pub fn send_null(&mut self) -> PostmanResult<()> {
        self.transport.send_null()
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.transport.get_ref()
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.transport.into_inner()
    }
}

/// Decode a response payload into its fields and the echoed token.
fn parse_response(mut data: &[u8]) -> PostmanResult<(Response, u32)> {
    let (head, rest) = unpack(data)?;
    data = rest;
    let word = match head {
        Value::Integer(word) => word,
        other => {
            return Err(PostmanError::MalformedResponse(format!(
                "expected status word, got {}",
                other.kind()
            )))
        }
    };
    let status = ((word >> CODE_SHIFT) & 0xFF) as u8;
    let echoed = (word as u32) & TOKEN_MASK;

    // path, payload, timestamp, identifier, signature
    let mut fields: [Option<Value>; 5] = Default::default();
    for field in fields.iter_mut() {
        if data.is_empty() {
            break;
        }
        let (value, rest) = unpack(data)?;
        *field = Some(value);
        data = rest;
    }
    let [_path, payload, timestamp, identifier, signature] = fields;

    Ok((
        Response {
            status,
            payload,
            timestamp,
            identifier,
            signature,
        },
        echoed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameCodec;
    use crate::types::Status;
    use bigpacks::{pack, unpack_all};
    use std::io::{self, Read, Write};

    /// Replays canned bytes and records everything written.
    #[derive(Default)]
    struct Scripted {
        incoming: io::Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl Scripted {
        fn replying(payloads: &[Vec<u8>]) -> Self {
            let mut wire = Vec::new();
            for payload in payloads {
                wire.extend(FrameCodec::encode(payload));
            }
            Scripted {
                incoming: io::Cursor::new(wire),
                written: Vec::new(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.incoming.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::TimedOut, "no reply")),
                n => Ok(n),
            }
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn sent_values(stream: &Scripted) -> Vec<Value> {
        let mut codec = FrameCodec::new();
        codec.push(&stream.written);
        let payload = FrameCodec::validate(codec.decode().expect("request frame")).unwrap();
        unpack_all(&payload).unwrap()
    }

    #[test]
    fn test_request_layout() {
        let reply = Response::new(Status::Changed).encode(0, None).unwrap();
        let mut client = PostmanClient::new(Scripted::replying(&[reply]), ClientConfig::default());
        let path = Value::List(vec!["config".into(), "name".into()]);

        client.put(&path, Some(&Value::from("node"))).unwrap();

        let sent = sent_values(client.get_ref());
        assert_eq!(
            sent,
            vec![Value::Integer(0x0300_0000), path, Value::from("node")]
        );
    }

    #[test]
    fn test_request_without_payload() {
        let reply = Response::new(Status::Content).encode(0, None).unwrap();
        let mut client = PostmanClient::new(Scripted::replying(&[reply]), ClientConfig::default());

        let response = client.get(&Value::List(vec![]), None).unwrap();
        assert_eq!(response.status(), Status::Content);
        assert_eq!(response.payload, None);
        assert_eq!(sent_values(client.get_ref()).len(), 2);
    }

    #[test]
    fn test_get_sensor_reading() {
        let path = Value::List(vec!["sensors".into(), 0.into()]);
        let reading = Value::map([("temp", 21.5f32)]);
        let reply = Response::new(Status::Content)
            .with_payload(reading.clone())
            .encode(7, Some(&path))
            .unwrap();
        let mut client = PostmanClient::new(Scripted::replying(&[reply]), ClientConfig::default());
        client.set_token(7);

        let response = client.get(&path, None).unwrap();
        assert_eq!(response.fields(), vec![Value::Integer(0x25), reading]);
        assert_eq!(response.timestamp, None);
        assert_eq!(client.token(), 8);

        let sent = sent_values(client.get_ref());
        assert_eq!(sent[0], Value::Integer(0x0100_0007));
    }

    #[test]
    fn test_full_response_fields() {
        let mut response = Response::new(Status::Content).with_payload(Value::from(1));
        response.timestamp = Some(Value::from(1_700_000_000i64));
        response.identifier = Some(Value::Bytes(vec![0xAB; 6]));
        response.signature = Some(Value::Bytes(vec![0xCD; 32]));
        let reply = response.encode(0, Some(&Value::List(vec![]))).unwrap();

        let mut client = PostmanClient::new(Scripted::replying(&[reply]), ClientConfig::default());
        let decoded = client.get(&Value::List(vec![]), None).unwrap();
        assert_eq!(decoded, response);
        assert_eq!(decoded.fields().len(), 5);
    }

    #[test]
    fn test_token_mismatch() {
        let reply = Response::new(Status::Content).encode(5, None).unwrap();
        let mut client = PostmanClient::new(Scripted::replying(&[reply]), ClientConfig::default());

        match client.get(&Value::List(vec![]), None) {
            Err(PostmanError::TokenMismatch { sent, received }) => {
                assert_eq!(sent, 0);
                assert_eq!(received, 5);
            }
            other => panic!("expected token mismatch, got {:?}", other),
        }
        assert_eq!(client.token(), 1);
    }

    #[test]
    fn test_timeout_still_advances_token() {
        let mut client = PostmanClient::new(Scripted::default(), ClientConfig::default());
        assert!(matches!(
            client.get(&Value::List(vec![]), None),
            Err(PostmanError::Timeout)
        ));
        assert_eq!(client.token(), 1);
    }

    #[test]
    fn test_token_wraps_at_24_bits() {
        let reply = Response::new(Status::Content).encode(TOKEN_MASK, None).unwrap();
        let mut client = PostmanClient::new(Scripted::replying(&[reply]), ClientConfig::default());
        client.set_token(TOKEN_MASK);

        client.get(&Value::List(vec![]), None).unwrap();
        assert_eq!(client.token(), 0);
        assert_eq!(sent_values(client.get_ref())[0], Value::Integer(0x01FF_FFFF));
    }

    #[test]
    fn test_malformed_status_word() {
        let reply = pack(&Value::from("hello")).unwrap();
        let mut client = PostmanClient::new(Scripted::replying(&[reply]), ClientConfig::default());
        assert!(matches!(
            client.get(&Value::List(vec![]), None),
            Err(PostmanError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_use_double_widens_payload_floats() {
        let reply = Response::new(Status::Changed).encode(0, None).unwrap();
        let config = ClientConfig::default().with_double(true);
        let mut client = PostmanClient::new(Scripted::replying(&[reply]), config);

        client
            .put(&Value::List(vec!["gain".into()]), Some(&Value::Float32(0.5)))
            .unwrap();
        assert_eq!(sent_values(client.get_ref())[2], Value::Float64(0.5));
    }

    #[test]
    fn test_send_null() {
        let mut client = PostmanClient::new(Scripted::default(), ClientConfig::default());
        client.send_null().unwrap();
        assert_eq!(client.into_inner().written, vec![FLAG_BYTE]);
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::default()
            .with_timeout(Duration::from_millis(250))
            .with_debug(true);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert!(config.debug);
        assert!(!config.use_double);
        assert_eq!(ClientConfig::default().timeout, DEFAULT_TIMEOUT);
    }
}
