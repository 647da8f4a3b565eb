//! Byte stream abstraction over the serial link.

use std::io::{self, ErrorKind, Read, Write};

/// A blocking, ordered byte channel with a read timeout.
///
/// The link has no framing, parity or retransmission of its own; that is
/// what [`FrameTransport`](crate::FrameTransport) adds on top.
pub trait ByteStream {
    /// Write every byte of `data`.
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read whatever is available into `buf`.
    ///
    /// Returns `Ok(0)` when nothing arrived before the stream's timeout.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

// Serial ports, sockets and pipes all come through std's Read/Write.
impl<T: Read + Write> ByteStream for T {
    fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)?;
        self.flush()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(0)
                }
                Err(e) => return Err(e),
            }
        }
    }
}
