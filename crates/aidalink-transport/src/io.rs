//! Exact-size read and whole-buffer write loops over any `Read`/`Write`.

use std::io::{ErrorKind, Read, Write};

use aidalink_frame::{decode_header, Header, Message, HEADER_SIZE};
use bytes::{Bytes, BytesMut};

use crate::error::{Result, TransportError};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Read exactly `size` bytes (blocking).
///
/// Short reads are gathered internally. The buffer grows one chunk at a time
/// as bytes arrive, so a header announcing a huge body costs nothing until
/// the body actually shows up. EOF before `size` bytes arrive is
/// [`TransportError::Disconnected`]; an expired read timeout is
/// [`TransportError::ReadTimeout`].
pub fn read_exact<R: Read>(inner: &mut R, size: usize) -> Result<Bytes> {
    let mut buf = BytesMut::with_capacity(size.min(READ_CHUNK_SIZE));
    while buf.len() < size {
        let filled = buf.len();
        let end = size.min(filled + READ_CHUNK_SIZE);
        buf.resize(end, 0);
        let n = match inner.read(&mut buf[filled..end]) {
            Ok(0) => return Err(TransportError::Disconnected(None)),
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => 0,
            Err(err) if is_timeout(&err) => return Err(TransportError::ReadTimeout(err)),
            Err(err) => return Err(TransportError::Disconnected(Some(err))),
        };
        buf.truncate(filled + n);
    }
    Ok(buf.freeze())
}

/// Read and decode one header.
pub fn read_header<R: Read>(inner: &mut R) -> Result<Header> {
    let bytes = read_exact(inner, HEADER_SIZE)?;
    Ok(decode_header(&bytes)?)
}

/// Read one header and the body it announces.
pub fn read_message<R: Read>(inner: &mut R) -> Result<Message> {
    let header = read_header(inner)?;
    let payload = read_exact(inner, header.payload_len())?;
    Ok(Message {
        id: header.message_id,
        payload,
    })
}

/// Write the whole buffer and flush (blocking).
pub fn write_all<W: Write>(inner: &mut W, data: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < data.len() {
        match inner.write(&data[offset..]) {
            Ok(0) => {
                return Err(TransportError::Disconnected(Some(std::io::Error::from(
                    ErrorKind::WriteZero,
                ))))
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Disconnected(Some(err))),
        }
    }

    loop {
        match inner.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Disconnected(Some(err))),
        }
    }
}

// Unix reports an expired SO_RCVTIMEO as WouldBlock, Windows as TimedOut.
fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
