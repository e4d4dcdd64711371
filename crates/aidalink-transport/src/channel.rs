use std::fmt;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use aidalink_frame::{Header, Message};
use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::ChannelConfig;
use crate::error::{Result, TransportError};
use crate::io;

/// Robot address as configured by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One TCP connection for one traffic class.
///
/// Reads and writes are serialised by an internal lock, so a header and the
/// body it announces are never split by another thread on the same channel.
/// [`Channel::close`] bypasses that lock and shuts the socket down, which
/// wakes a thread blocked in [`Channel::receive`].
pub struct Channel {
    endpoint: Endpoint,
    stream: Mutex<TcpStream>,
    control: TcpStream,
    closed: AtomicBool,
}

impl Channel {
    /// Connect with the given timeout and default socket options.
    pub fn open(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        Self::open_with_config(
            host,
            port,
            &ChannelConfig::default().with_connect_timeout(connect_timeout),
        )
    }

    /// Connect with explicit socket options.
    ///
    /// Every resolved address is tried in turn. A socket that connected but
    /// could not be configured is dropped before returning the error.
    pub fn open_with_config(host: &str, port: u16, config: &ChannelConfig) -> Result<Self> {
        let endpoint = Endpoint::new(host, port);
        let failed = |source: std::io::Error| TransportError::ConnectionFailed {
            host: host.to_string(),
            port,
            source,
        };

        if config.connect_timeout.is_zero() {
            return Err(failed(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "connect timeout must be greater than zero",
            )));
        }

        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs().map_err(failed)?.collect();
        let mut last_err = None;
        let mut connected = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, config.connect_timeout) {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(err) => {
                    debug!(%addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }
        let stream = match connected {
            Some(stream) => stream,
            None => {
                return Err(failed(last_err.unwrap_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::AddrNotAvailable,
                        "host resolved to no addresses",
                    )
                })))
            }
        };

        stream.set_read_timeout(config.read_timeout).map_err(failed)?;
        stream
            .set_write_timeout(config.write_timeout)
            .map_err(failed)?;
        stream.set_nodelay(config.nodelay).map_err(failed)?;
        let control = stream.try_clone().map_err(failed)?;

        debug!(%endpoint, "channel connected");
        Ok(Self {
            endpoint,
            stream: Mutex::new(stream),
            control,
            closed: AtomicBool::new(false),
        })
    }

    /// Write a complete buffer (blocking).
    pub fn send(&self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let mut stream = self.lock();
        io::write_all(&mut *stream, data)?;
        trace!(endpoint = %self.endpoint, bytes = data.len(), "sent");
        Ok(())
    }

    /// Read exactly `size` bytes (blocking).
    pub fn receive(&self, size: usize) -> Result<Bytes> {
        self.ensure_open()?;
        let mut stream = self.lock();
        let bytes = io::read_exact(&mut *stream, size)?;
        trace!(endpoint = %self.endpoint, bytes = size, "received");
        Ok(bytes)
    }

    /// Read and decode the next header.
    pub fn get_header(&self) -> Result<Header> {
        self.ensure_open()?;
        let mut stream = self.lock();
        io::read_header(&mut *stream)
    }

    /// Read a header and its body while holding the channel lock.
    pub fn receive_message(&self) -> Result<Message> {
        self.ensure_open()?;
        let mut stream = self.lock();
        let message = io::read_message(&mut *stream)?;
        trace!(
            endpoint = %self.endpoint,
            id = message.id,
            bytes = message.payload.len(),
            "received message"
        );
        Ok(message)
    }

    /// Shut the socket down. Safe to call repeatedly and from any thread.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = self.control.shutdown(Shutdown::Both) {
            // Already reset by the peer; nothing left to release.
            trace!(endpoint = %self.endpoint, error = %err, "shutdown after close");
        }
        debug!(endpoint = %self.endpoint, "channel closed");
    }

    /// Whether [`Channel::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The address this channel was opened with.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Local socket address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.control
            .local_addr()
            .map_err(|err| TransportError::Disconnected(Some(err)))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(TransportError::Disconnected(None));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, TcpStream> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use aidalink_frame::{encode_header, FrameError};

    use super::*;

    fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        (listener, port)
    }

    fn closed_port() -> u16 {
        let (listener, port) = listener();
        drop(listener);
        port
    }

    fn open(port: u16) -> Channel {
        Channel::open("127.0.0.1", port, Duration::from_secs(2)).expect("channel should open")
    }

    #[test]
    fn receive_gathers_three_short_writes() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.set_nodelay(true).unwrap();
            for chunk in [&b"hello"[..], b", w", b"orld!"] {
                peer.write_all(chunk).unwrap();
                peer.flush().unwrap();
                thread::sleep(Duration::from_millis(20));
            }
        });

        let channel = open(port);
        let bytes = channel.receive(13).unwrap();
        assert_eq!(bytes.as_ref(), b"hello, world!");
        server.join().unwrap();
    }

    #[test]
    fn peer_close_mid_read_is_disconnected() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.write_all(b"12345678").unwrap();
        });

        let channel = open(port);
        server.join().unwrap();
        let err = channel.receive(13).unwrap_err();
        assert!(matches!(err, TransportError::Disconnected(_)));
    }

    #[test]
    fn closed_port_fails_fast() {
        let port = closed_port();
        let started = Instant::now();
        let err = Channel::open("127.0.0.1", port, Duration::from_millis(2000)).unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(2500));
        match err {
            TransportError::ConnectionFailed { host, port: p, .. } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(p, port);
            }
            other => panic!("expected ConnectionFailed, got {other:?}"),
        }
    }

    #[test]
    fn zero_connect_timeout_rejected() {
        let (_listener, port) = listener();
        let err = Channel::open("127.0.0.1", port, Duration::ZERO).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed { .. }));
    }

    #[test]
    fn read_timeout_is_distinct_from_disconnect() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (peer, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(300));
            drop(peer);
        });

        let config = ChannelConfig {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Some(Duration::from_millis(50)),
            ..ChannelConfig::default()
        };
        let channel = Channel::open_with_config("127.0.0.1", port, &config).unwrap();
        let err = channel.receive(6).unwrap_err();
        assert!(matches!(err, TransportError::ReadTimeout(_)));
        server.join().unwrap();
    }

    #[test]
    fn close_unblocks_pending_receive() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut sink = Vec::new();
            let _ = peer.read_to_end(&mut sink);
        });

        let channel = Arc::new(open(port));
        let reader = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || channel.receive(6))
        };
        thread::sleep(Duration::from_millis(100));
        channel.close();

        let result = reader.join().unwrap();
        assert!(matches!(result, Err(TransportError::Disconnected(_))));
        server.join().unwrap();
    }

    #[test]
    fn close_is_idempotent() {
        let (_listener, port) = listener();
        let channel = open(port);
        channel.close();
        channel.close();
        assert!(channel.is_closed());
        assert!(matches!(
            channel.send(b"x"),
            Err(TransportError::Disconnected(None))
        ));
    }

    #[test]
    fn send_writes_whole_message() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            let mut buf = [0u8; 8];
            peer.read_exact(&mut buf).unwrap();
            buf
        });

        let channel = open(port);
        channel.send(&[0, 1, 0, 0, 0, 2, 0, 1]).unwrap();
        assert_eq!(server.join().unwrap(), [0, 1, 0, 0, 0, 2, 0, 1]);
    }

    #[test]
    fn get_header_and_receive_message() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.write_all(&encode_header(9, 2)).unwrap();
            peer.write_all(b"hi").unwrap();
            peer.write_all(&encode_header(10, 3)).unwrap();
            peer.write_all(b"jpg").unwrap();
        });

        let channel = open(port);
        let header = channel.get_header().unwrap();
        assert_eq!(header, Header::new(9, 2));
        assert_eq!(channel.receive(header.payload_len()).unwrap().as_ref(), b"hi");

        let message = channel.receive_message().unwrap();
        assert_eq!(message.id, 10);
        assert_eq!(message.payload.as_ref(), b"jpg");
        server.join().unwrap();
    }

    #[test]
    fn negative_header_length_is_protocol_error() {
        let (listener, port) = listener();
        let server = thread::spawn(move || {
            let (mut peer, _) = listener.accept().unwrap();
            peer.write_all(&[0x00, 0x0a, 0x80, 0x00, 0x00, 0x01]).unwrap();
        });

        let channel = open(port);
        let err = channel.get_header().unwrap_err();
        assert!(matches!(
            err,
            TransportError::Protocol(FrameError::NegativeLength(_))
        ));
        server.join().unwrap();
    }
}
