//! # Transport
//!
//! Purpose: Hide the wire client behind a small blocking interface: send one
//! command, get one reply. The slot table never sees sockets directly.
//!
//! ## Design Principles
//! 1. **Strategy Pattern**: `Connector`/`Transport` let tests swap the TCP
//!    implementation for scripted ones without touching slot logic.
//! 2. **Buffer Reuse**: Each TCP transport owns its read and write buffers.
//! 3. **Errors Mean Broken**: Any `TransportError` means the stream can no
//!    longer be trusted. Store-side `-ERR` replies are *not* transport errors;
//!    they come back as `RespValue::Error`.

use std::io::{self, BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use thiserror::Error;

use crate::config::ClientConfig;
use crate::resp::{encode_command, read_response, RespValue};

/// Failure to communicate with the store at all.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(&'static str),
    #[error("could not resolve address {0}")]
    InvalidAddress(String),
    #[error("connection closed")]
    Closed,
}

/// A live connection able to execute one command at a time.
pub trait Transport: Send {
    /// Sends one command and waits for its reply.
    fn exec(&mut self, args: &[&[u8]]) -> Result<RespValue, TransportError>;
}

/// Factory for new transports, one per opened slot.
pub trait Connector: Send + Sync {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Transport>, TransportError>;
}

/// Opens blocking TCP connections configured by `ClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: ClientConfig,
}

impl TcpConnector {
    pub fn new(config: ClientConfig) -> Self {
        TcpConnector { config }
    }
}

impl Connector for TcpConnector {
    fn connect(&self, host: &str, port: u16) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(TcpTransport::connect(host, port, &self.config)?))
    }
}

/// Single TCP connection with reusable buffers.
pub struct TcpTransport {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl TcpTransport {
    pub fn connect(host: &str, port: u16, config: &ClientConfig) -> Result<Self, TransportError> {
        let stream = connect_stream(host, port, config)?;
        stream.set_read_timeout(config.read_timeout())?;
        stream.set_write_timeout(config.write_timeout())?;
        stream.set_nodelay(config.nodelay)?;

        Ok(TcpTransport {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        })
    }
}

impl Transport for TcpTransport {
    fn exec(&mut self, args: &[&[u8]]) -> Result<RespValue, TransportError> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }
}

fn connect_stream(host: &str, port: u16, config: &ClientConfig) -> Result<TcpStream, TransportError> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|_| TransportError::InvalidAddress(format!("{}:{}", host, port)))?
        .collect();

    // Try every resolved address, reporting the last failure.
    let mut last_err = None;
    for addr in &addrs {
        let attempt = match config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }

    Err(match last_err {
        Some(err) => TransportError::Io(err),
        None => TransportError::InvalidAddress(format!("{}:{}", host, port)),
    })
}
