//! # RESP2 Encoding and Parsing
//!
//! Purpose: Frame outgoing commands and parse one reply per command from a
//! buffered reader, producing the typed reply union the translator consumes.
//!
//! ## Design Principles
//! 1. **Top-Down Parsing**: Replies are parsed recursively with no state kept
//!    between calls.
//! 2. **Buffer Reuse**: Callers own the line and write buffers.
//! 3. **Single Null**: Both `$-1` and `*-1` parse to `RespValue::Nil`.
//! 4. **Fail Fast**: Any framing violation is a transport error; the caller
//!    cannot trust the stream afterwards.
//! 5. **Bounded Input**: Length headers and nesting are capped before any
//!    allocation, so a hostile reply cannot exhaust memory or the stack.

use std::io::{BufRead, Read};

use crate::transport::TransportError;

/// Largest bulk payload accepted (the store's `proto-max-bulk-len` default).
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest array element count accepted.
pub const MAX_ARRAY_LEN: i64 = u32::MAX as i64;

/// Deepest array nesting accepted.
pub const MAX_DEPTH: usize = 32;

/// Typed reply value returned by the store for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// `+OK` style status replies.
    Status(Vec<u8>),
    /// `-ERR ...` replies.
    Error(Vec<u8>),
    /// `:123` replies.
    Integer(i64),
    /// `$n` bulk strings.
    Bulk(Vec<u8>),
    /// `$-1` or `*-1`.
    Nil,
    /// `*n` arrays.
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Convenience constructor for text bulk replies.
    pub fn bulk(data: impl AsRef<[u8]>) -> Self {
        RespValue::Bulk(data.as_ref().to_vec())
    }

    /// Convenience constructor for status replies.
    pub fn status(text: &str) -> Self {
        RespValue::Status(text.as_bytes().to_vec())
    }
}

/// Encodes a RESP2 array command into the provided buffer.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    push_header(out, b'*', args.len());
    for arg in args {
        push_header(out, b'$', arg.len());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

fn push_header(out: &mut Vec<u8>, prefix: u8, len: usize) {
    out.push(prefix);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Reads one RESP value from the buffered reader.
pub fn read_response<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
) -> Result<RespValue, TransportError> {
    read_value(reader, line_buf, 0)
}

fn read_value<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> Result<RespValue, TransportError> {
    read_line(reader, line_buf)?;
    let (&prefix, rest) = line_buf
        .split_first()
        .ok_or(TransportError::Protocol("empty reply line"))?;

    match prefix {
        b'+' => Ok(RespValue::Status(rest.to_vec())),
        b'-' => Ok(RespValue::Error(rest.to_vec())),
        b':' => Ok(RespValue::Integer(parse_i64(rest)?)),
        b'$' => {
            let len = parse_i64(rest)?;
            read_bulk(reader, len, line_buf)
        }
        b'*' => {
            let len = parse_i64(rest)?;
            read_array(reader, len, line_buf, depth)
        }
        _ => Err(TransportError::Protocol("unknown reply type prefix")),
    }
}

fn read_bulk<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
) -> Result<RespValue, TransportError> {
    match len {
        -1 => return Ok(RespValue::Nil),
        len if len < 0 => return Err(TransportError::Protocol("negative bulk length")),
        len if len > MAX_BULK_LEN => return Err(TransportError::Protocol("bulk length too large")),
        _ => {}
    }

    // Grows with the bytes actually received rather than the header.
    let mut data = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() as i64 != len {
        return Err(TransportError::Protocol("connection closed inside bulk string"));
    }

    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != *b"\r\n" {
        return Err(TransportError::Protocol("bulk string missing CRLF"));
    }

    line_buf.clear();
    Ok(RespValue::Bulk(data))
}

fn read_array<R: BufRead>(
    reader: &mut R,
    len: i64,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> Result<RespValue, TransportError> {
    match len {
        -1 => return Ok(RespValue::Nil),
        len if len < 0 => return Err(TransportError::Protocol("negative array length")),
        len if len > MAX_ARRAY_LEN => return Err(TransportError::Protocol("array length too large")),
        _ => {}
    }
    if depth >= MAX_DEPTH {
        return Err(TransportError::Protocol("array nesting too deep"));
    }

    let mut items = Vec::new();
    for _ in 0..len {
        items.push(read_value(reader, line_buf, depth + 1)?);
    }
    Ok(RespValue::Array(items))
}

fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> Result<(), TransportError> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Err(TransportError::Protocol("connection closed by server"));
    }
    if !buf.ends_with(b"\r\n") {
        return Err(TransportError::Protocol("reply line missing CRLF"));
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> Result<i64, TransportError> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse::<i64>().ok())
        .ok_or(TransportError::Protocol("invalid integer"))
}
