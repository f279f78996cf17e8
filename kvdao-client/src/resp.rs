//! # RESP2 Framing
//!
//! Purpose: Turn a command's argument list into a RESP2 array of bulk
//! strings, and read one reply frame back off a buffered socket.
//!
//! ## Design Principles
//! 1. **One Absent Shape**: Null bulk strings (`$-1`) and null arrays (`*-1`,
//!    a timed-out BLPOP) both decode to `Bulk(None)`.
//! 2. **Untrusted Lengths**: Declared lengths come from the network, so
//!    preallocation is capped and the data itself decides the final size.
//! 3. **Caller-Owned Buffers**: The header line buffer and the command
//!    buffer belong to the connection and are reused across round trips.

use std::io::{BufRead, Read};

use crate::error::{ClientError, ClientResult};

/// Upper bound on elements reserved up front for an array reply.
const MAX_ARRAY_PREALLOC: usize = 1024;

/// Upper bound on bytes reserved up front for a bulk reply.
const MAX_BULK_PREALLOC: usize = 64 * 1024;

/// One decoded reply frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply, e.g. `+OK`.
    Simple(Vec<u8>),
    /// Error reply; the message without the leading `-`.
    Error(Vec<u8>),
    /// Integer reply (counts, TTLs, 0/1 flags).
    Integer(i64),
    /// Bulk string; `None` is the null reply.
    Bulk(Option<Vec<u8>>),
    /// Multi-bulk reply (MGET, HGETALL, SCAN, ...).
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Returns true for the null reply.
    pub fn is_nil(&self) -> bool {
        matches!(self, RespValue::Bulk(None))
    }

    /// Short type label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::Simple(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::Bulk(Some(_)) => "bulk string",
            RespValue::Bulk(None) => "nil",
            RespValue::Array(_) => "array",
        }
    }
}

/// Appends `args` to `out` as one RESP2 command.
pub fn encode_command(args: &[&[u8]], out: &mut Vec<u8>) {
    write_header(out, b'*', args.len());
    for arg in args {
        write_header(out, b'$', arg.len());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
}

fn write_header(out: &mut Vec<u8>, marker: u8, len: usize) {
    out.push(marker);
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// Reads one complete reply, nested arrays included.
pub fn read_response<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> ClientResult<RespValue> {
    read_header(reader, line)?;
    let (&marker, body) = line.split_first().ok_or(ClientError::Protocol)?;

    match marker {
        b'+' => Ok(RespValue::Simple(body.to_vec())),
        b'-' => Ok(RespValue::Error(body.to_vec())),
        b':' => parse_i64(body).map(RespValue::Integer),
        b'$' => match declared_len(body)? {
            None => Ok(RespValue::Bulk(None)),
            Some(len) => read_bulk(reader, len).map(|data| RespValue::Bulk(Some(data))),
        },
        b'*' => match declared_len(body)? {
            None => Ok(RespValue::Bulk(None)),
            Some(len) => {
                let mut items = Vec::with_capacity(len.min(MAX_ARRAY_PREALLOC));
                for _ in 0..len {
                    items.push(read_response(reader, line)?);
                }
                Ok(RespValue::Array(items))
            }
        },
        _ => Err(ClientError::Protocol),
    }
}

/// `-1` is the null marker; any other negative length is malformed.
fn declared_len(body: &[u8]) -> ClientResult<Option<usize>> {
    match parse_i64(body)? {
        -1 => Ok(None),
        len if len < 0 => Err(ClientError::Protocol),
        len => usize::try_from(len).map(Some).map_err(|_| ClientError::Protocol),
    }
}

fn read_bulk<R: BufRead>(reader: &mut R, len: usize) -> ClientResult<Vec<u8>> {
    let mut data = Vec::with_capacity(len.min(MAX_BULK_PREALLOC));
    let wanted = len as u64 + 2;
    let read = reader.by_ref().take(wanted).read_to_end(&mut data)?;
    if read as u64 != wanted || !data.ends_with(b"\r\n") {
        return Err(ClientError::Protocol);
    }
    data.truncate(len);
    Ok(data)
}

/// Reads a CRLF-terminated header line into `line`, without the CRLF.
fn read_header<R: BufRead>(reader: &mut R, line: &mut Vec<u8>) -> ClientResult<()> {
    line.clear();
    if reader.read_until(b'\n', line)? == 0 {
        return Err(ClientError::Protocol);
    }
    if !line.ends_with(b"\r\n") {
        return Err(ClientError::Protocol);
    }
    line.truncate(line.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> ClientResult<i64> {
    std::str::from_utf8(data)
        .ok()
        .filter(|text| !text.starts_with('+'))
        .and_then(|text| text.parse().ok())
        .ok_or(ClientError::Protocol)
}
