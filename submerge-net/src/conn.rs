use std::io::{Read, Write};

use submerge_base::{CoreError, ErrorKind};

use crate::config::CodecConfig;
use crate::item::{is_whitespace, Item};

fn io_err(e: std::io::Error) -> CoreError {
    CoreError::new(ErrorKind::IoError, e.to_string())
}

/// A well-defined polling point (§5: "before each operation dispatch,
/// before each buffer flush, before each large read"). `Connection` calls
/// this on every flush and every buffer refill; the tree-edit engine
/// calls it once per dispatched operation.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

impl<F: Fn() -> bool> Cancellation for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// No polling; the connection never reports cancellation on its own.
pub struct NeverCancel;
impl Cancellation for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A buffered item-language connection over a byte-stream transport.
/// Mirrors the read/write buffer discipline from §4.1: small reads and
/// writes go through fixed-size buffers; anything larger than the buffer
/// bypasses it; a read always flushes pending output first so a peer
/// waiting on our output can't deadlock against us waiting on theirs.
pub struct Connection<T, C = NeverCancel> {
    pub(crate) transport: T,
    cancel: C,
    read_buf: Box<[u8]>,
    read_pos: usize,
    read_len: usize,
    write_buf: Box<[u8]>,
    write_len: usize,
}

impl<T: Read + Write> Connection<T, NeverCancel> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, CodecConfig::default())
    }

    pub fn with_config(transport: T, config: CodecConfig) -> Self {
        Connection {
            transport,
            cancel: NeverCancel,
            read_buf: vec![0u8; config.buf_size].into_boxed_slice(),
            read_pos: 0,
            read_len: 0,
            write_buf: vec![0u8; config.buf_size].into_boxed_slice(),
            write_len: 0,
        }
    }
}

impl<T: Read + Write, C: Cancellation> Connection<T, C> {
    pub fn with_cancellation(transport: T, config: CodecConfig, cancel: C) -> Self {
        Connection {
            transport,
            cancel,
            read_buf: vec![0u8; config.buf_size].into_boxed_slice(),
            read_pos: 0,
            read_len: 0,
            write_buf: vec![0u8; config.buf_size].into_boxed_slice(),
            write_len: 0,
        }
    }

    /// Unwraps the connection back to its underlying transport, discarding
    /// any buffered-but-unflushed state. Callers that need every written
    /// byte on the wire should `flush()` first.
    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn check_cancelled(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::new(ErrorKind::Cancelled, "operation cancelled"));
        }
        Ok(())
    }

    /// Drain the write buffer to the transport.
    pub fn flush(&mut self) -> Result<(), CoreError> {
        self.check_cancelled()?;
        if self.write_len > 0 {
            self.transport.write_all(&self.write_buf[..self.write_len]).map_err(io_err)?;
            self.write_len = 0;
        }
        Ok(())
    }

    fn write_bytes(&mut self, mut data: &[u8]) -> Result<(), CoreError> {
        if self.write_len > 0 && self.write_len + data.len() > self.write_buf.len() {
            let space = self.write_buf.len() - self.write_len;
            let take = space.min(data.len());
            self.write_buf[self.write_len..self.write_len + take].copy_from_slice(&data[..take]);
            self.write_len += take;
            data = &data[take..];
            self.flush()?;
        }
        if data.len() > self.write_buf.len() {
            self.transport.write_all(data).map_err(io_err)?;
            return Ok(());
        }
        self.write_buf[self.write_len..self.write_len + data.len()].copy_from_slice(data);
        self.write_len += data.len();
        Ok(())
    }

    fn fill_read_buf(&mut self) -> Result<(), CoreError> {
        debug_assert_eq!(self.read_pos, self.read_len);
        self.flush()?;
        let n = self.transport.read(&mut self.read_buf).map_err(io_err)?;
        if n == 0 {
            return Err(CoreError::new(ErrorKind::ConnectionClosed, "connection closed unexpectedly"));
        }
        self.read_pos = 0;
        self.read_len = n;
        Ok(())
    }

    fn getchar(&mut self) -> Result<u8, CoreError> {
        if self.read_pos == self.read_len {
            self.fill_read_buf()?;
        }
        let c = self.read_buf[self.read_pos];
        self.read_pos += 1;
        Ok(c)
    }

    fn getchar_skip_ws(&mut self) -> Result<u8, CoreError> {
        loop {
            let c = self.getchar()?;
            if !is_whitespace(c) {
                return Ok(c);
            }
        }
    }

    fn drain_buffered(&mut self, out: &mut [u8]) -> usize {
        let avail = self.read_len - self.read_pos;
        let take = avail.min(out.len());
        out[..take].copy_from_slice(&self.read_buf[self.read_pos..self.read_pos + take]);
        self.read_pos += take;
        take
    }

    /// Read exactly `len` bytes: drain whatever is buffered first; once
    /// the remainder exceeds buffer capacity read straight off the
    /// transport (flushing first to avoid deadlock); fall back to the
    /// buffered path for the tail. A short read off the transport (`read`
    /// returning `Ok(0)` before `len` bytes are seen) is `CONNECTION_CLOSED`,
    /// never `MALFORMED_DATA` (§8 property 4).
    fn read_exact_buffered(&mut self, len: usize) -> Result<Vec<u8>, CoreError> {
        self.check_cancelled()?;
        let mut out = vec![0u8; len];
        let mut filled = self.drain_buffered(&mut out);

        while len - filled > self.read_buf.len() {
            self.flush()?;
            let n = self.transport.read(&mut out[filled..]).map_err(io_err)?;
            if n == 0 {
                return Err(CoreError::new(ErrorKind::ConnectionClosed, "connection closed unexpectedly"));
            }
            filled += n;
        }
        while filled < len {
            self.fill_read_buf()?;
            filled += self.drain_buffered(&mut out[filled..]);
        }
        Ok(out)
    }

    pub fn write_number(&mut self, n: u64) -> Result<(), CoreError> {
        self.write_bytes(format!("{} ", n).as_bytes())
    }

    pub fn write_string(&mut self, s: &[u8]) -> Result<(), CoreError> {
        self.write_bytes(format!("{}:", s.len()).as_bytes())?;
        self.write_bytes(s)?;
        self.write_bytes(b" ")
    }

    pub fn write_word(&mut self, w: &str) -> Result<(), CoreError> {
        self.write_bytes(format!("{} ", w).as_bytes())
    }

    pub fn start_list(&mut self) -> Result<(), CoreError> {
        self.write_bytes(b"( ")
    }

    pub fn end_list(&mut self) -> Result<(), CoreError> {
        self.write_bytes(b") ")
    }

    pub fn write_item(&mut self, item: &Item) -> Result<(), CoreError> {
        match item {
            Item::Number(n) => self.write_number(*n),
            Item::String(s) => self.write_string(s),
            Item::Word(w) => self.write_word(w),
            Item::List(items) => {
                self.start_list()?;
                for it in items {
                    self.write_item(it)?;
                }
                self.end_list()
            }
        }
    }

    /// Read one item from the stream, starting from its first
    /// non-whitespace byte.
    pub fn read_item(&mut self) -> Result<Item, CoreError> {
        self.check_cancelled()?;
        let c = self.getchar_skip_ws()?;
        self.read_item_from(c)
    }

    fn read_item_from(&mut self, first: u8) -> Result<Item, CoreError> {
        let malformed = |msg: &str| CoreError::new(ErrorKind::MalformedData, msg.to_string());

        if first.is_ascii_digit() {
            let mut val: u64 = (first - b'0') as u64;
            let mut c;
            loop {
                c = self.getchar()?;
                if !c.is_ascii_digit() {
                    break;
                }
                val = val
                    .checked_mul(10)
                    .and_then(|v| v.checked_add((c - b'0') as u64))
                    .ok_or_else(|| malformed("number literal overflow"))?;
            }
            if c == b':' {
                let bytes = self.read_exact_buffered(val as usize)?;
                let term = self.getchar()?;
                if !is_whitespace(term) {
                    return Err(malformed("string not terminated by whitespace"));
                }
                Ok(Item::String(bytes))
            } else if is_whitespace(c) {
                Ok(Item::Number(val))
            } else {
                Err(malformed("number not terminated by whitespace"))
            }
        } else if first.is_ascii_alphabetic() {
            let mut word = vec![first];
            let mut c;
            loop {
                c = self.getchar()?;
                if !(c.is_ascii_alphanumeric() || c == b'-') {
                    break;
                }
                word.push(c);
            }
            if !is_whitespace(c) {
                return Err(malformed("word not terminated by whitespace"));
            }
            let word = String::from_utf8(word).map_err(|_| malformed("word is not ASCII"))?;
            Ok(Item::Word(word))
        } else if first == b'(' {
            let mut items = Vec::new();
            loop {
                let c2 = self.getchar_skip_ws()?;
                if c2 == b')' {
                    break;
                }
                items.push(self.read_item_from(c2)?);
            }
            let term = self.getchar()?;
            if !is_whitespace(term) {
                return Err(malformed("list not terminated by whitespace"));
            }
            Ok(Item::List(items))
        } else {
            Err(malformed("unrecognized item leading byte"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn conn_over(bytes: &[u8]) -> Connection<Cursor<Vec<u8>>> {
        Connection::new(Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn s1_number_string_list_round_trip() {
        let tuple = Item::List(vec![
            Item::Number(42),
            Item::String(b"hi)\n".to_vec()),
            Item::List(vec![Item::String(b"a".to_vec()), Item::Number(7)]),
        ]);

        let mut conn = Connection::new(Cursor::new(Vec::new()));
        conn.write_item(&tuple).unwrap();
        conn.flush().unwrap();

        let wire = conn.transport.into_inner();
        assert_eq!(wire, b"( 42 4:hi)\n ( 1:a 7 ) ) ".to_vec());

        let mut reader = conn_over(&wire);
        let decoded = reader.read_item().unwrap();
        assert_eq!(decoded, tuple);
    }

    #[test]
    fn string_containing_parens_and_whitespace_round_trips() {
        let s = b"() a\nb".to_vec();
        let mut conn = Connection::new(Cursor::new(Vec::new()));
        conn.write_item(&Item::String(s.clone())).unwrap();
        conn.flush().unwrap();
        let wire = conn.transport.into_inner();
        let mut reader = conn_over(&wire);
        assert_eq!(reader.read_item().unwrap(), Item::String(s));
    }

    #[test]
    fn large_number_round_trips_without_loss() {
        let n: u64 = 1u64 << 63;
        let mut conn = Connection::new(Cursor::new(Vec::new()));
        conn.write_item(&Item::Number(n)).unwrap();
        conn.flush().unwrap();
        let wire = conn.transport.into_inner();
        let mut reader = conn_over(&wire);
        assert_eq!(reader.read_item().unwrap(), Item::Number(n));
    }

    #[test]
    fn truncated_string_is_connection_closed_not_malformed() {
        // Declares a 10-byte string but only 3 bytes follow before EOF.
        let mut reader = conn_over(b"10:abc");
        let err = reader.read_item().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionClosed);
    }

    #[test]
    fn malformed_word_terminator_is_rejected() {
        let mut reader = conn_over(b"wo#rd ");
        let err = reader.read_item().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn read_larger_than_buffer_bypasses_it() {
        let config = CodecConfig { buf_size: 8 };
        let payload = vec![b'x'; 64];
        let mut writer = Connection::with_config(Cursor::new(Vec::new()), config);
        writer.write_item(&Item::String(payload.clone())).unwrap();
        writer.flush().unwrap();
        let wire = writer.transport.into_inner();

        let mut reader = Connection::with_config(Cursor::new(wire), config);
        assert_eq!(reader.read_item().unwrap(), Item::String(payload));
    }
}
