use std::io::{Read, Write};

use submerge_base::{CoreError, ErrorKind};

use crate::conn::{Cancellation, Connection};
use crate::item::Item;

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::new(ErrorKind::MalformedData, msg.into())
}

fn io_err(e: std::io::Error) -> CoreError {
    CoreError::new(ErrorKind::IoError, e.to_string())
}

const CHUNK_SIZE: usize = 4096;

/// Frames a content stream of unknown length as the dedicated chunked
/// sublist from §4.3: "streams without a known length are framed by
/// surrounding the content with a dedicated chunked sublist (each chunk
/// a length-prefixed string, terminator a zero-length string)". Written
/// as an ordinary nested list, so a peer that never heard of "chunked
/// content" can still decode it with the plain item grammar.
pub fn write_chunked<T: Read + Write, C: Cancellation>(
    conn: &mut Connection<T, C>,
    data: &mut dyn Read,
) -> Result<(), CoreError> {
    conn.start_list()?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = data.read(&mut buf).map_err(io_err)?;
        conn.write_string(&buf[..n])?;
        if n == 0 {
            break;
        }
    }
    conn.end_list()
}

/// Reconstructs the bytes framed by [`write_chunked`] from an already
/// decoded list item. The terminating zero-length string must be the
/// last element; anything after it, or a list with no terminator at
/// all, is malformed.
pub fn read_chunked_item(item: &Item) -> Result<Vec<u8>, CoreError> {
    let Item::List(items) = item else {
        return Err(malformed("chunked content is not a list"));
    };
    let mut out = Vec::new();
    let mut terminated = false;
    for (i, it) in items.iter().enumerate() {
        if terminated {
            return Err(malformed("chunked content has data after the terminator"));
        }
        let bytes = it.as_string().ok_or_else(|| malformed(format!("chunk {i} is not a string")))?;
        if bytes.is_empty() {
            terminated = true;
        } else {
            out.extend_from_slice(bytes);
        }
    }
    if !terminated {
        return Err(malformed("chunked content is missing its zero-length terminator"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn chunked_round_trip_across_chunk_boundary() {
        let payload = vec![b'z'; CHUNK_SIZE * 2 + 17];
        let mut conn = Connection::new(Cursor::new(Vec::new()));
        write_chunked(&mut conn, &mut Cursor::new(payload.clone())).unwrap();
        conn.flush().unwrap();
        let wire = conn.transport.into_inner();

        let mut reader = Connection::new(Cursor::new(wire));
        let item = reader.read_item().unwrap();
        assert_eq!(read_chunked_item(&item).unwrap(), payload);
    }

    #[test]
    fn empty_stream_is_just_the_terminator() {
        let mut conn = Connection::new(Cursor::new(Vec::new()));
        write_chunked(&mut conn, &mut Cursor::new(Vec::new())).unwrap();
        conn.flush().unwrap();
        let wire = conn.transport.into_inner();

        let mut reader = Connection::new(Cursor::new(wire));
        let item = reader.read_item().unwrap();
        assert_eq!(item, Item::List(vec![Item::String(Vec::new())]));
        assert_eq!(read_chunked_item(&item).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn missing_terminator_is_malformed() {
        let item = Item::List(vec![Item::String(b"abc".to_vec())]);
        assert!(read_chunked_item(&item).is_err());
    }

    #[test]
    fn data_after_terminator_is_malformed() {
        let item = Item::List(vec![Item::String(Vec::new()), Item::String(b"abc".to_vec())]);
        assert!(read_chunked_item(&item).is_err());
    }
}
