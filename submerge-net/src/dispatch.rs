use std::io::{Read, Write};

use submerge_base::{CoreError, ErrorKind, WireFrame};

use crate::conn::{Cancellation, Connection};
use crate::item::Item;
use crate::tuple::TupleReader;

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::new(ErrorKind::MalformedData, msg.into())
}

fn frame_to_item(frame: &WireFrame) -> Item {
    Item::List(vec![
        Item::Number(frame.code),
        Item::String(frame.message.clone().into_bytes()),
        Item::String(frame.file.clone().into_bytes()),
        Item::Number(frame.line),
    ])
}

fn item_to_frame(item: &Item) -> Result<WireFrame, CoreError> {
    let t = TupleReader::new(item)?;
    Ok(WireFrame {
        code: t.n(0)?,
        message: String::from_utf8_lossy(t.s(1)?).into_owned(),
        file: String::from_utf8_lossy(t.s(2)?).into_owned(),
        line: t.n(3)?,
    })
}

/// One entry in a command dispatch table (§4.1 "Command dispatch"):
/// a name, a handler over caller-supplied context and the raw argument
/// tuple, and whether a successful reply from this command ends the
/// loop.
pub struct CmdEntry<Ctx> {
    pub name: &'static str,
    pub terminal: bool,
    pub handler: fn(&mut Ctx, &[Item]) -> Result<Item, CoreError>,
}

/// Writes a `(word payload)` command envelope and flushes it.
pub fn write_cmd<T: Read + Write, C: Cancellation>(
    conn: &mut Connection<T, C>,
    name: &str,
    params: Item,
) -> Result<(), CoreError> {
    conn.write_item(&Item::List(vec![Item::Word(name.to_string()), params]))?;
    conn.flush()
}

/// Writes a `(success payload)` response and flushes it.
pub fn write_cmd_response<T: Read + Write, C: Cancellation>(
    conn: &mut Connection<T, C>,
    params: &Item,
) -> Result<(), CoreError> {
    conn.write_item(&Item::List(vec![Item::Word("success".to_string()), params.clone()]))?;
    conn.flush()
}

/// Writes a `(failure (frame...))` response, outermost cause first, and
/// flushes it (§4.1, scenario S2).
pub fn write_cmd_failure<T: Read + Write, C: Cancellation>(
    conn: &mut Connection<T, C>,
    err: &CoreError,
) -> Result<(), CoreError> {
    let frames: Vec<Item> = err.to_wire_frames().iter().map(frame_to_item).collect();
    conn.write_item(&Item::List(vec![Item::Word("failure".to_string()), Item::List(frames)]))?;
    conn.flush()
}

/// Reads a `(success payload)` / `(failure (frame...))` response. On
/// failure, reconstructs the causal chain and returns it as `Err`.
pub fn read_cmd_response<T: Read + Write, C: Cancellation>(conn: &mut Connection<T, C>) -> Result<Item, CoreError> {
    let item = conn.read_item()?;
    let t = TupleReader::new(&item)?;
    let status = t.w(0)?;
    match status {
        "success" => Ok(t.raw(1)?.clone()),
        "failure" => {
            let frame_items = t.list(1)?;
            let mut frames = Vec::with_capacity(frame_items.len());
            for fi in frame_items {
                frames.push(item_to_frame(fi)?);
            }
            Err(CoreError::from_wire_frames(&frames).unwrap_or_else(|e| e))
        }
        other => Err(malformed(format!("unrecognized response status word {other:?}"))),
    }
}

/// Runs the command loop (§4.1): read one command, dispatch it against
/// `table`, write back success or failure, and repeat. An `UNKNOWN_CMD`
/// or a handler error wrapped in `CMD_ERR` is reported to the peer and
/// the loop continues; any other error returned by a handler poisons the
/// connection immediately (no failure response is written for it — the
/// caller is expected to close the connection). The loop exits cleanly
/// when a `terminal` command is dispatched, whether it succeeds or its
/// error was `CMD_ERR`-recoverable.
pub fn handle_commands<T: Read + Write, C: Cancellation, Ctx>(
    conn: &mut Connection<T, C>,
    table: &[CmdEntry<Ctx>],
    ctx: &mut Ctx,
) -> Result<(), CoreError> {
    loop {
        conn.check_cancelled()?;
        let item = conn.read_item()?;
        let envelope = TupleReader::new(&item)?;
        if envelope.len() != 2 {
            return Err(malformed("command envelope must be (word payload-list)"));
        }
        let cmdname = envelope.w(0)?;
        let params = envelope.list(1)?;

        let Some(entry) = table.iter().find(|e| e.name == cmdname) else {
            let e = CoreError::new(ErrorKind::UnknownCmd, format!("Unknown {cmdname}"));
            write_cmd_failure(conn, &e)?;
            continue;
        };

        match (entry.handler)(ctx, params) {
            Ok(result) => {
                write_cmd_response(conn, &result)?;
                if entry.terminal {
                    return Ok(());
                }
            }
            Err(e) if e.is_kind(ErrorKind::CmdErr) => {
                let reported = e.into_child().unwrap_or_else(|| CoreError::new(ErrorKind::CmdErr, "command failed with no recorded cause"));
                write_cmd_failure(conn, &reported)?;
                if entry.terminal {
                    return Ok(());
                }
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn s2_error_chain_round_trips_through_wire() {
        let inner = CoreError::new(ErrorKind::PathNotFound, "A");
        let outer = CoreError::wrap(ErrorKind::Conflict, "B", inner);

        let mut conn = Connection::new(Cursor::new(Vec::new()));
        write_cmd_failure(&mut conn, &outer).unwrap();
        let wire = conn.transport.into_inner();

        let mut reader = Connection::new(Cursor::new(wire));
        let rebuilt = read_cmd_response(&mut reader).unwrap_err();
        assert_eq!(rebuilt.kind(), ErrorKind::Conflict);
        assert_eq!(rebuilt.message(), "B");
        let child = rebuilt.into_child().unwrap();
        assert_eq!(child.kind(), ErrorKind::PathNotFound);
        assert_eq!(child.message(), "A");
    }

    fn mk_handler(_ctx: &mut (), _params: &[Item]) -> Result<Item, CoreError> {
        Ok(Item::List(vec![]))
    }

    #[test]
    fn s6_unknown_command_is_recovered_and_loop_continues() {
        let mut input = Vec::new();
        input.extend_from_slice(b"( bogus ( ) ) ");
        input.extend_from_slice(b"( mk ( ) ) ");

        let mut conn = Connection::new(Cursor::new(input));
        let table = [CmdEntry { name: "mk", terminal: true, handler: mk_handler }];
        handle_commands(&mut conn, &table, &mut ()).unwrap();

        let wire = conn.transport.into_inner();
        let mut reader = Connection::new(Cursor::new(wire));

        let first = read_cmd_response(&mut reader).unwrap_err();
        assert_eq!(first.kind(), ErrorKind::UnknownCmd);

        let second = read_cmd_response(&mut reader).unwrap();
        assert_eq!(second, Item::List(vec![]));
    }

    fn failing_handler(_ctx: &mut (), _params: &[Item]) -> Result<Item, CoreError> {
        let cause = CoreError::new(ErrorKind::PreconditionFailed, "precondition not met");
        Err(CoreError::wrap(ErrorKind::CmdErr, "command failed", cause))
    }

    #[test]
    fn cmd_err_is_unwrapped_and_loop_continues() {
        let mut input = Vec::new();
        input.extend_from_slice(b"( put ( ) ) ");
        input.extend_from_slice(b"( mk ( ) ) ");

        let mut conn = Connection::new(Cursor::new(input));
        let table = [
            CmdEntry { name: "put", terminal: false, handler: failing_handler },
            CmdEntry { name: "mk", terminal: true, handler: mk_handler },
        ];
        handle_commands(&mut conn, &table, &mut ()).unwrap();

        let wire = conn.transport.into_inner();
        let mut reader = Connection::new(Cursor::new(wire));
        let first = read_cmd_response(&mut reader).unwrap_err();
        assert_eq!(first.kind(), ErrorKind::PreconditionFailed);
        let second = read_cmd_response(&mut reader).unwrap();
        assert_eq!(second, Item::List(vec![]));
    }
}
