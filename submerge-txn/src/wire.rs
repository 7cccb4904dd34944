//! Bridges [`EditCommand`] to the wire codec (§2 "Control flow": "the
//! driver side encodes each call through the codec; the remote side
//! decodes and reinvokes the equivalent editor locally"). Command names
//! and argument order are grounded in `svn_ra_svn`'s tree-edit command
//! set and `svn_editor3_cb_funcs_t`'s callback argument lists
//! (`examples/original_source`), re-expressed over this crate's own
//! [`TupleReader`]/content model rather than the original's C structs.

use std::io::{Read, Write};

use submerge_base::{CoreError, ErrorKind};
use submerge_lang::{
    ContentStream, Name, Nbid, NodeContent, NodeKind, NodePayload, PegPath, PropMap, Revision,
    Sha1Digest, TxnPath,
};
use submerge_net::{read_chunked_item, read_cmd_response, write_chunked, Cancellation, CmdEntry, Connection, Item, NeverCancel, TupleReader};

use crate::command::{EditCommand, StyleAOp, StyleBOp};
use crate::{Editor, RepositoryBackend};

pub const CMD_MK: &str = "mk";
pub const CMD_CP: &str = "cp";
pub const CMD_MV: &str = "mv";
pub const CMD_RES: &str = "res";
pub const CMD_RM: &str = "rm";
pub const CMD_PUT: &str = "put";
pub const CMD_ADD: &str = "add";
pub const CMD_COPY_ONE: &str = "copy-one";
pub const CMD_COPY_TREE: &str = "copy-tree";
pub const CMD_DELETE: &str = "delete";
pub const CMD_ALTER: &str = "alter";
pub const CMD_COMPLETE: &str = "complete";
pub const CMD_ABORT: &str = "abort";

fn malformed(msg: impl Into<String>) -> CoreError {
    CoreError::new(ErrorKind::MalformedData, msg.into())
}

fn kind_to_word(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Directory => "dir",
        NodeKind::File => "file",
        NodeKind::Symlink => "symlink",
        NodeKind::Unknown => "unknown",
    }
}

fn word_to_kind(word: &str) -> Result<NodeKind, CoreError> {
    Ok(match word {
        "dir" => NodeKind::Directory,
        "file" => NodeKind::File,
        "symlink" => NodeKind::Symlink,
        "unknown" => NodeKind::Unknown,
        other => return Err(malformed(format!("unrecognized node kind word {other:?}"))),
    })
}

fn nbid_to_item(nbid: &Nbid) -> Item {
    Item::String(nbid.as_str().as_bytes().to_vec())
}

fn read_nbid(t: &TupleReader, i: usize) -> Result<Nbid, CoreError> {
    Ok(Nbid::from(String::from_utf8_lossy(t.s(i)?).into_owned()))
}

/// `(relpath [rev])`: a peg-path as a plain string plus the `r`-in-`[...]`
/// sentinel-omission shape already provided by [`TupleReader::optional_rev`]
/// (§4.1 format language).
fn peg_to_item(peg: &PegPath) -> Item {
    let rev = match peg.rev.to_wire() {
        Some(n) => vec![Item::Number(n)],
        None => vec![],
    };
    Item::List(vec![Item::String(peg.relpath.as_bytes().to_vec()), Item::List(rev)])
}

fn read_peg(item: &Item) -> Result<PegPath, CoreError> {
    let t = TupleReader::new(item)?;
    let relpath = t.s(0)?.to_vec();
    let rev = t.optional_rev(1)?;
    Ok(PegPath::new(rev, relpath))
}

/// `(anchor created-relpath)` (§3 "Transaction-path").
fn txn_path_to_item(tp: &TxnPath) -> Item {
    Item::List(vec![peg_to_item(&tp.anchor), Item::String(tp.created_relpath.as_bytes().to_vec())])
}

fn read_txn_path(item: &Item) -> Result<TxnPath, CoreError> {
    let t = TupleReader::new(item)?;
    let anchor = read_peg(t.raw(0)?)?;
    let suffix = t.s(1)?.to_vec();
    Ok(TxnPath::new(anchor, suffix))
}

/// `(kind [ref] ((propname propval)...) payload)` where `payload` is
/// kind-specific: nothing for dir/unknown, the symlink target string
/// for symlinks, and `([checksum] [inline-bytes])` for files. `[...]`
/// here means "list of 0 or 1 elements", the same omit-on-absence shape
/// used throughout rather than a sentinel value, since these fields
/// nest lists rather than scalars (outside what `OptionalTupleWriter`
/// models). `inline-bytes`, when present, is itself the chunked sublist
/// from §4.3 — streamed through directly rather than buffered into an
/// `Item::String` up front, since the source stream's length isn't
/// known to the caller.
fn write_content<T: Read + Write, C: Cancellation>(conn: &mut Connection<T, C>, content: NodeContent) -> Result<(), CoreError> {
    let NodeContent { reference, props, payload } = content;
    let kind = payload.kind();

    conn.start_list()?;
    conn.write_word(kind_to_word(kind))?;

    conn.start_list()?;
    if let Some(r) = &reference {
        conn.write_item(&peg_to_item(r))?;
    }
    conn.end_list()?;

    conn.start_list()?;
    for (name, value) in &props {
        conn.start_list()?;
        conn.write_string(name)?;
        conn.write_string(value)?;
        conn.end_list()?;
    }
    conn.end_list()?;

    match payload {
        NodePayload::Directory | NodePayload::Unknown => {}
        NodePayload::Symlink { target } => {
            conn.write_string(&target)?;
        }
        NodePayload::File { checksum, stream } => {
            conn.start_list()?;
            if let Some(c) = checksum {
                conn.write_string(&c.0)?;
            }
            conn.end_list()?;

            conn.start_list()?;
            if let Some(mut s) = stream {
                write_chunked(conn, &mut *s)?;
            }
            conn.end_list()?;
        }
    }
    conn.end_list()
}

fn read_content(item: &Item) -> Result<NodeContent, CoreError> {
    let t = TupleReader::new(item)?;
    let kind = word_to_kind(t.w(0)?)?;

    let ref_list = t.list(1)?;
    let reference = match ref_list.first() {
        Some(it) => Some(read_peg(it)?),
        None => None,
    };

    let mut props = PropMap::new();
    for pair in t.list(2)? {
        let pt = TupleReader::new(pair)?;
        props.insert(pt.s(0)?.to_vec(), pt.s(1)?.to_vec());
    }

    let payload = match kind {
        NodeKind::Directory => NodePayload::Directory,
        NodeKind::Unknown => NodePayload::Unknown,
        NodeKind::Symlink => NodePayload::Symlink { target: t.s(3)?.to_vec() },
        NodeKind::File => {
            let checksum_list = t.list(3)?;
            let checksum = match checksum_list.first() {
                Some(it) => {
                    let bytes = it.as_string().ok_or_else(|| malformed("file checksum is not a string"))?;
                    let arr: [u8; 20] = bytes.try_into().map_err(|_| malformed("file checksum is not 20 bytes"))?;
                    Some(Sha1Digest(arr))
                }
                None => None,
            };
            let stream_list = t.list(4)?;
            let stream: Option<Box<dyn ContentStream>> = match stream_list.first() {
                Some(it) => Some(Box::new(std::io::Cursor::new(read_chunked_item(it)?))),
                None => None,
            };
            NodePayload::File { checksum, stream }
        }
    };

    Ok(NodeContent { reference, props, payload })
}

/// Writes one `(name (args...))` command envelope for `cmd`, streaming
/// any file content inline, and flushes. Mirrors [`submerge_net::write_cmd`]
/// but can't reuse it verbatim: a pre-built `Item` can't hold a live
/// `ContentStream`, so content fields are written directly against the
/// connection as part of building the envelope.
pub fn write_command<T: Read + Write, C: Cancellation>(conn: &mut Connection<T, C>, cmd: EditCommand) -> Result<(), CoreError> {
    conn.start_list()?;
    match cmd {
        EditCommand::StyleA(StyleAOp::Mk { kind, parent, name, content }) => {
            conn.write_word(CMD_MK)?;
            conn.start_list()?;
            conn.write_word(kind_to_word(kind))?;
            conn.write_item(&txn_path_to_item(&parent))?;
            conn.write_string(name.as_bytes())?;
            write_content(conn, content)?;
            conn.end_list()?;
        }
        EditCommand::StyleA(StyleAOp::Cp { from, parent, name }) => {
            conn.write_word(CMD_CP)?;
            conn.start_list()?;
            conn.write_item(&peg_to_item(&from))?;
            conn.write_item(&txn_path_to_item(&parent))?;
            conn.write_string(name.as_bytes())?;
            conn.end_list()?;
        }
        EditCommand::StyleA(StyleAOp::Mv { from, new_parent, new_name }) => {
            conn.write_word(CMD_MV)?;
            conn.start_list()?;
            conn.write_item(&peg_to_item(&from))?;
            conn.write_item(&txn_path_to_item(&new_parent))?;
            conn.write_string(new_name.as_bytes())?;
            conn.end_list()?;
        }
        EditCommand::StyleA(StyleAOp::Res { from, parent, name }) => {
            conn.write_word(CMD_RES)?;
            conn.start_list()?;
            conn.write_item(&peg_to_item(&from))?;
            conn.write_item(&txn_path_to_item(&parent))?;
            conn.write_string(name.as_bytes())?;
            conn.end_list()?;
        }
        EditCommand::StyleA(StyleAOp::Rm { target }) => {
            conn.write_word(CMD_RM)?;
            conn.start_list()?;
            conn.write_item(&txn_path_to_item(&target))?;
            conn.end_list()?;
        }
        EditCommand::StyleA(StyleAOp::Put { target, content }) => {
            conn.write_word(CMD_PUT)?;
            conn.start_list()?;
            conn.write_item(&txn_path_to_item(&target))?;
            write_content(conn, content)?;
            conn.end_list()?;
        }
        EditCommand::StyleB(StyleBOp::Add { new_nbid, kind, parent_nbid, name, content }) => {
            conn.write_word(CMD_ADD)?;
            conn.start_list()?;
            conn.write_item(&nbid_to_item(&new_nbid))?;
            conn.write_word(kind_to_word(kind))?;
            conn.write_item(&nbid_to_item(&parent_nbid))?;
            conn.write_string(name.as_bytes())?;
            write_content(conn, content)?;
            conn.end_list()?;
        }
        EditCommand::StyleB(StyleBOp::CopyOne { new_nbid, src_rev, src_nbid, parent_nbid, name, content }) => {
            conn.write_word(CMD_COPY_ONE)?;
            conn.start_list()?;
            conn.write_item(&nbid_to_item(&new_nbid))?;
            conn.start_list()?;
            if let Some(n) = src_rev.to_wire() {
                conn.write_number(n)?;
            }
            conn.end_list()?;
            conn.write_item(&nbid_to_item(&src_nbid))?;
            conn.write_item(&nbid_to_item(&parent_nbid))?;
            conn.write_string(name.as_bytes())?;
            write_content(conn, content)?;
            conn.end_list()?;
        }
        EditCommand::StyleB(StyleBOp::CopyTree { src_rev, src_nbid, parent_nbid, name }) => {
            conn.write_word(CMD_COPY_TREE)?;
            conn.start_list()?;
            conn.start_list()?;
            if let Some(n) = src_rev.to_wire() {
                conn.write_number(n)?;
            }
            conn.end_list()?;
            conn.write_item(&nbid_to_item(&src_nbid))?;
            conn.write_item(&nbid_to_item(&parent_nbid))?;
            conn.write_string(name.as_bytes())?;
            conn.end_list()?;
        }
        EditCommand::StyleB(StyleBOp::Delete { since_rev, nbid }) => {
            conn.write_word(CMD_DELETE)?;
            conn.start_list()?;
            conn.start_list()?;
            if let Some(n) = since_rev.to_wire() {
                conn.write_number(n)?;
            }
            conn.end_list()?;
            conn.write_item(&nbid_to_item(&nbid))?;
            conn.end_list()?;
        }
        EditCommand::StyleB(StyleBOp::Alter { since_rev, nbid, new_parent_nbid, new_name, new_content }) => {
            conn.write_word(CMD_ALTER)?;
            conn.start_list()?;
            conn.start_list()?;
            if let Some(n) = since_rev.to_wire() {
                conn.write_number(n)?;
            }
            conn.end_list()?;
            conn.write_item(&nbid_to_item(&nbid))?;
            conn.write_item(&nbid_to_item(&new_parent_nbid))?;
            conn.write_string(new_name.as_bytes())?;
            write_content(conn, new_content)?;
            conn.end_list()?;
        }
        EditCommand::Complete => {
            conn.write_word(CMD_COMPLETE)?;
            conn.start_list()?;
            conn.end_list()?;
        }
        EditCommand::Abort => {
            conn.write_word(CMD_ABORT)?;
            conn.start_list()?;
            conn.end_list()?;
        }
    }
    conn.end_list()?;
    conn.flush()
}

/// Reconstructs an [`EditCommand`] from an already-decoded command name
/// and argument tuple (the server side of [`write_command`]).
pub fn decode_command(name: &str, params: &[Item]) -> Result<EditCommand, CoreError> {
    let t = TupleReader::from_slice(params);
    Ok(match name {
        CMD_MK => {
            let kind = word_to_kind(t.w(0)?)?;
            let parent = read_txn_path(t.raw(1)?)?;
            let node_name = Name::from(t.s(2)?.to_vec());
            let content = read_content(t.raw(3)?)?;
            EditCommand::StyleA(StyleAOp::Mk { kind, parent, name: node_name, content })
        }
        CMD_CP => {
            let from = read_peg(t.raw(0)?)?;
            let parent = read_txn_path(t.raw(1)?)?;
            let name = Name::from(t.s(2)?.to_vec());
            EditCommand::StyleA(StyleAOp::Cp { from, parent, name })
        }
        CMD_MV => {
            let from = read_peg(t.raw(0)?)?;
            let new_parent = read_txn_path(t.raw(1)?)?;
            let new_name = Name::from(t.s(2)?.to_vec());
            EditCommand::StyleA(StyleAOp::Mv { from, new_parent, new_name })
        }
        CMD_RES => {
            let from = read_peg(t.raw(0)?)?;
            let parent = read_txn_path(t.raw(1)?)?;
            let name = Name::from(t.s(2)?.to_vec());
            EditCommand::StyleA(StyleAOp::Res { from, parent, name })
        }
        CMD_RM => {
            let target = read_txn_path(t.raw(0)?)?;
            EditCommand::StyleA(StyleAOp::Rm { target })
        }
        CMD_PUT => {
            let target = read_txn_path(t.raw(0)?)?;
            let content = read_content(t.raw(1)?)?;
            EditCommand::StyleA(StyleAOp::Put { target, content })
        }
        CMD_ADD => {
            let new_nbid = read_nbid(&t, 0)?;
            let kind = word_to_kind(t.w(1)?)?;
            let parent_nbid = read_nbid(&t, 2)?;
            let name = Name::from(t.s(3)?.to_vec());
            let content = read_content(t.raw(4)?)?;
            EditCommand::StyleB(StyleBOp::Add { new_nbid, kind, parent_nbid, name, content })
        }
        CMD_COPY_ONE => {
            let new_nbid = read_nbid(&t, 0)?;
            let src_rev = t.optional_rev(1)?;
            let src_nbid = read_nbid(&t, 2)?;
            let parent_nbid = read_nbid(&t, 3)?;
            let name = Name::from(t.s(4)?.to_vec());
            let content = read_content(t.raw(5)?)?;
            EditCommand::StyleB(StyleBOp::CopyOne { new_nbid, src_rev, src_nbid, parent_nbid, name, content })
        }
        CMD_COPY_TREE => {
            let src_rev = t.optional_rev(0)?;
            let src_nbid = read_nbid(&t, 1)?;
            let parent_nbid = read_nbid(&t, 2)?;
            let name = Name::from(t.s(3)?.to_vec());
            EditCommand::StyleB(StyleBOp::CopyTree { src_rev, src_nbid, parent_nbid, name })
        }
        CMD_DELETE => {
            let since_rev = t.optional_rev(0)?;
            let nbid = read_nbid(&t, 1)?;
            EditCommand::StyleB(StyleBOp::Delete { since_rev, nbid })
        }
        CMD_ALTER => {
            let since_rev = t.optional_rev(0)?;
            let nbid = read_nbid(&t, 1)?;
            let new_parent_nbid = read_nbid(&t, 2)?;
            let new_name = Name::from(t.s(3)?.to_vec());
            let new_content = read_content(t.raw(4)?)?;
            EditCommand::StyleB(StyleBOp::Alter { since_rev, nbid, new_parent_nbid, new_name, new_content })
        }
        CMD_COMPLETE => EditCommand::Complete,
        CMD_ABORT => EditCommand::Abort,
        other => return Err(CoreError::new(ErrorKind::UnknownCmd, format!("Unknown {other}"))),
    })
}

/// Client-side [`crate::TreeEditor`] that forwards every call across a
/// connection instead of applying it locally — the "driver side encodes
/// each call through the codec" half of §2's control flow.
pub struct WireEditorClient<T, C = NeverCancel> {
    conn: Connection<T, C>,
}

impl<T: Read + Write, C: Cancellation> WireEditorClient<T, C> {
    pub fn new(conn: Connection<T, C>) -> Self {
        WireEditorClient { conn }
    }

    pub fn into_inner(self) -> Connection<T, C> {
        self.conn
    }

    fn call(&mut self, cmd: EditCommand) -> Result<Item, CoreError> {
        write_command(&mut self.conn, cmd)?;
        read_cmd_response(&mut self.conn)
    }
}

impl<T: Read + Write, C: Cancellation> crate::TreeEditor for WireEditorClient<T, C> {
    fn mk(&mut self, kind: NodeKind, parent: TxnPath, name: Name, content: NodeContent) -> Result<(), CoreError> {
        self.call(EditCommand::StyleA(StyleAOp::Mk { kind, parent, name, content })).map(|_| ())
    }

    fn cp(&mut self, from: PegPath, parent: TxnPath, name: Name) -> Result<(), CoreError> {
        self.call(EditCommand::StyleA(StyleAOp::Cp { from, parent, name })).map(|_| ())
    }

    fn mv(&mut self, from: PegPath, new_parent: TxnPath, new_name: Name) -> Result<(), CoreError> {
        self.call(EditCommand::StyleA(StyleAOp::Mv { from, new_parent, new_name })).map(|_| ())
    }

    fn res(&mut self, from: PegPath, parent: TxnPath, name: Name) -> Result<(), CoreError> {
        self.call(EditCommand::StyleA(StyleAOp::Res { from, parent, name })).map(|_| ())
    }

    fn rm(&mut self, target: TxnPath) -> Result<(), CoreError> {
        self.call(EditCommand::StyleA(StyleAOp::Rm { target })).map(|_| ())
    }

    fn put(&mut self, target: TxnPath, content: NodeContent) -> Result<(), CoreError> {
        self.call(EditCommand::StyleA(StyleAOp::Put { target, content })).map(|_| ())
    }

    fn add(&mut self, new_nbid: Nbid, kind: NodeKind, parent_nbid: Nbid, name: Name, content: NodeContent) -> Result<(), CoreError> {
        self.call(EditCommand::StyleB(StyleBOp::Add { new_nbid, kind, parent_nbid, name, content })).map(|_| ())
    }

    fn copy_one(
        &mut self,
        new_nbid: Nbid,
        src_rev: Revision,
        src_nbid: Nbid,
        parent_nbid: Nbid,
        name: Name,
        content: NodeContent,
    ) -> Result<(), CoreError> {
        self.call(EditCommand::StyleB(StyleBOp::CopyOne { new_nbid, src_rev, src_nbid, parent_nbid, name, content })).map(|_| ())
    }

    fn copy_tree(&mut self, src_rev: Revision, src_nbid: Nbid, parent_nbid: Nbid, name: Name) -> Result<(), CoreError> {
        self.call(EditCommand::StyleB(StyleBOp::CopyTree { src_rev, src_nbid, parent_nbid, name })).map(|_| ())
    }

    fn delete(&mut self, since_rev: Revision, nbid: Nbid) -> Result<(), CoreError> {
        self.call(EditCommand::StyleB(StyleBOp::Delete { since_rev, nbid })).map(|_| ())
    }

    fn alter(
        &mut self,
        since_rev: Revision,
        nbid: Nbid,
        new_parent_nbid: Nbid,
        new_name: Name,
        new_content: NodeContent,
    ) -> Result<(), CoreError> {
        self.call(EditCommand::StyleB(StyleBOp::Alter { since_rev, nbid, new_parent_nbid, new_name, new_content })).map(|_| ())
    }

    fn complete(&mut self) -> Result<u64, CoreError> {
        let item = self.call(EditCommand::Complete)?;
        TupleReader::from_slice(item.as_list().unwrap_or(&[])).n(0)
    }

    fn abort(&mut self) -> Result<(), CoreError> {
        self.call(EditCommand::Abort).map(|_| ())
    }
}

fn handle<B: RepositoryBackend, C: Cancellation>(name: &str, ctx: &mut Editor<B, C>, params: &[Item]) -> Result<Item, CoreError> {
    let cmd = decode_command(name, params)?;
    let terminal_complete = matches!(cmd, EditCommand::Complete);
    if terminal_complete {
        let rev = ctx.complete()?;
        return Ok(Item::List(vec![Item::Number(rev)]));
    }
    ctx.apply(cmd)?;
    Ok(Item::List(vec![]))
}

macro_rules! server_handler {
    ($fn_name:ident, $cmd:expr) => {
        fn $fn_name<B: RepositoryBackend, C: Cancellation>(ctx: &mut Editor<B, C>, params: &[Item]) -> Result<Item, CoreError> {
            handle($cmd, ctx, params)
        }
    };
}

server_handler!(handle_mk, CMD_MK);
server_handler!(handle_cp, CMD_CP);
server_handler!(handle_mv, CMD_MV);
server_handler!(handle_res, CMD_RES);
server_handler!(handle_rm, CMD_RM);
server_handler!(handle_put, CMD_PUT);
server_handler!(handle_add, CMD_ADD);
server_handler!(handle_copy_one, CMD_COPY_ONE);
server_handler!(handle_copy_tree, CMD_COPY_TREE);
server_handler!(handle_delete, CMD_DELETE);
server_handler!(handle_alter, CMD_ALTER);
server_handler!(handle_complete, CMD_COMPLETE);
server_handler!(handle_abort, CMD_ABORT);

/// Builds the server-side dispatch table for [`submerge_net::handle_commands`]:
/// one entry per wire command name, decoding into an [`EditCommand`] and
/// applying it to a local [`Editor`]. `complete` and `abort` are
/// `terminal` (§4.1: a successful terminal command ends the session).
pub fn dispatch_table<B: RepositoryBackend, C: Cancellation>() -> Vec<CmdEntry<Editor<B, C>>> {
    vec![
        CmdEntry { name: CMD_MK, terminal: false, handler: handle_mk::<B, C> },
        CmdEntry { name: CMD_CP, terminal: false, handler: handle_cp::<B, C> },
        CmdEntry { name: CMD_MV, terminal: false, handler: handle_mv::<B, C> },
        CmdEntry { name: CMD_RES, terminal: false, handler: handle_res::<B, C> },
        CmdEntry { name: CMD_RM, terminal: false, handler: handle_rm::<B, C> },
        CmdEntry { name: CMD_PUT, terminal: false, handler: handle_put::<B, C> },
        CmdEntry { name: CMD_ADD, terminal: false, handler: handle_add::<B, C> },
        CmdEntry { name: CMD_COPY_ONE, terminal: false, handler: handle_copy_one::<B, C> },
        CmdEntry { name: CMD_COPY_TREE, terminal: false, handler: handle_copy_tree::<B, C> },
        CmdEntry { name: CMD_DELETE, terminal: false, handler: handle_delete::<B, C> },
        CmdEntry { name: CMD_ALTER, terminal: false, handler: handle_alter::<B, C> },
        CmdEntry { name: CMD_COMPLETE, terminal: true, handler: handle_complete::<B, C> },
        CmdEntry { name: CMD_ABORT, terminal: true, handler: handle_abort::<B, C> },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use submerge_lang::{NbidAllocator, NodeContent, PropMap, RelPath};

    fn roundtrip(cmd_in: EditCommand) -> EditCommand {
        let mut conn = Connection::new(Cursor::new(Vec::new()));
        write_command(&mut conn, cmd_in).unwrap();
        let wire = conn.into_inner().into_inner();

        let mut reader = Connection::new(Cursor::new(wire));
        let item = reader.read_item().unwrap();
        let envelope = TupleReader::new(&item).unwrap();
        let name = envelope.w(0).unwrap().to_string();
        let params = envelope.list(1).unwrap();
        decode_command(&name, params).unwrap()
    }

    #[test]
    fn mk_round_trips_through_wire_encoding() {
        let parent = TxnPath::anchored(PegPath::in_txn(""));
        let content = NodeContent::dir(None, PropMap::new());
        let cmd = EditCommand::StyleA(StyleAOp::Mk { kind: NodeKind::Directory, parent, name: Name::from("a"), content });
        match roundtrip(cmd) {
            EditCommand::StyleA(StyleAOp::Mk { kind, name, .. }) => {
                assert_eq!(kind, NodeKind::Directory);
                assert_eq!(name, Name::from("a"));
            }
            _ => panic!("expected Mk"),
        }
    }

    #[test]
    fn put_with_inline_file_stream_round_trips() {
        let target = TxnPath::new(PegPath::in_txn(""), "f");
        let stream: Box<dyn ContentStream> = Box::new(Cursor::new(b"hello world".to_vec()));
        let content = NodeContent::file(None, PropMap::new(), None, Some(stream));
        let cmd = EditCommand::StyleA(StyleAOp::Put { target, content });
        match roundtrip(cmd) {
            EditCommand::StyleA(StyleAOp::Put { content, .. }) => match content.payload {
                NodePayload::File { stream: Some(mut s), .. } => {
                    let mut buf = Vec::new();
                    s.read_to_end(&mut buf).unwrap();
                    assert_eq!(buf, b"hello world");
                }
                other => panic!("unexpected payload {other:?}"),
            },
            _ => panic!("expected Put"),
        }
    }

    #[test]
    fn copy_one_round_trips_revision_and_nbids() {
        let mut alloc = NbidAllocator::new();
        let new_nbid = alloc.alloc();
        let src_nbid = alloc.alloc();
        let parent_nbid = alloc.alloc();
        let cmd = EditCommand::StyleB(StyleBOp::CopyOne {
            new_nbid: new_nbid.clone(),
            src_rev: Revision::Committed(9),
            src_nbid: src_nbid.clone(),
            parent_nbid: parent_nbid.clone(),
            name: Name::from("x"),
            content: NodeContent::dir(None, PropMap::new()),
        });
        match roundtrip(cmd) {
            EditCommand::StyleB(StyleBOp::CopyOne { new_nbid: n, src_rev, src_nbid: s, parent_nbid: p, .. }) => {
                assert_eq!(n, new_nbid);
                assert_eq!(s, src_nbid);
                assert_eq!(p, parent_nbid);
                assert_eq!(src_rev, Revision::Committed(9));
            }
            _ => panic!("expected CopyOne"),
        }
    }

    #[test]
    fn delete_with_in_txn_since_rev_round_trips_as_sentinel() {
        let nbid = Nbid::from("n1");
        let cmd = EditCommand::StyleB(StyleBOp::Delete { since_rev: Revision::InTxn, nbid: nbid.clone() });
        match roundtrip(cmd) {
            EditCommand::StyleB(StyleBOp::Delete { since_rev, nbid: n }) => {
                assert_eq!(since_rev, Revision::InTxn);
                assert_eq!(n, nbid);
            }
            _ => panic!("expected Delete"),
        }
    }

    #[test]
    fn complete_and_abort_round_trip_with_empty_params() {
        assert!(matches!(roundtrip(EditCommand::Complete), EditCommand::Complete));
        assert!(matches!(roundtrip(EditCommand::Abort), EditCommand::Abort));
    }

    #[test]
    fn unrecognized_command_name_is_unknown_cmd() {
        let err = decode_command("bogus", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownCmd);
    }

    #[test]
    fn txn_path_with_created_suffix_round_trips() {
        let tp = TxnPath::new(PegPath::at_rev(3, "a/b"), RelPath::from("c/d"));
        let item = txn_path_to_item(&tp);
        let back = read_txn_path(&item).unwrap();
        assert_eq!(back, tp);
    }
}
