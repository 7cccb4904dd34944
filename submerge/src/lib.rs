//! The top-level crate: a small demonstration of the pieces in
//! `submerge-net`/`submerge-txn` wired together end to end over a real
//! two-way transport, rather than a library any of the others depend
//! on. Illustrative, not a deployable server.

pub mod memory_backend;

use std::io;
use std::os::unix::net::UnixStream;
use std::thread;

use submerge_base::CoreError;
use submerge_net::{Connection, NeverCancel};
use submerge_txn::{dispatch_table, Editor, EditorConfig, MixedBase, RepositoryBackend, WireEditorClient};

/// Spawns an edit session split across a loopback socket pair: a server
/// thread running [`Editor`] against one end via `handle_commands`, and
/// a [`WireEditorClient`] over the other end returned to the caller. The
/// two ends of a `UnixStream::pair()` give each side genuine blocking
/// reads/writes against the other, which a single in-memory buffer
/// can't: the dispatch loop on the server side needs to block for the
/// next command while the client is still deciding what to send.
pub fn spawn_loopback_session<B>(
    backend: B,
    base: MixedBase,
    config: EditorConfig,
) -> io::Result<(WireEditorClient<UnixStream>, thread::JoinHandle<Result<(), CoreError>>)>
where
    B: RepositoryBackend + Send + 'static,
{
    let (server_sock, client_sock) = UnixStream::pair()?;

    let handle = thread::spawn(move || -> Result<(), CoreError> {
        let mut conn = Connection::new(server_sock);
        let mut editor = Editor::new(backend, base, config)?;
        let table = dispatch_table::<B, NeverCancel>();
        submerge_net::handle_commands(&mut conn, &table, &mut editor)
    });

    let client = WireEditorClient::new(Connection::new(client_sock));
    Ok((client, handle))
}
