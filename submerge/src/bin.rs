//! Drives one edit session over a real loopback socket: create a
//! directory, put a file under it, then complete. Exits non-zero on any
//! engine or transport error.

use std::io::Cursor;

use submerge::memory_backend::MemoryBackend;
use submerge::spawn_loopback_session;
use submerge_lang::{Name, NodeContent, NodeKind, PegPath, PropMap, TxnPath};
use submerge_txn::{EditorConfig, MixedBase, TreeEditor};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let backend = MemoryBackend::new(0);
    let (mut client, server) = spawn_loopback_session(backend, MixedBase::single(0), EditorConfig::default())?;

    let root = TxnPath::anchored(PegPath::in_txn(""));
    client.mk(NodeKind::Directory, root, Name::from("trunk"), NodeContent::dir(None, PropMap::new()))?;

    let trunk = TxnPath::new(PegPath::in_txn(""), "trunk");
    let readme = NodeContent::file(None, PropMap::new(), None, Some(Box::new(Cursor::new(b"hello\n".to_vec()))));
    client.mk(NodeKind::File, trunk, Name::from("README"), readme)?;

    let new_rev = client.complete()?;
    tracing::info!(new_rev, "session committed");

    server.join().expect("server thread panicked")?;
    Ok(())
}
