use std::io::Read;

use submerge_base::{CoreError, ErrorKind};
use submerge_lang::{Name, Nbid, NodeKind, PegPath, PropMap, Revision, StoredContent, StoredPayload, TxnPath};

use crate::backend::RepositoryBackend;
use crate::state::{NodeBranch, TxnTree};

/// Resolves a peg-path to the NBID it currently names in the
/// transaction (§4.2 "Resolution of peg-paths to transaction paths"):
/// an in-transaction peg walks the live tree directly; a committed peg
/// is traced forward by the backend and then walked the same way.
pub fn resolve_peg(peg: &PegPath, tree: &mut TxnTree, backend: &dyn RepositoryBackend) -> Result<Nbid, CoreError> {
    if peg.rev.is_in_txn() {
        let root = tree.root().clone();
        return walk_from(tree, backend, root, peg.relpath.components());
    }
    let traced = backend
        .trace_forward(peg, Revision::InTxn)?
        .ok_or_else(|| CoreError::new(ErrorKind::PathNotFound, "peg-path does not resolve at the transaction base"))?;
    resolve_txn_path(&traced, tree, backend)
}

/// Resolves a transaction-path: resolve its anchor, then walk the
/// created-relpath suffix through nodes created within this edit.
pub fn resolve_txn_path(tp: &TxnPath, tree: &mut TxnTree, backend: &dyn RepositoryBackend) -> Result<Nbid, CoreError> {
    let anchor_nbid = resolve_peg(&tp.anchor, tree, backend)?;
    walk_from(tree, backend, anchor_nbid, tp.created_relpath.components())
}

/// Walks `components` from `start`, one tree lookup at a time. A copied
/// subtree materializes only its root `NodeBranch` at copy time (§9
/// "copy-is-branching"); a component that isn't a live child of the
/// current node but whose current node carries a content `reference` is
/// a descendant of that reference that this edit has never touched, so
/// it is materialized here, on demand, as a fresh `NodeBranch` whose own
/// reference is the parent's reference with the component appended.
/// `svn_editor3.h` is explicit that `rm`/`mv`/`alter`/etc. "MAY be used
/// on a child of a copy", so this has to work for every op that resolves
/// a path, not just reads.
fn walk_from<'a>(
    tree: &mut TxnTree,
    backend: &dyn RepositoryBackend,
    start: Nbid,
    components: impl Iterator<Item = &'a [u8]>,
) -> Result<Nbid, CoreError> {
    let mut current = start;
    for component in components {
        current = match tree.child_named(&current, component) {
            Some(next) => next,
            None => materialize_virtual_child(tree, backend, &current, component)?,
        };
    }
    Ok(current)
}

fn not_found() -> CoreError {
    CoreError::new(ErrorKind::PathNotFound, "path component not found in transaction")
}

/// Materializes the virtual child `component` of `parent`, resolving it
/// against the backend at `parent`'s own content reference. `parent`
/// must itself carry a reference (either because it is a copy's root,
/// or because it was itself materialized this way) or there is nothing
/// to resolve `component` against.
fn materialize_virtual_child(tree: &mut TxnTree, backend: &dyn RepositoryBackend, parent: &Nbid, component: &[u8]) -> Result<Nbid, CoreError> {
    let parent_ref = tree.get(parent).ok_or_else(not_found)?.content.reference.clone().ok_or_else(not_found)?;
    let child_peg = PegPath::new(parent_ref.rev, parent_ref.relpath.join(&component.to_vec().into()));
    let kind = backend.peg_kind(&child_peg)?;
    let payload = match kind {
        NodeKind::Directory => StoredPayload::Directory,
        NodeKind::File => StoredPayload::File { checksum: None },
        NodeKind::Symlink => {
            let mut stream = backend.fetch_content(&child_peg)?;
            let mut target = Vec::new();
            stream.read_to_end(&mut target).map_err(|e| CoreError::new(ErrorKind::IoError, e.to_string()))?;
            StoredPayload::Symlink { target }
        }
        NodeKind::Unknown => StoredPayload::Unknown,
    };
    let nbid = tree.alloc_nbid();
    tree.insert(NodeBranch {
        nbid: nbid.clone(),
        parent: Some(parent.clone()),
        name: Name::from(component.to_vec()),
        content: StoredContent { reference: Some(child_peg), props: PropMap::new(), payload },
        created_in_txn: true,
        deleted: false,
        modified: false,
        since_rev: Revision::InTxn,
    })?;
    Ok(nbid)
}
