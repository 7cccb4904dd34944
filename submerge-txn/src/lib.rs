//! The tree-edit engine (§4.2/§4.3): a single `Editor` type presenting
//! both operation styles over one transaction state machine, enforcing
//! preconditions, tracking node-branch identity, checking out-of-date
//! rebase rules against an external [`RepositoryBackend`], and
//! validating final-state consistency at `complete`.

mod backend;
mod command;
mod ood;
mod resolve;
mod sink;
mod state;
mod validate;
mod wire;

pub use backend::RepositoryBackend;
pub use command::{EditCommand, StyleAOp, StyleBOp};
pub use ood::OodRequirement;
pub use sink::TreeEditor;
pub use state::{NodeBranch, TxnTree};
pub use wire::{dispatch_table, WireEditorClient};

use std::collections::BTreeMap;
use std::io::Read;

use submerge_base::{CoreError, ErrorKind};
use submerge_lang::{Nbid, NodeContent, NodeKind, PegPath, PropMap, RelPath, Revision, StoredContent, StoredPayload, TxnPath};
use submerge_net::{Cancellation, NeverCancel};

fn precondition(msg: impl Into<String>) -> CoreError {
    CoreError::new(ErrorKind::PreconditionFailed, msg.into())
}

/// A commit's base, possibly mixed across paths (§9 "Mixed-rev base"):
/// most operations are authored against one overall base revision, but
/// a client may have individual subtrees pinned to an older revision
/// (e.g. a sparse or partially-updated working copy). Looked up by the
/// top-level relative path a peg/txn-path resolves from; anything not
/// named in `overrides` falls back to `default_rev`.
#[derive(Clone, Debug)]
pub struct MixedBase {
    default_rev: u64,
    overrides: BTreeMap<RelPath, u64>,
}

impl MixedBase {
    pub fn single(default_rev: u64) -> Self {
        MixedBase { default_rev, overrides: BTreeMap::new() }
    }

    pub fn with_override(mut self, path: impl Into<RelPath>, rev: u64) -> Self {
        self.overrides.insert(path.into(), rev);
        self
    }

    pub fn since_rev_for(&self, path: &RelPath) -> u64 {
        self.overrides.get(path).copied().unwrap_or(self.default_rev)
    }

    /// The since-rev to use for a style-A operation's target, read off
    /// a transaction-path's anchor when that anchor is a plain committed
    /// peg with no created-relpath suffix (the common case); any other
    /// shape (an in-transaction anchor, or an anchor with a suffix
    /// created during this same edit) has no path the override table was
    /// keyed by, so it falls back to `default_rev`.
    pub fn since_rev_for_txn_path(&self, tp: &TxnPath) -> u64 {
        match tp.anchor.rev {
            Revision::Committed(_) if tp.created_relpath.is_empty() => self.since_rev_for(&tp.anchor.relpath),
            _ => self.default_rev,
        }
    }
}

/// Whether cp-from-transaction (§9 open question) is enabled. Default
/// is disabled: `cp`/`copy-one`/`copy-tree` from an in-transaction
/// source return `PRECONDITION_FAILED` unless this is set.
#[derive(Clone, Copy, Debug, Default)]
pub struct EditorConfig {
    pub allow_cp_from_txn: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum EditorState {
    Open,
    Completed,
    Aborted,
}

/// Driver/callback tree-edit session (§3 "Lifecycle", §4.2 state
/// machine): `OPEN -> (ops)* -> {COMPLETED | ABORTED}`. One instance
/// backs both operation styles (§9 "Dual-style interface") over one
/// [`TxnTree`]; which style a given call uses is just which
/// [`EditCommand`] variant the driver constructs.
pub struct Editor<B, C = NeverCancel> {
    backend: B,
    tree: TxnTree,
    base: MixedBase,
    config: EditorConfig,
    cancel: C,
    state: EditorState,
    /// Pre-existing node-branches the driver has made known to this
    /// session ahead of issuing ops against them — the id-addressed
    /// style's analogue of a path resolving through history. A real
    /// session populates this from an `open`-style report (e.g. the
    /// result of an `update` walk) before issuing `delete`/`alter`/
    /// `copy-one`/`copy-tree` against those ids; see DESIGN.md.
    known: BTreeMap<Nbid, PegPath>,
}

impl<B: RepositoryBackend> Editor<B, NeverCancel> {
    pub fn new(backend: B, base: MixedBase, config: EditorConfig) -> Result<Self, CoreError> {
        Self::with_cancellation(backend, base, config, NeverCancel)
    }
}

impl<B: RepositoryBackend, C: Cancellation> Editor<B, C> {
    pub fn with_cancellation(mut backend: B, base: MixedBase, config: EditorConfig, cancel: C) -> Result<Self, CoreError> {
        backend.begin_txn(Revision::Committed(base.default_rev))?;
        Ok(Editor { backend, tree: TxnTree::new(), base, config, cancel, state: EditorState::Open, known: BTreeMap::new() })
    }

    /// Declares a pre-existing node-branch to the session ahead of
    /// operating on it by id: its session-scoped NBID, its current
    /// parent/name in the transaction, and the peg-path a history-aware
    /// backend can resolve it from. Mirrors the original's "open"
    /// sequence that an id-addressed driver walks before issuing
    /// `delete`/`alter`/`copy-one`/`copy-tree`.
    pub fn track_existing_node(&mut self, nbid: Nbid, parent: Option<Nbid>, name: submerge_lang::Name, peg: PegPath) -> Result<(), CoreError> {
        self.check_open()?;
        self.known.insert(nbid.clone(), peg.clone());
        if nbid.is_root() {
            return Ok(());
        }
        self.tree.insert(NodeBranch {
            nbid,
            parent,
            name,
            content: StoredContent { reference: Some(peg), props: PropMap::new(), payload: StoredPayload::Unknown },
            created_in_txn: false,
            deleted: false,
            modified: false,
            since_rev: Revision::InTxn,
        })
    }

    fn check_open(&self) -> Result<(), CoreError> {
        match self.state {
            EditorState::Open => Ok(()),
            EditorState::Completed => Err(CoreError::new(ErrorKind::EditFinished, "editor already completed")),
            EditorState::Aborted => Err(CoreError::new(ErrorKind::EditAborted, "editor already aborted")),
        }
    }

    fn require_parent_dir(&self, parent: &Nbid) -> Result<(), CoreError> {
        let node = self.tree.get(parent).ok_or_else(|| precondition(format!("parent {parent} does not exist")))?;
        if node.deleted {
            return Err(precondition(format!("parent {parent} has been deleted")));
        }
        if !node.is_directory() {
            return Err(precondition(format!("parent {parent} is not a directory")));
        }
        Ok(())
    }

    fn require_name_free(&self, parent: &Nbid, name: &submerge_lang::Name) -> Result<(), CoreError> {
        if self.tree.child_named(parent, name.as_bytes()).is_some() {
            return Err(precondition(format!("name {name} already exists under {parent}")));
        }
        Ok(())
    }

    fn capture(&mut self, content: NodeContent) -> Result<StoredContent, CoreError> {
        StoredContent::capture(content, &mut self.backend)
    }

    /// §3 "Node kind... immutable once set": a node created with only a
    /// reference (kind `Unknown`) can still have its first concrete
    /// kind fixed by a later `put`/`alter`; once concrete, it cannot
    /// change.
    fn check_kind_immutable(existing: submerge_lang::NodeKind, incoming: submerge_lang::NodeKind) -> Result<(), CoreError> {
        use submerge_lang::NodeKind::Unknown;
        if existing != Unknown && existing != incoming {
            return Err(precondition(format!("node kind is immutable once set ({existing:?} -> {incoming:?})")));
        }
        Ok(())
    }

    /// Dispatches one [`EditCommand`] through the session state machine
    /// (§4.2: `COMPLETED` -> `EDIT_FINISHED`, `ABORTED` -> `EDIT_ABORTED`
    /// on every further op) and the per-operation table in §4.2.
    pub fn apply(&mut self, cmd: EditCommand) -> Result<(), CoreError> {
        match cmd {
            EditCommand::Complete => {
                self.complete()?;
                Ok(())
            }
            EditCommand::Abort => self.abort(),
            EditCommand::StyleA(op) => {
                self.check_open()?;
                self.cancel_point()?;
                self.apply_style_a(op)
            }
            EditCommand::StyleB(op) => {
                self.check_open()?;
                self.cancel_point()?;
                self.apply_style_b(op)
            }
        }
    }

    fn cancel_point(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(CoreError::new(ErrorKind::Cancelled, "operation cancelled"));
        }
        Ok(())
    }

    fn apply_style_a(&mut self, op: StyleAOp) -> Result<(), CoreError> {
        match op {
            StyleAOp::Mk { kind, parent, name, content } => {
                let parent_nbid = resolve::resolve_txn_path(&parent, &mut self.tree, &self.backend)?;
                self.require_parent_dir(&parent_nbid)?;
                self.require_name_free(&parent_nbid, &name)?;
                let stored = self.capture(content)?;
                Self::check_kind_immutable(kind, stored.kind())?;
                let nbid = self.tree.alloc_nbid();
                self.tree.insert(NodeBranch {
                    nbid,
                    parent: Some(parent_nbid),
                    name,
                    content: stored,
                    created_in_txn: true,
                    deleted: false,
                    modified: false,
                    since_rev: Revision::InTxn,
                })
            }

            StyleAOp::Cp { from, parent, name } => {
                if from.rev.is_in_txn() && !self.config.allow_cp_from_txn {
                    return Err(precondition("copy from an in-transaction source is not enabled for this session"));
                }
                let parent_nbid = resolve::resolve_txn_path(&parent, &mut self.tree, &self.backend)?;
                self.require_parent_dir(&parent_nbid)?;
                self.require_name_free(&parent_nbid, &name)?;

                let stored = if from.rev.is_in_txn() {
                    // S5: copy from a node touched earlier in this same
                    // edit snapshots its current stored content rather
                    // than re-deriving a reference, so the new branch
                    // mirrors what the source held at copy time.
                    let src_nbid = resolve::resolve_peg(&from, &mut self.tree, &self.backend)?;
                    self.tree.get(&src_nbid).ok_or_else(|| precondition("copy source vanished"))?.content.clone()
                } else {
                    // The copy's root is materialized eagerly; any
                    // descendant is resolved lazily against `reference`
                    // the first time a later op walks a path through it
                    // (see `resolve::walk_from`), so the kind recorded
                    // here only has to be this node's own.
                    let kind = self.backend.peg_kind(&from)?;
                    let payload = match kind {
                        NodeKind::Directory => StoredPayload::Directory,
                        NodeKind::File => StoredPayload::File { checksum: None },
                        NodeKind::Symlink => {
                            let mut stream = self.backend.fetch_content(&from)?;
                            let mut target = Vec::new();
                            stream.read_to_end(&mut target).map_err(|e| CoreError::new(ErrorKind::IoError, e.to_string()))?;
                            StoredPayload::Symlink { target }
                        }
                        NodeKind::Unknown => StoredPayload::Unknown,
                    };
                    StoredContent { reference: Some(from), props: PropMap::new(), payload }
                };

                let nbid = self.tree.alloc_nbid();
                self.tree.insert(NodeBranch {
                    nbid,
                    parent: Some(parent_nbid),
                    name,
                    content: stored,
                    created_in_txn: true,
                    deleted: false,
                    modified: false,
                    since_rev: Revision::InTxn,
                })
            }

            StyleAOp::Mv { from, new_parent, new_name } => {
                let src_nbid = resolve::resolve_peg(&from, &mut self.tree, &self.backend)?;
                let since_rev = self.base.since_rev_for(&from.relpath);
                self.backend.check_ood(&src_nbid, Revision::Committed(since_rev), OodRequirement::MOVE_SOURCE)?;

                let new_parent_nbid = resolve::resolve_txn_path(&new_parent, &mut self.tree, &self.backend)?;
                self.require_parent_dir(&new_parent_nbid)?;
                self.require_name_free(&new_parent_nbid, &new_name)?;

                let node = self.tree.get_mut(&src_nbid).ok_or_else(|| precondition("move source vanished"))?;
                node.parent = Some(new_parent_nbid);
                node.name = new_name;
                node.modified = true;
                Ok(())
            }

            StyleAOp::Res { from, parent, name } => {
                let parent_nbid = resolve::resolve_txn_path(&parent, &mut self.tree, &self.backend)?;
                self.require_parent_dir(&parent_nbid)?;

                if let Some(existing) = self.tree.node_named_any(&parent_nbid, name.as_bytes()) {
                    if !existing.deleted {
                        return Err(precondition(format!("name {name} is not absent from the transaction")));
                    }
                    if existing.deleted && !existing.created_in_txn {
                        // §9: resurrection interacting with a txn-local
                        // delete at the same location is explicitly
                        // SHOULD NOT in the source; treat as a failure.
                        return Err(precondition("cannot resurrect over a name deleted earlier in this transaction"));
                    }
                }

                let nbid = self.tree.alloc_nbid();
                self.tree.insert(NodeBranch {
                    nbid,
                    parent: Some(parent_nbid),
                    name,
                    content: StoredContent { reference: Some(from), props: PropMap::new(), payload: StoredPayload::Unknown },
                    created_in_txn: true,
                    deleted: false,
                    modified: false,
                    since_rev: Revision::InTxn,
                })
            }

            StyleAOp::Rm { target } => {
                let nbid = resolve::resolve_txn_path(&target, &mut self.tree, &self.backend)?;
                if nbid == *self.tree.root() {
                    return Err(precondition("cannot remove the root"));
                }
                if !self.tree.is_live(&nbid) {
                    return Err(precondition(format!("target {nbid} does not exist in the transaction")));
                }
                let since_rev = self.base.since_rev_for_txn_path(&target);
                self.backend.check_ood(&nbid, Revision::Committed(since_rev), OodRequirement::REMOVE_TARGET)?;
                self.tree.delete_recursive(&nbid);
                Ok(())
            }

            StyleAOp::Put { target, content } => {
                let nbid = resolve::resolve_txn_path(&target, &mut self.tree, &self.backend)?;
                if !self.tree.is_live(&nbid) {
                    return Err(precondition(format!("target {nbid} does not exist in the transaction")));
                }
                let since_rev = self.base.since_rev_for_txn_path(&target);
                self.backend.check_ood(&nbid, Revision::Committed(since_rev), OodRequirement::CONTENT_TARGET)?;
                let stored = self.capture(content)?;
                let existing_kind = self.tree.get(&nbid).expect("checked live above").content.kind();
                Self::check_kind_immutable(existing_kind, stored.kind())?;
                let node = self.tree.get_mut(&nbid).expect("checked live above");
                node.content = stored;
                node.modified = true;
                Ok(())
            }
        }
    }

    fn apply_style_b(&mut self, op: StyleBOp) -> Result<(), CoreError> {
        match op {
            StyleBOp::Add { new_nbid, kind, parent_nbid, name, content } => {
                if self.tree.get(&new_nbid).is_some() {
                    return Err(CoreError::new(ErrorKind::Conflict, format!("node-branch id {new_nbid} already in use")));
                }
                let stored = self.capture(content)?;
                Self::check_kind_immutable(kind, stored.kind())?;
                self.tree.insert(NodeBranch {
                    nbid: new_nbid,
                    parent: Some(parent_nbid),
                    name,
                    content: stored,
                    created_in_txn: true,
                    deleted: false,
                    modified: false,
                    since_rev: Revision::InTxn,
                })
            }

            StyleBOp::CopyOne { new_nbid, src_rev, src_nbid, parent_nbid, name, content } => {
                if src_rev.is_in_txn() && !self.config.allow_cp_from_txn {
                    return Err(precondition("copy from an in-transaction source is not enabled for this session"));
                }
                // Existence of `src_nbid` is "in committed rev or final
                // state" (§4.2): we only have visibility into the
                // former right now (via `known`), the latter is the
                // final-validation pass's job, so this is a best-effort
                // check, not the full precondition.
                if !src_rev.is_in_txn() && !self.known.contains_key(&src_nbid) && self.tree.get(&src_nbid).is_none() {
                    return Err(CoreError::new(ErrorKind::PathNotFound, "copy-one source is not known to this session"));
                }
                let stored = self.capture(content)?;
                self.tree.insert(NodeBranch {
                    nbid: new_nbid,
                    parent: Some(parent_nbid),
                    name,
                    content: stored,
                    created_in_txn: true,
                    deleted: false,
                    modified: false,
                    since_rev: Revision::InTxn,
                })
            }

            StyleBOp::CopyTree { src_rev, src_nbid, parent_nbid, name } => {
                if src_rev.is_in_txn() && !self.config.allow_cp_from_txn {
                    return Err(precondition("copy from an in-transaction source is not enabled for this session"));
                }
                let stored = if src_rev.is_in_txn() {
                    self.tree
                        .get(&src_nbid)
                        .ok_or_else(|| CoreError::new(ErrorKind::PathNotFound, "copy-tree source not found in transaction"))?
                        .content
                        .clone()
                } else {
                    let peg = self
                        .known
                        .get(&src_nbid)
                        .cloned()
                        .ok_or_else(|| CoreError::new(ErrorKind::PathNotFound, "copy-tree source is not known to this session"))?;
                    StoredContent { reference: Some(peg), props: PropMap::new(), payload: StoredPayload::Unknown }
                };
                // Not addressable further: allocated internally, never
                // handed back to the driver (§4.2 "copied nodes are not
                // further addressable in this edit").
                let nbid = self.tree.alloc_nbid();
                self.tree.insert(NodeBranch {
                    nbid,
                    parent: Some(parent_nbid),
                    name,
                    content: stored,
                    created_in_txn: true,
                    deleted: false,
                    modified: false,
                    since_rev: Revision::InTxn,
                })
            }

            StyleBOp::Delete { since_rev, nbid } => {
                let node = self.tree.get(&nbid).ok_or_else(|| precondition(format!("{nbid} is not live in the initial state")))?;
                if node.created_in_txn || node.deleted {
                    return Err(precondition(format!("{nbid} is not live in the initial state")));
                }
                self.backend.check_ood(&nbid, since_rev, OodRequirement::REMOVE_TARGET)?;
                self.tree.delete_recursive(&nbid);
                Ok(())
            }

            StyleBOp::Alter { since_rev, nbid, new_parent_nbid, new_name, new_content } => {
                let node = self.tree.get(&nbid).ok_or_else(|| precondition(format!("{nbid} is not live in the initial state")))?;
                if node.created_in_txn || node.deleted {
                    return Err(precondition(format!("{nbid} is not live in the initial state")));
                }
                self.backend.check_ood(&nbid, since_rev, OodRequirement::ALTER_TARGET)?;
                let stored = self.capture(new_content)?;
                let existing_kind = self.tree.get(&nbid).expect("checked above").content.kind();
                Self::check_kind_immutable(existing_kind, stored.kind())?;
                let node = self.tree.get_mut(&nbid).expect("checked above");
                node.parent = Some(new_parent_nbid);
                node.name = new_name;
                node.content = stored;
                node.modified = true;
                Ok(())
            }
        }
    }

    /// Runs final-state validation (§4.2/§3 invariants) and, if it
    /// passes, asks the backend to publish the edit. Either failure
    /// mode (validation or the backend's own commit-time conflict
    /// detection) leaves the session `COMPLETED` — per §7, a failed
    /// `complete` still ends the session; the driver must start a new
    /// edit to retry.
    pub fn complete(&mut self) -> Result<u64, CoreError> {
        self.check_open()?;
        self.cancel_point()?;
        let result = validate::validate_final_state(&self.tree, &self.backend).and_then(|()| self.backend.commit_txn());
        self.state = EditorState::Completed;
        result
    }

    /// Discards the transaction. Idempotent once aborted; returns
    /// `EDIT_FINISHED` if called after a successful `complete` (§4.2:
    /// only one of `COMPLETED`/`ABORTED` is reachable per session).
    pub fn abort(&mut self) -> Result<(), CoreError> {
        if self.state == EditorState::Completed {
            return Err(CoreError::new(ErrorKind::EditFinished, "editor already completed"));
        }
        self.state = EditorState::Aborted;
        Ok(())
    }

    pub fn tree(&self) -> &TxnTree {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap as Map;
    use std::io::Read;
    use submerge_lang::{ContentSink, ContentStream, Name, NodeKind, Sha1Digest};

    /// A minimal in-memory backend sufficient to drive the engine's own
    /// tests: one committed revision's worth of (relpath -> content),
    /// trivially "committing" by handing back an incrementing counter,
    /// and an OOD table the test can poke to simulate intervening
    /// commits for scenario S4.
    struct FakeBackend {
        rev: u64,
        tree_paths: Map<Vec<u8>, NodeKind>,
        changed_since: RefCell<Vec<Nbid>>,
    }

    impl FakeBackend {
        fn new(rev: u64) -> Self {
            FakeBackend { rev, tree_paths: Map::new(), changed_since: RefCell::new(Vec::new()) }
        }

        fn mark_changed(&self, nbid: Nbid) {
            self.changed_since.borrow_mut().push(nbid);
        }
    }

    impl ContentSink for FakeBackend {
        fn write_file(&mut self, data: &mut dyn Read) -> Result<Sha1Digest, CoreError> {
            let mut buf = Vec::new();
            data.read_to_end(&mut buf).map_err(|e| CoreError::new(ErrorKind::IoError, e.to_string()))?;
            Ok(Sha1Digest([0u8; 20]))
        }
    }

    impl RepositoryBackend for FakeBackend {
        fn begin_txn(&mut self, _base_rev: Revision) -> Result<(), CoreError> {
            Ok(())
        }

        fn commit_txn(&mut self) -> Result<u64, CoreError> {
            self.rev += 1;
            Ok(self.rev)
        }

        fn trace_forward(&self, peg: &PegPath, _to_rev: Revision) -> Result<Option<TxnPath>, CoreError> {
            if self.tree_paths.contains_key(peg.relpath.as_bytes()) || peg.relpath.is_empty() {
                Ok(Some(TxnPath::anchored(peg.clone())))
            } else {
                Ok(None)
            }
        }

        fn fetch_content(&self, _peg: &PegPath) -> Result<Box<dyn ContentStream>, CoreError> {
            Ok(Box::new(std::io::Cursor::new(Vec::new())))
        }

        fn peg_kind(&self, peg: &PegPath) -> Result<NodeKind, CoreError> {
            if peg.relpath.is_empty() {
                return Ok(NodeKind::Directory);
            }
            self.tree_paths
                .get(peg.relpath.as_bytes())
                .copied()
                .ok_or_else(|| CoreError::new(ErrorKind::PathNotFound, "peg-path does not resolve in this backend"))
        }

        fn check_ood(&self, nbid: &Nbid, _since_rev: Revision, _requirement: OodRequirement) -> Result<(), CoreError> {
            if self.changed_since.borrow().contains(nbid) {
                Err(CoreError::new(ErrorKind::OutOfDate, format!("{nbid} changed since the client's base revision")))
            } else {
                Ok(())
            }
        }
    }

    fn root_txn_path() -> TxnPath {
        TxnPath::anchored(PegPath::in_txn(""))
    }

    #[test]
    fn mixed_base_since_rev_for_committed_anchor_falls_back_to_default_not_its_own_peg_rev() {
        let base = MixedBase::single(10).with_override("overridden", 3);

        // No override for "plain": the since-rev has to come from
        // `default_rev`, not from the revision the driver happened to
        // peg this particular target at (99).
        let plain = TxnPath::anchored(PegPath::at_rev(99, "plain"));
        assert_eq!(base.since_rev_for_txn_path(&plain), 10);

        // An override still wins over both `default_rev` and the peg's
        // own revision.
        let overridden = TxnPath::anchored(PegPath::at_rev(99, "overridden"));
        assert_eq!(base.since_rev_for_txn_path(&overridden), 3);
    }

    #[test]
    fn s3_move_then_delete_preserves_moved_child() {
        // /a/b/c, then `mv ^/a/b -> /x`, then `rm ^/a`.
        let mut backend = FakeBackend::new(1);
        backend.tree_paths.insert(b"a/b".to_vec(), NodeKind::Directory);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();

        editor
            .apply_style_a(StyleAOp::Mk { kind: NodeKind::Directory, parent: root_txn_path(), name: Name::from("a"), content: NodeContent::dir(None, PropMap::new()) })
            .unwrap();
        let root = editor.tree().root().clone();
        let a = editor.tree().child_named(&root, b"a").unwrap();
        let b_parent = TxnPath::new(PegPath::in_txn(""), "a");
        editor
            .apply_style_a(StyleAOp::Mk { kind: NodeKind::Directory, parent: b_parent.clone(), name: Name::from("b"), content: NodeContent::dir(None, PropMap::new()) })
            .unwrap();
        let b = editor.tree().child_named(&a, b"b").unwrap();
        let c_parent = TxnPath::new(PegPath::in_txn(""), "a/b");
        editor
            .apply_style_a(StyleAOp::Mk { kind: NodeKind::Directory, parent: c_parent, name: Name::from("c"), content: NodeContent::dir(None, PropMap::new()) })
            .unwrap();
        let c = editor.tree().child_named(&b, b"c").unwrap();

        editor
            .apply_style_a(StyleAOp::Mv { from: PegPath::at_rev(1, "a/b"), new_parent: root_txn_path(), new_name: Name::from("x") })
            .unwrap();

        editor.apply_style_a(StyleAOp::Rm { target: TxnPath::new(PegPath::in_txn(""), "a") }).unwrap();

        assert!(!editor.tree().is_live(&a));
        assert!(editor.tree().is_live(&b));
        assert!(editor.tree().is_live(&c));
        let root = editor.tree().root().clone();
        assert_eq!(editor.tree().child_named(&root, b"x"), Some(b));
        assert_eq!(editor.tree().child_named(&b, b"c"), Some(c));
    }

    #[test]
    fn s4_ood_rejects_stale_put() {
        let mut backend = FakeBackend::new(6);
        backend.tree_paths.insert(b"f".to_vec(), NodeKind::File);
        let mut editor = Editor::new(backend, MixedBase::single(4), EditorConfig::default()).unwrap();

        editor
            .apply_style_a(StyleAOp::Mk { kind: NodeKind::File, parent: root_txn_path(), name: Name::from("f"), content: NodeContent::file(None, PropMap::new(), Some(Sha1Digest([1; 20])), None) })
            .unwrap();
        let root = editor.tree().root().clone();
        let f = editor.tree().child_named(&root, b"f").unwrap();
        editor.backend.mark_changed(f);

        let result = editor.apply_style_a(StyleAOp::Put {
            target: TxnPath::new(PegPath::in_txn(""), "f"),
            content: NodeContent::file(None, PropMap::new(), Some(Sha1Digest([2; 20])), None),
        });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::OutOfDate);
    }

    #[test]
    fn s6_copy_root_then_copy_from_txn_mirrors_content_when_enabled() {
        let mut backend = FakeBackend::new(3);
        backend.tree_paths.insert(b"a".to_vec(), NodeKind::Directory);
        let mut editor = Editor::new(backend, MixedBase::single(3), EditorConfig { allow_cp_from_txn: true }).unwrap();

        editor.apply_style_a(StyleAOp::Cp { from: PegPath::at_rev(3, "a"), parent: root_txn_path(), name: Name::from("p") }).unwrap();
        editor
            .apply_style_a(StyleAOp::Cp { from: PegPath::in_txn("p"), parent: root_txn_path(), name: Name::from("q") })
            .unwrap();

        let root = editor.tree().root().clone();
        let p = editor.tree().child_named(&root, b"p").unwrap();
        let q = editor.tree().child_named(&root, b"q").unwrap();
        assert_eq!(editor.tree().get(&p).unwrap().content, editor.tree().get(&q).unwrap().content);
        assert_ne!(p, q);
    }

    #[test]
    fn cp_of_unmaterialized_descendant_matches_direct_copy_of_the_descendant() {
        // (cp ^/a@5 b; rm b/c; cp ^/a/c@5 b/c) must equal (cp ^/a@5 b):
        // §8 property 12. "a" has an unmaterialized child "c" that the
        // first cp never inserts a NodeBranch for; rm and the second cp
        // have to walk through it anyway.
        let mut direct_backend = FakeBackend::new(5);
        direct_backend.tree_paths.insert(b"a".to_vec(), NodeKind::Directory);
        direct_backend.tree_paths.insert(b"a/c".to_vec(), NodeKind::Directory);
        let mut direct = Editor::new(direct_backend, MixedBase::single(5), EditorConfig::default()).unwrap();
        direct.apply_style_a(StyleAOp::Cp { from: PegPath::at_rev(5, "a"), parent: root_txn_path(), name: Name::from("b") }).unwrap();
        let direct_c = resolve::resolve_txn_path(&TxnPath::new(PegPath::in_txn(""), "b/c"), &mut direct.tree, &direct.backend).unwrap();
        let direct_c_content = direct.tree().get(&direct_c).unwrap().content.clone();

        let mut replayed_backend = FakeBackend::new(5);
        replayed_backend.tree_paths.insert(b"a".to_vec(), NodeKind::Directory);
        replayed_backend.tree_paths.insert(b"a/c".to_vec(), NodeKind::Directory);
        let mut replayed = Editor::new(replayed_backend, MixedBase::single(5), EditorConfig::default()).unwrap();
        replayed.apply_style_a(StyleAOp::Cp { from: PegPath::at_rev(5, "a"), parent: root_txn_path(), name: Name::from("b") }).unwrap();
        replayed.apply_style_a(StyleAOp::Rm { target: TxnPath::new(PegPath::in_txn(""), "b/c") }).unwrap();
        replayed
            .apply_style_a(StyleAOp::Cp { from: PegPath::at_rev(5, "a/c"), parent: TxnPath::new(PegPath::in_txn(""), "b"), name: Name::from("c") })
            .unwrap();

        let replayed_root = replayed.tree().root().clone();
        let replayed_b = replayed.tree().child_named(&replayed_root, b"b").unwrap();
        let replayed_c = replayed.tree().child_named(&replayed_b, b"c").unwrap();
        let replayed_c_content = replayed.tree().get(&replayed_c).unwrap().content.clone();

        assert_eq!(direct_c_content, replayed_c_content);
    }

    #[test]
    fn cp_from_txn_disabled_by_default_fails_precondition() {
        let backend = FakeBackend::new(1);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        let result = editor.apply_style_a(StyleAOp::Cp { from: PegPath::in_txn("p"), parent: root_txn_path(), name: Name::from("q") });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PreconditionFailed);
    }

    #[test]
    fn double_put_is_idempotent_last_wins() {
        let mut backend = FakeBackend::new(1);
        backend.tree_paths.insert(b"f".to_vec(), NodeKind::File);
        let editor_backend = &mut backend;
        let _ = editor_backend;
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        editor
            .apply_style_a(StyleAOp::Mk { kind: NodeKind::File, parent: root_txn_path(), name: Name::from("f"), content: NodeContent::file(None, PropMap::new(), Some(Sha1Digest([1; 20])), None) })
            .unwrap();
        editor
            .apply_style_a(StyleAOp::Put { target: TxnPath::new(PegPath::in_txn(""), "f"), content: NodeContent::file(None, PropMap::new(), Some(Sha1Digest([2; 20])), None) })
            .unwrap();
        editor
            .apply_style_a(StyleAOp::Put { target: TxnPath::new(PegPath::in_txn(""), "f"), content: NodeContent::file(None, PropMap::new(), Some(Sha1Digest([3; 20])), None) })
            .unwrap();
        let root = editor.tree().root().clone();
        let f = editor.tree().child_named(&root, b"f").unwrap();
        match &editor.tree().get(&f).unwrap().content.payload {
            StoredPayload::File { checksum: Some(c) } => assert_eq!(Sha1Digest::from(*c).0, [3; 20]),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn completed_editor_rejects_further_ops() {
        let backend = FakeBackend::new(1);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        editor.complete().unwrap();
        let result = editor.apply_style_a(StyleAOp::Mk { kind: NodeKind::Directory, parent: root_txn_path(), name: Name::from("a"), content: NodeContent::dir(None, PropMap::new()) });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::EditFinished);
    }

    #[test]
    fn aborted_editor_rejects_further_ops() {
        let backend = FakeBackend::new(1);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        editor.abort().unwrap();
        let result = editor.apply_style_a(StyleAOp::Mk { kind: NodeKind::Directory, parent: root_txn_path(), name: Name::from("a"), content: NodeContent::dir(None, PropMap::new()) });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::EditAborted);
    }

    #[test]
    fn res_over_txn_local_delete_is_precondition_failed() {
        let mut backend = FakeBackend::new(1);
        backend.tree_paths.insert(b"a".to_vec(), NodeKind::Directory);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        editor
            .apply_style_a(StyleAOp::Mk { kind: NodeKind::Directory, parent: root_txn_path(), name: Name::from("a"), content: NodeContent::dir(None, PropMap::new()) })
            .unwrap();
        editor.apply_style_a(StyleAOp::Rm { target: TxnPath::new(PegPath::in_txn(""), "a") }).unwrap();
        let result = editor.apply_style_a(StyleAOp::Res { from: PegPath::at_rev(1, "a"), parent: root_txn_path(), name: Name::from("a") });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PreconditionFailed);
    }

    #[test]
    fn style_b_add_and_delete_round_trip() {
        let backend = FakeBackend::new(1);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        let root = editor.tree().root().clone();
        editor
            .track_existing_node(Nbid::from("pre"), Some(root.clone()), Name::from("pre"), PegPath::at_rev(1, "pre"))
            .unwrap();

        editor
            .apply_style_b(StyleBOp::Add {
                new_nbid: Nbid::from("new1"),
                kind: NodeKind::Directory,
                parent_nbid: root.clone(),
                name: Name::from("new1"),
                content: NodeContent::dir(None, PropMap::new()),
            })
            .unwrap();
        assert!(editor.tree().is_live(&Nbid::from("new1")));

        editor.apply_style_b(StyleBOp::Delete { since_rev: Revision::Committed(1), nbid: Nbid::from("pre") }).unwrap();
        assert!(!editor.tree().is_live(&Nbid::from("pre")));
    }

    #[test]
    fn style_b_delete_rejects_freshly_created_node() {
        let backend = FakeBackend::new(1);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        let root = editor.tree().root().clone();
        editor
            .apply_style_b(StyleBOp::Add { new_nbid: Nbid::from("new1"), kind: NodeKind::Directory, parent_nbid: root, name: Name::from("new1"), content: NodeContent::dir(None, PropMap::new()) })
            .unwrap();
        let result = editor.apply_style_b(StyleBOp::Delete { since_rev: Revision::Committed(1), nbid: Nbid::from("new1") });
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PreconditionFailed);
    }

    #[test]
    fn complete_runs_final_validation() {
        let backend = FakeBackend::new(1);
        let mut editor = Editor::new(backend, MixedBase::single(1), EditorConfig::default()).unwrap();
        editor
            .apply_style_a(StyleAOp::Mk { kind: NodeKind::Directory, parent: root_txn_path(), name: Name::from("a"), content: NodeContent::dir(None, PropMap::new()) })
            .unwrap();
        let new_rev = editor.complete().unwrap();
        assert_eq!(new_rev, 2);
    }
}
