use submerge_base::CoreError;
use submerge_lang::{ContentSink, Nbid, NodeKind, PegPath, Revision, TxnPath};

use crate::ood::OodRequirement;

/// The external repository collaborator (§6 "Interface to the
/// repository backend"). The engine never touches committed storage
/// directly; every question about history, and every byte written for
/// file content, goes through this trait. A backend is also a
/// [`ContentSink`]: writing file bytes and resolving history are both
/// the same external party's job.
pub trait RepositoryBackend: ContentSink {
    fn begin_txn(&mut self, base_rev: Revision) -> Result<(), CoreError>;

    /// Attempts to publish the accumulated edit. On success, returns the
    /// new revision number; a conflict detected at commit time (as
    /// opposed to one caught earlier by per-operation OOD checks)
    /// surfaces as `Err` with kind `CONFLICT`.
    fn commit_txn(&mut self) -> Result<u64, CoreError>;

    /// Locates the node-branch identified by `peg` and traces it forward
    /// through intervening committed revisions up to `to_rev`, returning
    /// its current transaction-path, or `None` if it no longer exists
    /// (§4.2 "Resolution of peg-paths to transaction paths").
    fn trace_forward(&self, peg: &PegPath, to_rev: Revision) -> Result<Option<TxnPath>, CoreError>;

    /// Reads the full content stream referenced by `peg`, for content
    /// that is inherited by reference rather than supplied inline.
    fn fetch_content(&self, peg: &PegPath) -> Result<Box<dyn submerge_lang::ContentStream>, CoreError>;

    /// The kind of the node-branch `peg` names at its own revision.
    /// `Err` with kind `PATH_NOT_FOUND` if it doesn't resolve. Needed
    /// both to answer `mk`/`add` parent-is-a-directory checks against a
    /// copied subtree and to resolve unmaterialized descendants of a
    /// copy on demand (§9 "copy-is-branching"; `svn_editor3.h`'s note
    /// that ops "MAY be used on a child of a copy").
    fn peg_kind(&self, peg: &PegPath) -> Result<NodeKind, CoreError>;

    /// Checks whether `requirement` held for `nbid` across every commit
    /// between `since_rev` and the transaction's base. `Err` with kind
    /// `OUT_OF_DATE` on violation.
    fn check_ood(&self, nbid: &Nbid, since_rev: Revision, requirement: OodRequirement) -> Result<(), CoreError>;
}
