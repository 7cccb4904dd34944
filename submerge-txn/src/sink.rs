use submerge_base::{CoreError, ErrorKind};
use submerge_lang::{Name, Nbid, NodeContent, NodeKind, PegPath, Revision, TxnPath};

use crate::command::{EditCommand, StyleAOp, StyleBOp};
use crate::{Editor, RepositoryBackend};
use submerge_net::Cancellation;

fn unsupported(op: &str) -> CoreError {
    CoreError::new(ErrorKind::PreconditionFailed, format!("operation {op} is not supported by this editor sink"))
}

/// The driver/callback capability set from §9 "Sum types over callback
/// tables": one method per tree-mutation operation, each independently
/// optional — absence (the default body) means "unsupported operation",
/// mirroring the original's nullable function-pointer vtable
/// (`svn_editor3_cb_funcs_t`) without requiring every implementor to
/// stub out ops it doesn't care about. `complete`/`abort` have no
/// default: every sink must be able to end a session one way or the
/// other.
///
/// A driver is generic over this trait: the same sequence of calls can
/// be forwarded either to an in-process [`Editor`] (local application,
/// §4.2) or to a [`crate::wire::WireEditorClient`] (network forwarding,
/// §2 "the driver side encodes each call through the codec").
pub trait TreeEditor {
    fn mk(&mut self, _kind: NodeKind, _parent: TxnPath, _name: Name, _content: NodeContent) -> Result<(), CoreError> {
        Err(unsupported("mk"))
    }

    fn cp(&mut self, _from: PegPath, _parent: TxnPath, _name: Name) -> Result<(), CoreError> {
        Err(unsupported("cp"))
    }

    fn mv(&mut self, _from: PegPath, _new_parent: TxnPath, _new_name: Name) -> Result<(), CoreError> {
        Err(unsupported("mv"))
    }

    fn res(&mut self, _from: PegPath, _parent: TxnPath, _name: Name) -> Result<(), CoreError> {
        Err(unsupported("res"))
    }

    fn rm(&mut self, _target: TxnPath) -> Result<(), CoreError> {
        Err(unsupported("rm"))
    }

    fn put(&mut self, _target: TxnPath, _content: NodeContent) -> Result<(), CoreError> {
        Err(unsupported("put"))
    }

    fn add(&mut self, _new_nbid: Nbid, _kind: NodeKind, _parent_nbid: Nbid, _name: Name, _content: NodeContent) -> Result<(), CoreError> {
        Err(unsupported("add"))
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_one(
        &mut self,
        _new_nbid: Nbid,
        _src_rev: Revision,
        _src_nbid: Nbid,
        _parent_nbid: Nbid,
        _name: Name,
        _content: NodeContent,
    ) -> Result<(), CoreError> {
        Err(unsupported("copy-one"))
    }

    fn copy_tree(&mut self, _src_rev: Revision, _src_nbid: Nbid, _parent_nbid: Nbid, _name: Name) -> Result<(), CoreError> {
        Err(unsupported("copy-tree"))
    }

    fn delete(&mut self, _since_rev: Revision, _nbid: Nbid) -> Result<(), CoreError> {
        Err(unsupported("delete"))
    }

    #[allow(clippy::too_many_arguments)]
    fn alter(
        &mut self,
        _since_rev: Revision,
        _nbid: Nbid,
        _new_parent_nbid: Nbid,
        _new_name: Name,
        _new_content: NodeContent,
    ) -> Result<(), CoreError> {
        Err(unsupported("alter"))
    }

    fn complete(&mut self) -> Result<u64, CoreError>;
    fn abort(&mut self) -> Result<(), CoreError>;
}

impl<B: RepositoryBackend, C: Cancellation> TreeEditor for Editor<B, C> {
    fn mk(&mut self, kind: NodeKind, parent: TxnPath, name: Name, content: NodeContent) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleA(StyleAOp::Mk { kind, parent, name, content }))
    }

    fn cp(&mut self, from: PegPath, parent: TxnPath, name: Name) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleA(StyleAOp::Cp { from, parent, name }))
    }

    fn mv(&mut self, from: PegPath, new_parent: TxnPath, new_name: Name) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleA(StyleAOp::Mv { from, new_parent, new_name }))
    }

    fn res(&mut self, from: PegPath, parent: TxnPath, name: Name) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleA(StyleAOp::Res { from, parent, name }))
    }

    fn rm(&mut self, target: TxnPath) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleA(StyleAOp::Rm { target }))
    }

    fn put(&mut self, target: TxnPath, content: NodeContent) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleA(StyleAOp::Put { target, content }))
    }

    fn add(&mut self, new_nbid: Nbid, kind: NodeKind, parent_nbid: Nbid, name: Name, content: NodeContent) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleB(StyleBOp::Add { new_nbid, kind, parent_nbid, name, content }))
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
        self.apply(EditCommand::StyleB(StyleBOp::CopyOne { new_nbid, src_rev, src_nbid, parent_nbid, name, content }))
    }

    fn copy_tree(&mut self, src_rev: Revision, src_nbid: Nbid, parent_nbid: Nbid, name: Name) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleB(StyleBOp::CopyTree { src_rev, src_nbid, parent_nbid, name }))
    }

    fn delete(&mut self, since_rev: Revision, nbid: Nbid) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleB(StyleBOp::Delete { since_rev, nbid }))
    }

    fn alter(
        &mut self,
        since_rev: Revision,
        nbid: Nbid,
        new_parent_nbid: Nbid,
        new_name: Name,
        new_content: NodeContent,
    ) -> Result<(), CoreError> {
        self.apply(EditCommand::StyleB(StyleBOp::Alter { since_rev, nbid, new_parent_nbid, new_name, new_content }))
    }

    fn complete(&mut self) -> Result<u64, CoreError> {
        Editor::complete(self)
    }

    fn abort(&mut self) -> Result<(), CoreError> {
        Editor::abort(self)
    }
}
