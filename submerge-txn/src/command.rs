use submerge_lang::{Name, Nbid, NodeContent, NodeKind, PegPath, Revision, TxnPath};

/// Style A — ordered, path-addressed operations (§4.2), applied to a
/// transaction one at a time in driver order. Later operations may
/// reference nodes created by earlier ones through a transaction-path's
/// created-relpath suffix.
pub enum StyleAOp {
    Mk { kind: NodeKind, parent: TxnPath, name: Name, content: NodeContent },
    Cp { from: PegPath, parent: TxnPath, name: Name },
    Mv { from: PegPath, new_parent: TxnPath, new_name: Name },
    Res { from: PegPath, parent: TxnPath, name: Name },
    Rm { target: TxnPath },
    Put { target: TxnPath, content: NodeContent },
}

/// Style B — independent, id-addressed operations (§4.2). Unordered:
/// only the final state, not any intermediate state, need be valid.
pub enum StyleBOp {
    Add { new_nbid: Nbid, kind: NodeKind, parent_nbid: Nbid, name: Name, content: NodeContent },
    CopyOne { new_nbid: Nbid, src_rev: Revision, src_nbid: Nbid, parent_nbid: Nbid, name: Name, content: NodeContent },
    CopyTree { src_rev: Revision, src_nbid: Nbid, parent_nbid: Nbid, name: Name },
    Delete { since_rev: Revision, nbid: Nbid },
    Alter { since_rev: Revision, nbid: Nbid, new_parent_nbid: Nbid, new_name: Name, new_content: NodeContent },
}

/// The two addressing styles modeled as explicit variants of a common
/// command type (§9 "Dual-style interface"), plus the two operations
/// that end an edit.
pub enum EditCommand {
    StyleA(StyleAOp),
    StyleB(StyleBOp),
    Complete,
    Abort,
}
