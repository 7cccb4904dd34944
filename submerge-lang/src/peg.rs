use crate::{RelPath, Revision};
use serde::{Deserialize, Serialize};

/// A peg-path: `(revision, relative-path)`. Anchors a node unambiguously
/// despite intervening moves — see §3 "Peg-path" and the GLOSSARY.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct PegPath {
    pub rev: Revision,
    pub relpath: RelPath,
}

impl PegPath {
    pub fn new(rev: Revision, relpath: impl Into<RelPath>) -> Self {
        PegPath { rev, relpath: relpath.into() }
    }

    pub fn in_txn(relpath: impl Into<RelPath>) -> Self {
        PegPath { rev: Revision::InTxn, relpath: relpath.into() }
    }

    pub fn at_rev(rev: u64, relpath: impl Into<RelPath>) -> Self {
        PegPath { rev: Revision::Committed(rev), relpath: relpath.into() }
    }
}

/// A transaction-path: a peg-path anchor plus an optional relpath suffix
/// created within the current edit (§3 "Transaction-path"). An empty
/// suffix means the anchor itself.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct TxnPath {
    pub anchor: PegPath,
    pub created_relpath: RelPath,
}

impl TxnPath {
    pub fn anchored(anchor: PegPath) -> Self {
        TxnPath { anchor, created_relpath: RelPath::empty() }
    }

    pub fn new(anchor: PegPath, created_relpath: impl Into<RelPath>) -> Self {
        TxnPath { anchor, created_relpath: created_relpath.into() }
    }

    pub fn is_anchor_only(&self) -> bool {
        self.created_relpath.is_empty()
    }
}

impl From<PegPath> for TxnPath {
    fn from(anchor: PegPath) -> Self {
        TxnPath::anchored(anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_only_has_empty_suffix() {
        let t = TxnPath::anchored(PegPath::in_txn("a/b"));
        assert!(t.is_anchor_only());
    }
}
