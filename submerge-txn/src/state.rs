use std::collections::BTreeMap;

use submerge_base::{CoreError, ErrorKind};
use submerge_lang::{Nbid, NbidAllocator, Name, Revision, StoredContent, StoredPayload};

/// One node-branch in the transaction tree (§3 "Transaction state"):
/// parent-NBID, name, content, and the flag set the rebase and
/// final-validation rules key off of.
#[derive(Clone, Debug)]
pub struct NodeBranch {
    pub nbid: Nbid,
    pub parent: Option<Nbid>,
    pub name: Name,
    pub content: StoredContent,
    pub created_in_txn: bool,
    pub deleted: bool,
    pub modified: bool,
    /// Revision this node-branch's content/location was last known-good
    /// against; compared to the session base for OOD checks on `delete`
    /// and `alter` (§4.2 "since-rev").
    pub since_rev: Revision,
}

impl NodeBranch {
    pub fn is_directory(&self) -> bool {
        self.content.kind() == submerge_lang::NodeKind::Directory
    }
}

/// The live mutable tree a transaction accumulates (§3). Keyed by NBID so
/// both editor styles can address nodes uniformly once a path has been
/// resolved to one.
#[derive(Debug)]
pub struct TxnTree {
    nodes: BTreeMap<Nbid, NodeBranch>,
    root: Nbid,
    allocator: NbidAllocator,
}

impl TxnTree {
    pub fn new() -> Self {
        let root = Nbid::root();
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root.clone(),
            NodeBranch {
                nbid: root.clone(),
                parent: None,
                name: Name::empty(),
                content: StoredContent {
                    reference: None,
                    props: Default::default(),
                    payload: StoredPayload::Directory,
                },
                created_in_txn: false,
                deleted: false,
                modified: false,
                since_rev: Revision::InTxn,
            },
        );
        TxnTree { nodes, root, allocator: NbidAllocator::new() }
    }

    pub fn root(&self) -> &Nbid {
        &self.root
    }

    pub fn get(&self, nbid: &Nbid) -> Option<&NodeBranch> {
        self.nodes.get(nbid)
    }

    pub fn get_mut(&mut self, nbid: &Nbid) -> Option<&mut NodeBranch> {
        self.nodes.get_mut(nbid)
    }

    pub fn is_live(&self, nbid: &Nbid) -> bool {
        self.nodes.get(nbid).is_some_and(|n| !n.deleted)
    }

    /// Looks up a live child of `parent` by name. Used both for the
    /// "name free" precondition and for resolving created-relpath
    /// suffixes of transaction-paths.
    pub fn child_named(&self, parent: &Nbid, name: &[u8]) -> Option<Nbid> {
        self.nodes
            .values()
            .find(|n| !n.deleted && n.parent.as_ref() == Some(parent) && n.name.as_bytes() == name)
            .map(|n| n.nbid.clone())
    }

    /// Looks up a child of `parent` by name regardless of liveness —
    /// used by `res` to tell "name is free" apart from "name was
    /// deleted earlier in this txn" (§9 open question: resurrection
    /// interacting with a txn-local delete is `PRECONDITION_FAILED`,
    /// not silently allowed).
    pub fn node_named_any(&self, parent: &Nbid, name: &[u8]) -> Option<&NodeBranch> {
        self.nodes.values().find(|n| n.parent.as_ref() == Some(parent) && n.name.as_bytes() == name)
    }

    pub fn live_children(&self, parent: &Nbid) -> impl Iterator<Item = &NodeBranch> {
        self.nodes.values().filter(move |n| !n.deleted && n.parent.as_ref() == Some(parent))
    }

    pub fn all_live(&self) -> impl Iterator<Item = &NodeBranch> {
        self.nodes.values().filter(|n| !n.deleted)
    }

    /// Allocates a fresh NBID for a node created through the ordered
    /// (style-A) interface, which does not take a caller-supplied id
    /// (§3: "the driver assigns NBIDs" — only true of the id-addressed
    /// style; style-A's receiver tracks identity purely internally).
    pub fn alloc_nbid(&mut self) -> Nbid {
        self.allocator.alloc()
    }

    pub fn insert(&mut self, branch: NodeBranch) -> Result<(), CoreError> {
        if self.nodes.contains_key(&branch.nbid) {
            return Err(CoreError::new(
                ErrorKind::Conflict,
                format!("node-branch id {} already in use", branch.nbid),
            ));
        }
        self.nodes.insert(branch.nbid.clone(), branch);
        Ok(())
    }

    /// Recursively marks `nbid` and every node currently reachable from
    /// it through live parent links as deleted. Because this walks
    /// *current* parent links rather than a snapshot, a descendant moved
    /// out from under `nbid` before the call survives (§8 property 10,
    /// scenario S3).
    pub fn delete_recursive(&mut self, nbid: &Nbid) {
        let children: Vec<Nbid> = self.live_children(nbid).map(|n| n.nbid.clone()).collect();
        for child in children {
            self.delete_recursive(&child);
        }
        if let Some(n) = self.nodes.get_mut(nbid) {
            n.deleted = true;
        }
    }
}

impl Default for TxnTree {
    fn default() -> Self {
        TxnTree::new()
    }
}
