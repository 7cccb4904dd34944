use std::collections::{BTreeMap, BTreeSet};

use submerge_base::{CoreError, ErrorKind};
use submerge_lang::{Nbid, Revision};

use crate::backend::RepositoryBackend;
use crate::state::TxnTree;

fn conflict(msg: impl Into<String>) -> CoreError {
    CoreError::new(ErrorKind::Conflict, msg.into())
}

/// Runs the five final-state checks from §4.2 "Final-state validation on
/// `complete`" / the §3 invariants they restate. Called once, at
/// `complete`, after every operation in the edit (ordered or
/// independent) has been staged into the tree.
pub fn validate_final_state(tree: &TxnTree, backend: &dyn RepositoryBackend) -> Result<(), CoreError> {
    check_tree_shape(tree)?;
    check_unique_names(tree)?;
    check_content_and_parents(tree, backend)?;
    Ok(())
}

/// Invariant 1: the parent/children graph is a rooted tree — every live
/// non-root node has a parent, and following parent links from any live
/// node reaches the root without revisiting a node.
fn check_tree_shape(tree: &TxnTree) -> Result<(), CoreError> {
    for node in tree.all_live() {
        if &node.nbid == tree.root() {
            continue;
        }
        if node.parent.is_none() {
            return Err(conflict(format!("live node {} has no parent", node.nbid)));
        }
        let mut seen: BTreeSet<Nbid> = BTreeSet::new();
        let mut current = node.nbid.clone();
        loop {
            if !seen.insert(current.clone()) {
                return Err(conflict(format!("cycle detected reaching node {}", node.nbid)));
            }
            if &current == tree.root() {
                break;
            }
            let Some(parent) = tree.get(&current).and_then(|n| n.parent.clone()) else {
                return Err(conflict(format!("node {current} has a dangling ancestor chain")));
            };
            current = parent;
        }
    }
    Ok(())
}

/// Invariant 2: names are unique within each directory.
fn check_unique_names(tree: &TxnTree) -> Result<(), CoreError> {
    let mut by_parent: BTreeMap<Nbid, BTreeSet<Vec<u8>>> = BTreeMap::new();
    for node in tree.all_live() {
        let Some(parent) = &node.parent else { continue };
        let names = by_parent.entry(parent.clone()).or_default();
        if !names.insert(node.name.as_bytes().to_vec()) {
            return Err(conflict(format!("duplicate name under parent {parent}")));
        }
    }
    Ok(())
}

/// Invariants 2 (content §3)/3/4/5 (§4.2): kind-consistent content with
/// a resolvable file checksum or reference, every parent is a live
/// directory, and every committed content reference resolves.
fn check_content_and_parents(tree: &TxnTree, backend: &dyn RepositoryBackend) -> Result<(), CoreError> {
    for node in tree.all_live() {
        node.content.validate_shape()?;

        if let Some(parent) = &node.parent {
            let parent_node = tree.get(parent).ok_or_else(|| conflict(format!("parent {parent} is missing")))?;
            if parent_node.deleted {
                return Err(conflict(format!("parent {parent} is deleted")));
            }
            if !parent_node.is_directory() {
                return Err(conflict(format!("parent {parent} is not a directory")));
            }
        }

        if let Some(reference) = &node.content.reference {
            if !reference.rev.is_in_txn() {
                backend
                    .trace_forward(reference, Revision::InTxn)?
                    .ok_or_else(|| CoreError::new(ErrorKind::PathNotFound, "referenced content does not resolve in committed history"))?;
            }
        }
    }
    Ok(())
}
