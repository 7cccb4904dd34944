//! A small in-process [`RepositoryBackend`] for driving a session without
//! any actual repository storage behind it: commits just bump a counter,
//! and the only history question it can answer ("does this relpath
//! exist") is answered from a flat set of paths the caller seeds up
//! front. Good enough to demonstrate the wire bridge end to end; not a
//! real repository.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use submerge_base::{CoreError, ErrorKind};
use submerge_lang::{ContentSink, ContentStream, Nbid, NodeKind, PegPath, Revision, Sha1Digest, TxnPath};
use submerge_txn::{OodRequirement, RepositoryBackend};

/// Never reports a conflict and never reports anything as having
/// changed: a `check_ood` this permissive is only appropriate for a
/// backend with exactly one writer and no concurrent history, which is
/// all this one is for.
pub struct MemoryBackend {
    rev: u64,
    known_paths: BTreeMap<Vec<u8>, NodeKind>,
}

impl MemoryBackend {
    pub fn new(starting_rev: u64) -> Self {
        MemoryBackend { rev: starting_rev, known_paths: BTreeMap::new() }
    }

    /// Seeds a relpath as resolvable at the backend's current base
    /// revision, so `cp`/`mv`/`res` can peg against it.
    pub fn seed_path(&mut self, relpath: impl Into<Vec<u8>>, kind: NodeKind) {
        self.known_paths.insert(relpath.into(), kind);
    }

    pub fn current_rev(&self) -> u64 {
        self.rev
    }
}

impl ContentSink for MemoryBackend {
    fn write_file(&mut self, data: &mut dyn Read) -> Result<Sha1Digest, CoreError> {
        let mut buf = Vec::new();
        data.read_to_end(&mut buf).map_err(|e| CoreError::new(ErrorKind::IoError, e.to_string()))?;
        Ok(Sha1Digest([0u8; 20]))
    }
}

impl RepositoryBackend for MemoryBackend {
    fn begin_txn(&mut self, _base_rev: Revision) -> Result<(), CoreError> {
        Ok(())
    }

    fn commit_txn(&mut self) -> Result<u64, CoreError> {
        self.rev += 1;
        Ok(self.rev)
    }

    fn trace_forward(&self, peg: &PegPath, _to_rev: Revision) -> Result<Option<TxnPath>, CoreError> {
        if peg.relpath.is_empty() || self.known_paths.contains_key(peg.relpath.as_bytes()) {
            Ok(Some(TxnPath::anchored(peg.clone())))
        } else {
            Ok(None)
        }
    }

    fn fetch_content(&self, _peg: &PegPath) -> Result<Box<dyn ContentStream>, CoreError> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    fn peg_kind(&self, peg: &PegPath) -> Result<NodeKind, CoreError> {
        if peg.relpath.is_empty() {
            return Ok(NodeKind::Directory);
        }
        self.known_paths
            .get(peg.relpath.as_bytes())
            .copied()
            .ok_or_else(|| CoreError::new(ErrorKind::PathNotFound, "peg-path does not resolve in this backend"))
    }

    fn check_ood(&self, _nbid: &Nbid, _since_rev: Revision, _requirement: OodRequirement) -> Result<(), CoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_path_traces_forward() {
        let mut backend = MemoryBackend::new(1);
        backend.seed_path(b"a/b".to_vec(), NodeKind::Directory);
        let found = backend.trace_forward(&PegPath::at_rev(1, "a/b"), Revision::Committed(1)).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn unseeded_path_does_not_trace() {
        let backend = MemoryBackend::new(1);
        let found = backend.trace_forward(&PegPath::at_rev(1, "nope"), Revision::Committed(1)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn commit_advances_revision() {
        let mut backend = MemoryBackend::new(5);
        assert_eq!(backend.commit_txn().unwrap(), 6);
        assert_eq!(backend.current_rev(), 6);
    }
}
