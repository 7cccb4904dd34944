use serde::{Deserialize, Serialize};
use std::fmt;

/// Node-Branch Identifier: an identifier for a node-branch, scoped to one
/// edit session. The driver assigns these (never the receiver) so that a
/// parent can be referenced before its path-in-transaction is resolvable
/// (§3 "Node-branch identifier (NBID)").
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Nbid(String);

impl Nbid {
    pub fn new(id: impl Into<String>) -> Self {
        Nbid(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The always-present implicit root, per §3 "Transaction state: ...
    /// The root is an implicit, always-present node."
    pub fn root() -> Self {
        Nbid("0".to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == "0"
    }
}

impl fmt::Display for Nbid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Nbid {
    fn from(s: &str) -> Self {
        Nbid(s.to_string())
    }
}

impl From<String> for Nbid {
    fn from(s: String) -> Self {
        Nbid(s)
    }
}

/// Monotonically assigns fresh NBIDs for a single edit session (driver
/// side). Distinct from node identity tracking in the engine itself.
#[derive(Debug, Default)]
pub struct NbidAllocator {
    next: u64,
}

impl NbidAllocator {
    pub fn new() -> Self {
        NbidAllocator { next: 1 }
    }

    pub fn alloc(&mut self) -> Nbid {
        let id = self.next;
        self.next += 1;
        Nbid(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_assigns_distinct_ids() {
        let mut a = NbidAllocator::new();
        let ids: Vec<_> = (0..3).map(|_| a.alloc()).collect();
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn root_is_recognized() {
        assert!(Nbid::root().is_root());
        assert!(!Nbid::from("7").is_root());
    }
}
