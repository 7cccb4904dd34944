use serde::{Deserialize, Serialize};

/// A committed revision number, or the sentinel meaning "the current
/// in-progress transaction" (§3: "When revision is the sentinel
/// 'in-transaction,' the path refers to the current transaction state").
///
/// On the wire this rides the `r` tuple-format slot (§4.1), which omits
/// the element entirely inside an optional `[...]` block rather than
/// writing a sentinel value; [`Revision::to_wire`]/[`Revision::from_wire`]
/// encode that as `Option<u64>`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Revision {
    Committed(u64),
    InTxn,
}

impl Revision {
    pub fn to_wire(self) -> Option<u64> {
        match self {
            Revision::Committed(n) => Some(n),
            Revision::InTxn => None,
        }
    }

    pub fn from_wire(rev: Option<u64>) -> Revision {
        match rev {
            Some(n) => Revision::Committed(n),
            None => Revision::InTxn,
        }
    }

    pub fn is_in_txn(self) -> bool {
        matches!(self, Revision::InTxn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        assert_eq!(Revision::from_wire(Revision::Committed(7).to_wire()), Revision::Committed(7));
        assert_eq!(Revision::from_wire(Revision::InTxn.to_wire()), Revision::InTxn);
    }
}
