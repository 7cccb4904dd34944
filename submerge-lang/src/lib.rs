mod content;
mod nbid;
mod path;
mod peg;
mod revision;

pub use content::{
    ContentSink, ContentStream, NodeContent, NodeKind, NodePayload, PropMap, Sha1Digest,
    Sha1DigestWire, StoredContent, StoredPayload,
};
pub use nbid::{Nbid, NbidAllocator};
pub use path::{Name, RelPath};
pub use peg::{PegPath, TxnPath};
pub use revision::Revision;
