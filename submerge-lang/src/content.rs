use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use submerge_base::{CoreError, ErrorKind};

use crate::PegPath;

/// One of {directory, file, symlink, unknown}. Immutable once set on a
/// node-branch; `Unknown` is only valid when content is purely a
/// reference and no kind-specific field is supplied (§3 "Node kind").
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Directory,
    File,
    Symlink,
    Unknown,
}

/// A SHA-1 content checksum. The core never computes these, only stores
/// and compares the ones the caller supplies.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Sha1Digest(pub [u8; 20]);

impl fmt::Debug for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha1:")?;
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Name -> byte string property mapping attached to every node kind.
pub type PropMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// A file's bytes, supplied inline as a one-shot readable stream. Per §5,
/// "streams passed as content are consumed exactly once; after the
/// operation returns they are considered closed." Not `Clone`, not
/// storable in the transaction tree directly — see [`StoredContent`].
pub trait ContentStream: Read + Send {}
impl<T: Read + Send> ContentStream for T {}

/// The content-sink half of the content channel (§4.3, and the external
/// collaborator named in §1): reads a stream to completion and returns
/// the checksum of what was written. An external repository backend
/// implements this; the engine only calls through it.
pub trait ContentSink {
    fn write_file(&mut self, data: &mut dyn Read) -> Result<Sha1Digest, CoreError>;
}

/// Kind-specific payload a driver supplies for a node, as distinct
/// `NodePayload` variants so "exactly the kind-appropriate fields are
/// non-null" (§3) holds by construction rather than by runtime check.
pub enum NodePayload {
    Directory,
    File {
        checksum: Option<Sha1Digest>,
        stream: Option<Box<dyn ContentStream>>,
    },
    Symlink {
        target: Vec<u8>,
    },
    /// Permitted only when content is wholly inherited from `reference`
    /// (§3: "unknown is permitted only when content is being referenced
    /// from another node and no kind-specific field is supplied").
    Unknown,
}

impl fmt::Debug for NodePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePayload::Directory => write!(f, "Directory"),
            NodePayload::File { checksum, stream } => f
                .debug_struct("File")
                .field("checksum", checksum)
                .field("stream", &stream.is_some())
                .finish(),
            NodePayload::Symlink { target } => {
                write!(f, "Symlink({})", String::from_utf8_lossy(target))
            }
            NodePayload::Unknown => write!(f, "Unknown"),
        }
    }
}

impl NodePayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Directory => NodeKind::Directory,
            NodePayload::File { .. } => NodeKind::File,
            NodePayload::Symlink { .. } => NodeKind::Symlink,
            NodePayload::Unknown => NodeKind::Unknown,
        }
    }
}

/// Content a driver presents for a node: kind-specific payload, an
/// optional reference to an existing committed node-rev whose content is
/// inherited, and a property mapping. "If both reference and an override
/// are present, the override takes precedence for that field" (§3) — see
/// [`StoredContent::capture`].
pub struct NodeContent {
    pub reference: Option<PegPath>,
    pub props: PropMap,
    pub payload: NodePayload,
}

impl NodeContent {
    pub fn reference_only(reference: PegPath) -> Self {
        NodeContent { reference: Some(reference), props: PropMap::new(), payload: NodePayload::Unknown }
    }

    pub fn dir(reference: Option<PegPath>, props: PropMap) -> Self {
        NodeContent { reference, props, payload: NodePayload::Directory }
    }

    pub fn file(
        reference: Option<PegPath>,
        props: PropMap,
        checksum: Option<Sha1Digest>,
        stream: Option<Box<dyn ContentStream>>,
    ) -> Self {
        NodeContent { reference, props, payload: NodePayload::File { checksum, stream } }
    }

    pub fn symlink(reference: Option<PegPath>, props: PropMap, target: Vec<u8>) -> Self {
        NodeContent { reference, props, payload: NodePayload::Symlink { target } }
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }
}

/// Kind-specific payload as actually held in the transaction tree: never
/// a live stream (it has already been pulled through a [`ContentSink`]).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum StoredPayload {
    Directory,
    File { checksum: Option<Sha1DigestWire> },
    Symlink { target: Vec<u8> },
    Unknown,
}

/// `Sha1Digest` wrapped for serde (arrays > 16 elements need a manual
/// impl on this serde version's derive).
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Sha1DigestWire(#[serde(with = "serde_bytes_array")] pub [u8; 20]);

impl fmt::Debug for Sha1DigestWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Sha1Digest(self.0).fmt(f)
    }
}

impl From<Sha1Digest> for Sha1DigestWire {
    fn from(d: Sha1Digest) -> Self {
        Sha1DigestWire(d.0)
    }
}

impl From<Sha1DigestWire> for Sha1Digest {
    fn from(d: Sha1DigestWire) -> Self {
        Sha1Digest(d.0)
    }
}

mod serde_bytes_array {
    use serde::{Deserializer, Serializer, Deserialize, Serialize};

    pub fn serialize<S: Serializer>(bytes: &[u8; 20], s: S) -> Result<S::Ok, S::Error> {
        bytes.to_vec().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 20], D::Error> {
        let v = Vec::<u8>::deserialize(d)?;
        v.try_into().map_err(|_| serde::de::Error::custom("expected 20 bytes"))
    }
}

impl StoredPayload {
    pub fn kind(&self) -> NodeKind {
        match self {
            StoredPayload::Directory => NodeKind::Directory,
            StoredPayload::File { .. } => NodeKind::File,
            StoredPayload::Symlink { .. } => NodeKind::Symlink,
            StoredPayload::Unknown => NodeKind::Unknown,
        }
    }
}

/// Content as held for a live node-branch in the transaction state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredContent {
    pub reference: Option<PegPath>,
    pub props: PropMap,
    pub payload: StoredPayload,
}

impl StoredContent {
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// Capture a driver-supplied [`NodeContent`] into transaction state,
    /// pulling any inline stream through `sink` exactly once. An explicit
    /// checksum, if present, takes precedence over one computed by the
    /// sink — "if both reference and an override are present, the
    /// override takes precedence for that field" (§3).
    pub fn capture(content: NodeContent, sink: &mut dyn ContentSink) -> Result<StoredContent, CoreError> {
        let payload = match content.payload {
            NodePayload::Directory => StoredPayload::Directory,
            NodePayload::Symlink { target } => StoredPayload::Symlink { target },
            NodePayload::Unknown => StoredPayload::Unknown,
            NodePayload::File { checksum, stream } => {
                let resolved = match (checksum, stream) {
                    (Some(c), Some(mut s)) => {
                        sink.write_file(&mut s)?;
                        Some(c)
                    }
                    (Some(c), None) => Some(c),
                    (None, Some(mut s)) => Some(sink.write_file(&mut s)?),
                    (None, None) => None,
                };
                StoredPayload::File { checksum: resolved.map(Sha1DigestWire::from) }
            }
        };
        Ok(StoredContent { reference: content.reference, props: content.props, payload })
    }

    /// §3 invariant 2/3: every live node has kind-consistent content, and
    /// every file has either a checksum or a reference that can resolve
    /// (resolution itself is the repository backend's job; this only
    /// checks the locally-visible shape).
    pub fn validate_shape(&self) -> Result<(), CoreError> {
        if let StoredPayload::File { checksum: None } = &self.payload {
            if self.reference.is_none() {
                return Err(CoreError::new(
                    ErrorKind::PreconditionFailed,
                    "file content has neither a checksum nor a reference",
                ));
            }
        }
        Ok(())
    }
}
