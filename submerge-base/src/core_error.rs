use crate::ErrorKind;
use std::fmt;
use std::panic::Location;

/// A single frame of a causal chain: the `(code, message, file, line)`
/// wire record from §7. `file`/`line` are diagnostic only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    pub code: u64,
    pub message: String,
    pub file: String,
    pub line: u64,
}

/// A structured error carrying one of the closed [`ErrorKind`]s plus a
/// causal chain, reconstructable from and marshalable to the wire failure
/// record defined in §7/§4.1. This is the error type the codec and the
/// tree-edit engine use internally; call sites that only want "did this
/// fail" convert it into the opaque [`crate::Error`] via the blanket
/// `From<E: std::error::Error>` impl already provided for that type.
#[derive(Debug)]
pub struct CoreError {
    kind: ErrorKind,
    message: String,
    file: &'static str,
    line: u32,
    source: Option<Box<CoreError>>,
}

impl CoreError {
    #[track_caller]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let loc = Location::caller();
        let message = message.into();
        tracing::error!(target: "submerge", kind = ?kind, file = loc.file(), line = loc.line(), "{}", message);
        CoreError {
            kind,
            message,
            file: loc.file(),
            line: loc.line(),
            source: None,
        }
    }

    #[track_caller]
    pub fn wrap(kind: ErrorKind, message: impl Into<String>, source: CoreError) -> Self {
        let loc = Location::caller();
        let message = message.into();
        tracing::error!(target: "submerge", kind = ?kind, file = loc.file(), line = loc.line(), cause = %source, "{}", message);
        CoreError {
            kind,
            message,
            file: loc.file(),
            line: loc.line(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Unwrap one level: the dispatch loop uses this on a `CmdErr`-kinded
    /// handler failure to recover the actual reported cause (§7: "a
    /// handler may signal a sentinel error whose child becomes the
    /// reported failure").
    pub fn into_child(self) -> Option<CoreError> {
        self.source.map(|b| *b)
    }

    /// Walk the chain outermost-first (`self`, then `self`'s cause, ...),
    /// matching the order `write_cmd_failure` in the original walks
    /// `err->child` and the order scenario S2 puts on the wire.
    pub fn frames_outer_to_inner(&self) -> impl Iterator<Item = &CoreError> {
        std::iter::successors(Some(self), |e| e.source.as_deref())
    }

    pub fn to_wire_frames(&self) -> Vec<WireFrame> {
        self.frames_outer_to_inner()
            .map(|e| WireFrame {
                code: e.kind.code(),
                message: e.message.clone(),
                file: e.file.to_string(),
                line: e.line as u64,
            })
            .collect()
    }

    /// Reconstruct a chain from wire frames in the order they arrived
    /// (outermost first, innermost last — see §4.1 and scenario S2).
    /// An empty list is malformed: a failure response always carries at
    /// least one frame.
    pub fn from_wire_frames(frames: &[WireFrame]) -> Result<CoreError, CoreError> {
        if frames.is_empty() {
            return Err(CoreError::new(
                ErrorKind::MalformedData,
                "empty error frame list in failure response",
            ));
        }
        let mut chain: Option<CoreError> = None;
        for frame in frames.iter().rev() {
            let kind = ErrorKind::from_code(frame.code).unwrap_or(ErrorKind::CmdErr);
            chain = Some(CoreError {
                kind,
                message: frame.message.clone(),
                file: leak_file(&frame.file),
                line: frame.line as u32,
                source: chain.take().map(Box::new),
            });
        }
        Ok(chain.expect("non-empty frames produce a chain"))
    }
}

/// Wire frames carry an owned `file` string; `CoreError::file` is
/// `&'static str` to keep the common (locally constructed) path
/// allocation-free. Frames reconstructed off the wire are rare (error
/// paths only) so the one-time leak here is an acceptable trade.
fn leak_file(s: &str) -> &'static str {
    Box::leak(s.to_string().into_boxed_str())
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {} ({}:{})", self.kind, self.message, self.file, self.line)
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_preserves_chain_shape() {
        let inner = CoreError::new(ErrorKind::PathNotFound, "A");
        let outer = CoreError::wrap(ErrorKind::Conflict, "B", inner);

        let frames = outer.to_wire_frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].code, ErrorKind::Conflict.code());
        assert_eq!(frames[1].code, ErrorKind::PathNotFound.code());

        let rebuilt = CoreError::from_wire_frames(&frames).unwrap();
        assert_eq!(rebuilt.kind(), ErrorKind::Conflict);
        assert_eq!(rebuilt.message(), "B");
        let inner_rebuilt = rebuilt.frames_outer_to_inner().nth(1).unwrap();
        assert_eq!(inner_rebuilt.kind(), ErrorKind::PathNotFound);
        assert_eq!(inner_rebuilt.message(), "A");
    }

    #[test]
    fn empty_frames_is_malformed() {
        let err = CoreError::from_wire_frames(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedData);
    }

    #[test]
    fn unknown_code_falls_back_to_cmd_err() {
        let frames = vec![WireFrame {
            code: 999_999,
            message: "mystery".into(),
            file: "x.c".into(),
            line: 1,
        }];
        let rebuilt = CoreError::from_wire_frames(&frames).unwrap();
        assert_eq!(rebuilt.kind(), ErrorKind::CmdErr);
    }
}
