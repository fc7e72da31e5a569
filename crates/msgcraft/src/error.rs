use std::fmt;

/// Errors produced while assembling a `.msg` byte stream.
///
/// Variants match the core's error contract exactly; the crate performs no
/// retries and recovers nothing, so every variant aborts serialization with
/// no bytes committed to the sink.
#[derive(Debug)]
pub enum MsgError {
    /// A required field was missing or malformed, e.g. an empty sender
    /// address, an out-of-range recipient kind, or a conversation index
    /// shorter than the 22-byte minimum.
    InvalidInput(String),
    /// A caller-supplied property uses a MAPI type the codec does not
    /// implement.
    UnsupportedType(String),
    /// A strict-mode `STRING8` encoding could not represent the value in the
    /// message's codepage.
    EncodingError(String),
    /// The assembled container would exceed the addressable space of an
    /// MS-CFB v3 file (or this crate's directory-entry preallocation).
    CapacityExceeded(String),
    /// The underlying byte sink rejected a write; wraps the source
    /// [`std::io::Error`] verbatim so callers can inspect its `ErrorKind`.
    SinkError(std::io::Error),
}

impl fmt::Display for MsgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::UnsupportedType(msg) => write!(f, "unsupported MAPI type: {msg}"),
            Self::EncodingError(msg) => write!(f, "encoding error: {msg}"),
            Self::CapacityExceeded(msg) => write!(f, "capacity exceeded: {msg}"),
            Self::SinkError(e) => write!(f, "sink error: {e}"),
        }
    }
}

impl std::error::Error for MsgError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SinkError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MsgError {
    fn from(e: std::io::Error) -> Self {
        Self::SinkError(e)
    }
}

impl From<msgcraft_cfb::CfbError> for MsgError {
    fn from(e: msgcraft_cfb::CfbError) -> Self {
        match e {
            msgcraft_cfb::CfbError::CapacityExceeded(msg) => Self::CapacityExceeded(msg),
            msgcraft_cfb::CfbError::Sink(io_err) => Self::SinkError(io_err),
        }
    }
}

/// Collapses the five-variant [`MsgError`] back into a single
/// [`std::io::Error`], matching how the workspace's OLE reader surfaces
/// everything to callers that only want to handle one error type.
impl From<MsgError> for std::io::Error {
    fn from(e: MsgError) -> Self {
        match e {
            MsgError::SinkError(io_err) => io_err,
            other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}
