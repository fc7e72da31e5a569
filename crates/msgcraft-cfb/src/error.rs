use std::fmt;

/// Errors produced while assembling a Compound File Binary container.
#[derive(Debug)]
pub enum CfbError {
    /// The assembled container would exceed the addressable space of a
    /// 32-bit-sector-indexed MS-CFB v3 file.
    CapacityExceeded(String),
    /// The underlying sink rejected a write.
    Sink(std::io::Error),
}

impl fmt::Display for CfbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded(msg) => write!(f, "capacity exceeded: {msg}"),
            Self::Sink(e) => write!(f, "sink error: {e}"),
        }
    }
}

impl std::error::Error for CfbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sink(e) => Some(e),
            Self::CapacityExceeded(_) => None,
        }
    }
}

impl From<std::io::Error> for CfbError {
    fn from(e: std::io::Error) -> Self {
        Self::Sink(e)
    }
}
