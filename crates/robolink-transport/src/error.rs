use std::io;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the named port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on an open port.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// Read or write attempted while the port is closed.
    #[error("transport is not open")]
    NotOpen,

    /// The serial configuration is rejected before any port is touched.
    #[error("invalid serial configuration: {0}")]
    InvalidConfig(String),

    /// The configuration is valid but the serial backend cannot express it.
    #[error("unsupported serial setting: {0}")]
    Unsupported(String),
}

impl TransportError {
    /// Convert into an `io::Error`, keeping the original kind where there is one.
    pub fn into_io(self) -> io::Error {
        match self {
            TransportError::Io(err) => err,
            TransportError::NotOpen => {
                io::Error::new(io::ErrorKind::NotConnected, "transport is not open")
            }
            TransportError::Open { source, .. } => io::Error::from(source),
            other => io::Error::other(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_io_keeps_kind() {
        let err = TransportError::Io(io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(err.into_io().kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn not_open_maps_to_not_connected() {
        assert_eq!(
            TransportError::NotOpen.into_io().kind(),
            io::ErrorKind::NotConnected
        );
    }
}
