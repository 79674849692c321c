use std::fmt;

/// Main error type for the murmur membership service
#[derive(Debug)]
pub enum MurmurError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Node lifecycle errors
    Node(String),

    /// Wire protocol errors
    Protocol(ProtocolError),

    /// Best-effort send could not be handed to the local transport
    Transport(String),

    /// System I/O errors
    Io(std::io::Error),

    /// JSON serialization errors
    Serialization(serde_json::Error),
}

/// Errors raised while decoding inbound bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Identity buffer shorter than its fixed width
    MalformedIdentity { len: usize },

    /// Buffer shorter than the minimum for its declared message type
    TruncatedMessage { len: usize, min: usize },

    /// Type tag does not name a known message
    UnknownMessageType(u8),
}

impl fmt::Display for MurmurError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MurmurError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MurmurError::Node(msg) => write!(f, "Node error: {}", msg),
            MurmurError::Protocol(err) => write!(f, "Protocol error: {}", err),
            MurmurError::Transport(msg) => write!(f, "Transport error: {}", msg),
            MurmurError::Io(err) => write!(f, "I/O error: {}", err),
            MurmurError::Serialization(err) => write!(f, "Serialization error: {}", err),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MalformedIdentity { len } => {
                write!(f, "Malformed identity: {} bytes available", len)
            }
            ProtocolError::TruncatedMessage { len, min } => {
                write!(f, "Truncated message: {} bytes, need at least {}", len, min)
            }
            ProtocolError::UnknownMessageType(tag) => write!(f, "Unknown message type: {}", tag),
        }
    }
}

impl std::error::Error for MurmurError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MurmurError::Io(err) => Some(err),
            MurmurError::Serialization(err) => Some(err),
            MurmurError::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for ProtocolError {}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, MurmurError>;

impl MurmurError {
    /// Get the error type identifier
    pub fn error_type(&self) -> &'static str {
        match self {
            MurmurError::Config(_) => "configuration_error",
            MurmurError::Node(_) => "node_error",
            MurmurError::Protocol(_) => "protocol_error",
            MurmurError::Transport(_) => "transport_error",
            MurmurError::Io(_) => "io_error",
            MurmurError::Serialization(_) => "serialization_error",
        }
    }

    /// Errors the engine drops without touching state
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MurmurError::Protocol(_) | MurmurError::Transport(_))
    }
}

// Conversions from common error types
impl From<std::io::Error> for MurmurError {
    fn from(err: std::io::Error) -> Self {
        MurmurError::Io(err)
    }
}

impl From<serde_json::Error> for MurmurError {
    fn from(err: serde_json::Error) -> Self {
        MurmurError::Serialization(err)
    }
}

impl From<ProtocolError> for MurmurError {
    fn from(err: ProtocolError) -> Self {
        MurmurError::Protocol(err)
    }
}

// Helper macros for common error construction patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! node_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Node($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Node(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! transport_error {
    ($msg:expr) => {
        $crate::error::MurmurError::Transport($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::MurmurError::Transport(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let config_err = MurmurError::Config("Invalid port".to_string());
        assert_eq!(config_err.to_string(), "Configuration error: Invalid port");

        let io_err = MurmurError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));
        assert!(io_err.to_string().contains("I/O error"));

        let protocol_err: MurmurError = ProtocolError::TruncatedMessage { len: 3, min: 16 }.into();
        assert_eq!(
            protocol_err.to_string(),
            "Protocol error: Truncated message: 3 bytes, need at least 16"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let murmur_err: MurmurError = io_err.into();

        assert!(matches!(murmur_err, MurmurError::Io(_)));
        assert_eq!(murmur_err.error_type(), "io_error");
        assert!(!murmur_err.is_recoverable());
    }

    #[test]
    fn test_macros() {
        let err = config_error!("Port {} is invalid", 65536);
        assert_eq!(err.to_string(), "Configuration error: Port 65536 is invalid");

        let err = transport_error!("queue closed");
        assert_eq!(err.to_string(), "Transport error: queue closed");
        assert!(err.is_recoverable());
    }
}
