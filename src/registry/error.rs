//! Registry error types

use crate::error::BroadcastError;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Stream not found
    StreamNotFound(String),
    /// Stream already has a publisher
    StreamAlreadyPublishing(String),
    /// Caller is not the stream's current publisher
    PublisherMismatch,
    /// Stream exists but has no publisher and is not in grace period
    StreamNotActive(String),
    /// The producer's byte stream failed fatally
    Broadcast(BroadcastError),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::StreamNotFound(name) => write!(f, "Stream not found: {}", name),
            RegistryError::StreamAlreadyPublishing(name) => {
                write!(f, "Stream already has a publisher: {}", name)
            }
            RegistryError::PublisherMismatch => write!(f, "Publisher ID mismatch"),
            RegistryError::StreamNotActive(name) => write!(f, "Stream not active: {}", name),
            RegistryError::Broadcast(e) => write!(f, "Broadcast failed: {}", e),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::Broadcast(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BroadcastError> for RegistryError {
    fn from(e: BroadcastError) -> Self {
        RegistryError::Broadcast(e)
    }
}
