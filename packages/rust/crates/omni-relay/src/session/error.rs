use thiserror::Error;
use uuid::Uuid;

/// Turn log fault. The store never retries; callers decide what is lost.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Valkey connection or command failure.
    #[error("valkey {operation} failed for session_id={session_id}: {source}")]
    Backend {
        /// Store operation that failed.
        operation: &'static str,
        /// Session being accessed.
        session_id: String,
        /// Client error.
        #[source]
        source: redis::RedisError,
    },
    /// Stored payload could not be encoded or decoded.
    #[error("turn payload codec failed for session_id={session_id}: {source}")]
    Codec {
        /// Session being accessed.
        session_id: String,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// No turn with this id in the session.
    #[error("turn {turn_id} not found for session_id={session_id}")]
    UnknownTurn {
        /// Session searched.
        session_id: String,
        /// Missing turn.
        turn_id: Uuid,
    },
    /// The turn was already completed.
    #[error("turn {turn_id} for session_id={session_id} already has an answer")]
    AlreadyAnswered {
        /// Session of the turn.
        session_id: String,
        /// Completed turn.
        turn_id: Uuid,
    },
}

impl StoreError {
    pub(crate) fn backend(
        operation: &'static str,
        session_id: &str,
        source: redis::RedisError,
    ) -> Self {
        Self::Backend {
            operation,
            session_id: session_id.to_string(),
            source,
        }
    }

    pub(crate) fn codec(session_id: &str, source: serde_json::Error) -> Self {
        Self::Codec {
            session_id: session_id.to_string(),
            source,
        }
    }
}
