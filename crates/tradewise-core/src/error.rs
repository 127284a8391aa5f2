// Engine error taxonomy.
//
// Degraded inputs never surface here: missing prices, baselines, and player
// values fall back to zero contributions inside the engine. These errors
// cover requests the engine cannot interpret at all.

use thiserror::Error;

/// What kind of entity a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    League,
    Team,
    Player,
    Proposal,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntityKind::League => "league",
            EntityKind::Team => "team",
            EntityKind::Player => "player",
            EntityKind::Proposal => "proposal",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("malformed request: {message}")]
    Malformed { message: String },

    #[error("invalid proposal status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("repository error: {0:#}")]
    Repository(#[from] anyhow::Error),
}

impl EngineError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        EngineError::Malformed {
            message: message.into(),
        }
    }

    /// Whether the caller should report this as a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::Repository(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = EngineError::not_found(EntityKind::Team, "team_9");
        assert_eq!(err.to_string(), "team not found: team_9");
        assert!(err.is_client_error());
    }

    #[test]
    fn repository_errors_are_server_side() {
        let err: EngineError = anyhow::anyhow!("disk full").into();
        assert!(!err.is_client_error());
        assert!(err.to_string().contains("disk full"));
    }
}
