use crate::error::{ErrorSeverity, GameError};

/// A collaborator the caller did not provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OracleError {
    #[error("item catalog not available")]
    ItemsNotAvailable,

    #[error("perk catalog not available")]
    PerksNotAvailable,

    #[error("decision scripts not available")]
    ScriptsNotAvailable,
}

impl GameError for OracleError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ItemsNotAvailable => "ORACLE_ITEMS_NOT_AVAILABLE",
            Self::PerksNotAvailable => "ORACLE_PERKS_NOT_AVAILABLE",
            Self::ScriptsNotAvailable => "ORACLE_SCRIPTS_NOT_AVAILABLE",
        }
    }
}
