//! Action configuration errors.
//!
//! These are the only action failures that surface as `Err`: the command
//! issuer asked for something that can never work. Domain outcomes such as
//! an unreachable tile or missing AP finish the action instead.

use crate::env::OracleError;
use crate::error::{ErrorSeverity, GameError};
use crate::state::{Capabilities, EntityId, ItemId, PerkId};

use super::ActionKind;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// Owner lacks a capability the variant requires.
    #[error("{owner} cannot {kind}: requires {required:?}")]
    IncompatibleOwner {
        kind: ActionKind,
        owner: EntityId,
        required: Capabilities,
    },

    #[error("{kind} requires parameter `{parameter}`")]
    MissingParameter {
        kind: ActionKind,
        parameter: &'static str,
    },

    /// A command of one variant was handed to an action of another.
    #[error("{expected} received a {got} command")]
    ParameterMismatch {
        expected: ActionKind,
        got: ActionKind,
    },

    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("perk {0:?} is not in the catalog")]
    UnknownPerk(PerkId),

    #[error("item {0:?} is not in the catalog")]
    UnknownItem(ItemId),

    #[error("no factory registered for {0}")]
    UnregisteredKind(ActionKind),

    #[error("{owner} is currently forbidden to {kind}")]
    Forbidden { kind: ActionKind, owner: EntityId },

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl GameError for ActionError {
    fn severity(&self) -> ErrorSeverity {
        use ActionError::*;
        match self {
            IncompatibleOwner { .. } | MissingParameter { .. } | ParameterMismatch { .. } => {
                ErrorSeverity::Validation
            }
            UnknownEntity(_) | UnknownPerk(_) | UnknownItem(_) => ErrorSeverity::Validation,
            Forbidden { .. } => ErrorSeverity::Recoverable,
            UnregisteredKind(_) => ErrorSeverity::Internal,
            Oracle(e) => e.severity(),
        }
    }

    fn error_code(&self) -> &'static str {
        use ActionError::*;
        match self {
            IncompatibleOwner { .. } => "ACTION_INCOMPATIBLE_OWNER",
            MissingParameter { .. } => "ACTION_MISSING_PARAMETER",
            ParameterMismatch { .. } => "ACTION_PARAMETER_MISMATCH",
            UnknownEntity(_) => "ACTION_UNKNOWN_ENTITY",
            UnknownPerk(_) => "ACTION_UNKNOWN_PERK",
            UnknownItem(_) => "ACTION_UNKNOWN_ITEM",
            UnregisteredKind(_) => "ACTION_UNREGISTERED_KIND",
            Forbidden { .. } => "ACTION_FORBIDDEN",
            Oracle(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_is_recoverable() {
        let err = ActionError::Forbidden {
            kind: ActionKind::MoveTo,
            owner: EntityId(3),
        };
        assert!(err.severity().is_recoverable());
        assert_eq!(err.error_code(), "ACTION_FORBIDDEN");
        assert_eq!(err.to_string(), "#3 is currently forbidden to move_to");
    }

    #[test]
    fn oracle_errors_keep_their_code() {
        let err = ActionError::from(OracleError::PerksNotAvailable);
        assert_eq!(err.severity(), ErrorSeverity::Fatal);
        assert_eq!(err.error_code(), "ORACLE_PERKS_NOT_AVAILABLE");
    }
}
