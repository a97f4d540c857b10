// Core error types
//
// Wraps the transport-level `directadmin_api::Error` and adds the
// invariant failures only this layer can detect: privilege mismatches at
// context construction and locally-observed consistency violations.

use thiserror::Error;

use crate::model::AccountType;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport or panel-reported failure, surfaced unchanged.
    #[error(transparent)]
    Api(#[from] directadmin_api::Error),

    /// A validated context found the acting account's tier differs from
    /// the declared one. Fatal to context construction.
    #[error("privilege mismatch: context requires {expected}, account is {actual}")]
    PrivilegeMismatch {
        expected: AccountType,
        actual: AccountType,
    },

    /// A locally-observed invariant violation, e.g. a domain whose owner
    /// does not match the acting user. Never silently recovered.
    #[error("consistency error: {message}")]
    Consistency { message: String },

    /// The panel reported a `usertype` outside user/reseller/admin.
    #[error("unknown account type '{0}'")]
    UnknownAccountType(String),

    /// A response was missing a key the operation requires.
    #[error("{command} response is missing '{key}'")]
    MissingValue { command: String, key: String },
}

impl Error {
    pub(crate) fn consistency(message: impl Into<String>) -> Self {
        Self::Consistency {
            message: message.into(),
        }
    }

    pub(crate) fn missing(command: &str, key: &str) -> Self {
        Self::MissingValue {
            command: command.to_owned(),
            key: key.to_owned(),
        }
    }

    /// Returns `true` if the panel rejected a command (as opposed to a
    /// transport failure or a local invariant violation).
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_command_failure())
    }
}
