use thiserror::Error;

/// Top-level error type for the `directadmin-api` crate.
///
/// Covers transport failures, panel-reported command failures, and the
/// panel's habit of answering API calls with an HTML page when something
/// goes wrong at the session level. `directadmin-core` maps these into
/// domain-appropriate variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Panel envelope ──────────────────────────────────────────────
    /// The response envelope carried a non-zero `error` field.
    #[error("{command} failed: {details} (error={code})")]
    CommandFailed {
        /// The `CMD_API_*` command that was invoked, without the prefix.
        command: String,
        /// The raw value of the `error` field.
        code: String,
        /// Human-readable detail from the `details`/`text` fields.
        details: String,
    },

    /// The panel answered with `text/html` instead of an API response.
    /// Typically a login page or a fatal error page.
    #[error("panel returned HTML to {method} {path}: {text}")]
    Html {
        method: String,
        path: String,
        /// Tag-stripped page text.
        text: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body could not be decoded, with the raw body for debugging.
    #[error("Decode error: {message}")]
    Decode { message: String, body: String },
}

impl Error {
    /// Returns `true` if the panel itself rejected the command, as opposed
    /// to a network or decoding failure.
    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }

    /// Returns `true` if this is a transient transport error worth retrying
    /// at a higher layer. The client itself never retries.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// The panel's error code, if this is a command failure.
    pub fn command_error_code(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { code, .. } => Some(code),
            _ => None,
        }
    }
}
