//! Error types for directory operations.
//!
//! Every failure a directory connection can report is normalized into [`Error`]. LDAP result
//! codes that callers commonly branch on get their own variants; everything else is carried as
//! [`Error::DirectoryError`] with the raw code and diagnostic text.

use thiserror::Error;

/// LDAP result code: `noSuchObject`.
pub const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: `invalidCredentials`.
pub const RC_INVALID_CREDENTIALS: u32 = 49;
/// LDAP result code: `entryAlreadyExists`.
pub const RC_ALREADY_EXISTS: u32 = 68;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Transport-level failure (connect, TLS, I/O, closed connection)
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Operation timed out
    #[error("Timeout waiting for directory: {0}")]
    Timeout(String),

    /// No connection has been bound to the component issuing the request
    #[error("No directory connection bound")]
    NotBound,

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A directory entry could not be interpreted
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// The connection answered with a response of the wrong shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Entry already exists (result code 68)
    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    /// Entry does not exist (result code 32)
    #[error("No such object: {0}")]
    NoSuchObject(String),

    /// Bind rejected (result code 49)
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Any other non-success result code
    #[error("Directory error (rc={code}): {message}")]
    DirectoryError {
        /// LDAP result code
        code: u32,
        /// Diagnostic message returned by the server
        message: String,
    },
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConnectionError(_) => "CONNECTION_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotBound => "NOT_BOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidEntry(_) => "INVALID_ENTRY",
            Self::UnexpectedResponse(_) => "UNEXPECTED_RESPONSE",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NoSuchObject(_) => "NO_SUCH_OBJECT",
            Self::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            Self::DirectoryError { .. } => "DIRECTORY_ERROR",
        }
    }

    /// Builds an error from a non-success LDAP result code and its diagnostic text.
    #[must_use]
    pub fn from_result_code(code: u32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            RC_NO_SUCH_OBJECT => Self::NoSuchObject(message),
            RC_INVALID_CREDENTIALS => Self::InvalidCredentials(message),
            RC_ALREADY_EXISTS => Self::AlreadyExists(message),
            _ => Self::DirectoryError { code, message },
        }
    }

    /// Returns true if this error points at infrastructure rather than at the request, and
    /// so deserves an operator-facing error event.
    #[must_use]
    pub const fn should_log(&self) -> bool {
        matches!(
            self,
            Self::ConfigError(_)
                | Self::ConnectionError(_)
                | Self::Timeout(_)
                | Self::NotBound
        )
    }
}

impl From<ldap3::LdapError> for Error {
    fn from(err: ldap3::LdapError) -> Self {
        match err {
            ldap3::LdapError::LdapResult { result } => {
                Self::from_result_code(result.rc, result.text)
            }
            other => Self::ConnectionError(other.to_string()),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::ConfigError(format!("invalid directory URL: {err}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(format!("Invalid configuration: {err}"))
    }
}
