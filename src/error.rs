//! The public error type.
//!
//! Internally we use `anyhow` everywhere (`Res`). When an error crosses the public API boundary it
//! is tagged with an `ErrorType` so that callers can react to the category of failure (e.g. prompt
//! for sign-in on `NotAuthenticated`) without parsing messages.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;
pub type Result<T> = std::result::Result<T, Error>;

/// The category of a failure.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The consent flow was cancelled or the identity provider returned an error.
    Auth,
    /// The profile endpoint rejected the token or could not be reached.
    ProfileFetch,
    /// No bearer token was available when a remote call was attempted.
    NotAuthenticated,
    /// No spreadsheet has been bound yet.
    NoSheetConfigured,
    /// The spreadsheet provider rejected a read.
    RemoteRead,
    /// The spreadsheet provider rejected a write.
    RemoteWrite,
    /// Local, pre-flight validation failed. Never reaches the network.
    Validation,
    /// The configuration directory or its files are missing or invalid.
    Config,
    /// The local cache could not be read or written.
    Cache,
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// An error with an `ErrorType` and the full `anyhow` context chain.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Creates an error from a plain message.
    pub fn msg(error_type: ErrorType, message: impl Display + Debug + Send + Sync + 'static) -> Self {
        Self::new(error_type, anyhow::Error::msg(message))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn is(&self, error_type: ErrorType) -> bool {
        self.error_type == error_type
    }

    /// Wraps `e` with `error_type` unless `e` already is an `Error`, in which case its original
    /// type wins.
    fn tag(error_type: ErrorType, e: anyhow::Error) -> Self {
        match e.downcast::<Error>() {
            Ok(already) => already,
            Err(inner) => Self { error_type, inner },
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Converts an internal `Res` into a public `Result`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for Res<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::tag(error_type, e))
    }
}

/// The result of an operation whose primary effect succeeded and which also attempted a secondary
/// effect that is allowed to fail, e.g. revoking a token on sign-out. A failed secondary effect
/// has already been logged; it is carried here so that callers can report it.
#[derive(Debug)]
pub struct BestEffort<T> {
    value: T,
    side_error: Option<Error>,
}

impl<T> BestEffort<T> {
    pub fn complete(value: T) -> Self {
        Self {
            value,
            side_error: None,
        }
    }

    pub fn partial(value: T, side_error: Error) -> Self {
        Self {
            value,
            side_error: Some(side_error),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    /// The failure of the secondary effect, if it failed.
    pub fn side_error(&self) -> Option<&Error> {
        self.side_error.as_ref()
    }

    /// True if the secondary effect also succeeded.
    pub fn is_complete(&self) -> bool {
        self.side_error.is_none()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BestEffort<U> {
        BestEffort {
            value: f(self.value),
            side_error: self.side_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_best_effort() {
        let done = BestEffort::complete(3);
        assert!(done.is_complete());
        let partial = BestEffort::partial(3, Error::msg(ErrorType::RemoteWrite, "nope"));
        assert!(!partial.is_complete());
        let mapped = partial.map(|n| n * 2);
        assert_eq!(*mapped.value(), 6);
        assert!(mapped.side_error().unwrap().is(ErrorType::RemoteWrite));
    }

    #[test]
    fn test_pub_result_tags_plain_errors() {
        let res: Res<()> = Err::<(), _>(anyhow::anyhow!("boom")).context("while writing");
        let err = res.pub_result(ErrorType::RemoteWrite).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::RemoteWrite);
        assert_eq!(err.to_string(), "while writing: boom");
    }

    #[test]
    fn test_pub_result_keeps_existing_type() {
        let inner = Error::msg(ErrorType::NotAuthenticated, "no token");
        let res: Res<()> = Err(anyhow::Error::from(inner));
        let err = res.pub_result(ErrorType::RemoteRead).unwrap_err();
        assert!(err.is(ErrorType::NotAuthenticated));
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::NoSheetConfigured.to_string(), "no_sheet_configured");
        assert_eq!(
            "remote_write".parse::<ErrorType>().unwrap(),
            ErrorType::RemoteWrite
        );
    }
}
