use thiserror::Error;

/// A parse/validation failure: bad candidate, missing attribute. Always
/// recoverable by the caller (skip the candidate, abort the session).
///
/// Contract violations (duplicate channel name, destroy of an unknown
/// channel, wrong-thread calls) are the other failure category spec.md §7
/// describes, but per that section they are programming errors that fail
/// loudly via `debug_assert!` rather than values returned to the caller, so
/// they have no representation here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
