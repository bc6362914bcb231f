//! Extraction Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. None of these escape a [`SystemExtractor::extract`]
//! call; they're folded into fallback entries there.
//!
//! [`SystemExtractor::extract`]: crate::SystemExtractor::extract

use derive_more::{Display, Error};

/// An extraction error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required field could not be found in the document.
    #[display("missing required field: {_0}")]
    MissingField(#[error(not(source))] &'static str),
    /// A field was found but could not be parsed.
    #[display("failed to parse field '{field}', found value: {value}")]
    ParseError {
        /// The field that failed to parse.
        field: &'static str,
        /// The offending value.
        value: String,
    },
    /// No extractor is registered for the game system.
    #[display("unsupported game system: {_0}")]
    UnsupportedSystem(#[error(not(source))] String),
    /// The extractor panicked; the message is whatever the panic carried.
    #[display("extractor panicked: {_0}")]
    Panicked(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A document either maps or it doesn't; re-reading it changes nothing.
        false
    }
}
