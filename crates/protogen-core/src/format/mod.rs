//! Post-processing of rendered output.
//!
//! A [`Formatter`] validates rendered text as source in the target language and
//! returns it in canonical layout. A template bug that produces malformed source
//! is caught here instead of being written out.

mod go;
mod layout;
mod syntax;

pub use go::GoFormatter;

/// Validates and normalizes rendered source.
pub trait Formatter {
    fn format(&self, source: &str) -> Result<String, FormatError>;
}

impl<T: Formatter + ?Sized> Formatter for &T {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        (**self).format(source)
    }
}

/// A positioned syntax error in rendered source (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{line}:{column}: {message}")]
pub struct FormatError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl FormatError {
    pub(crate) fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}
