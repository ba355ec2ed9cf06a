//! # Generator Error Types
//!
//! Errors that abort a whole plugin invocation. Template execution and format
//! failures are not errors at this level; they are reported inside the
//! `CodeGeneratorResponse` instead.

use thiserror::Error;

use crate::template_engine::TemplateError;

/// Generator operation result type
pub type GeneratorResult<T> = Result<T, GeneratorError>;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("error reading input: {0}")]
    Read(#[source] std::io::Error),

    #[error("error parsing input: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("no template files in the parameters {parameter:?}")]
    NoTemplate { parameter: String },

    #[error("error parsing template {template}: {source}")]
    Compile {
        template: String,
        source: TemplateError,
    },

    #[error("{file} descriptor not found")]
    MissingDescriptor { file: String },

    #[error("error writing output: {0}")]
    Write(#[source] std::io::Error),
}

impl GeneratorError {
    pub fn no_template(parameter: impl Into<String>) -> Self {
        Self::NoTemplate {
            parameter: parameter.into(),
        }
    }

    pub fn missing_descriptor(file: impl Into<String>) -> Self {
        Self::MissingDescriptor { file: file.into() }
    }
}
