//! Tera-based template compilation and rendering.

use prost_types::FileDescriptorProto;
use tera::{Context, Tera};

use super::context::FileContext;
use super::filters;

/// Compiles template source once and renders it per input file.
pub trait TemplateEngine {
    /// Reusable compiled form of a template.
    type Template;

    /// Compile `source` under `name`. Syntax errors surface here.
    fn compile(&self, name: &str, source: &[u8]) -> Result<Self::Template, TemplateError>;

    /// Render a compiled template against one file descriptor.
    fn execute(
        &self,
        template: &Self::Template,
        file: &FileDescriptorProto,
    ) -> Result<String, TemplateError>;
}

impl<T: TemplateEngine + ?Sized> TemplateEngine for &T {
    type Template = T::Template;

    fn compile(&self, name: &str, source: &[u8]) -> Result<Self::Template, TemplateError> {
        (**self).compile(name, source)
    }

    fn execute(
        &self,
        template: &Self::Template,
        file: &FileDescriptorProto,
    ) -> Result<String, TemplateError> {
        (**self).execute(template, file)
    }
}

/// Template engine backed by Tera, with the custom filters registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeraEngine;

/// A parsed Tera template bound to its name.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    name: String,
    tera: Tera,
}

impl CompiledTemplate {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TemplateEngine for TeraEngine {
    type Template = CompiledTemplate;

    fn compile(&self, name: &str, source: &[u8]) -> Result<CompiledTemplate, TemplateError> {
        let source = std::str::from_utf8(source)?;

        let mut tera = Tera::default();
        // Generated code is never HTML; a template named `*.html` must not be escaped.
        tera.autoescape_on(Vec::new());
        filters::register(&mut tera);
        tera.add_raw_template(name, source)
            .map_err(|e| TemplateError::Syntax(error_chain(&e)))?;

        tracing::debug!(template = name, "Compiled template");
        Ok(CompiledTemplate {
            name: name.to_string(),
            tera,
        })
    }

    fn execute(
        &self,
        template: &CompiledTemplate,
        file: &FileDescriptorProto,
    ) -> Result<String, TemplateError> {
        let context = Context::from_serialize(FileContext::from_descriptor(file))
            .map_err(|e| TemplateError::Context(error_chain(&e)))?;
        template
            .tera
            .render(&template.name, &context)
            .map_err(|e| TemplateError::Render(error_chain(&e)))
    }
}

/// Flatten a Tera error and its causes into one message.
///
/// Tera's top-level message is usually just "Failed to render 'x'"; the useful
/// detail (missing variable, parse position) lives in the source chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template source is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("{0}")]
    Syntax(String),
    #[error("{0}")]
    Render(String),
    #[error("failed to build template context: {0}")]
    Context(String),
}
