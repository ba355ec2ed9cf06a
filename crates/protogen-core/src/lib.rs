//! Template-driven code generation for `protoc`.
//!
//! This crate holds the request pipeline behind the `protoc-gen-template` plugin:
//! it decodes a `CodeGeneratorRequest`, selects a template from the plugin
//! parameter, renders it once per requested `.proto` file, optionally formats the
//! result as Go source, and encodes a `CodeGeneratorResponse`.
//!
//! # Modules
//!
//! - [`parameters`]: Plugin parameter parsing (template selection and option flags)
//! - [`template_engine`]: Tera-based template compilation, rendering and template sources
//! - [`format`]: Go source validation and layout normalization
//! - [`generator`]: Request orchestration and response assembly
//! - [`error`]: Invocation-level error types

pub mod error;
pub mod format;
pub mod generator;
pub mod parameters;
pub mod template_engine;

pub use error::{GeneratorError, GeneratorResult};
pub use format::{FormatError, Formatter, GoFormatter};
pub use generator::{output_file_name, Generator};
pub use parameters::{parse_parameters, GenerateOptions, Parameters, SelectedTemplate};
pub use template_engine::{
    FsTemplateSource, TemplateEngine, TemplateError, TemplateSource, TeraEngine,
};
