//! Runtime template engine for user-supplied templates.
//!
//! Templates are Tera sources read through a [`TemplateSource`] and rendered
//! against a serializable view of each `FileDescriptorProto`. The
//! [`TemplateEngine`] trait keeps the generator independent of Tera so tests can
//! substitute their own engine.

mod context;
mod engine;
mod filters;
mod loader;

pub use context::FileContext;
pub use engine::{CompiledTemplate, TemplateEngine, TemplateError, TeraEngine};
pub use loader::{FsTemplateSource, TemplateSource};
