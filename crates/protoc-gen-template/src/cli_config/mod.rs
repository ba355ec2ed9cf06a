//! Plugin configuration for template search paths and logging.
//!
//! protoc passes nothing but the request on stdin, so anything beyond the
//! parameter string comes from this file or from flags when the plugin is run
//! through a wrapper script.

pub(crate) mod loader;

pub(crate) use loader::{expand_path, load_config};

use serde::Deserialize;

/// Contents of `.protoc-gen-template.toml`.
#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub(crate) struct PluginConfig {
    /// Directories searched for templates after the working directory.
    #[serde(default)]
    pub template_paths: Vec<String>,

    /// `tracing` filter directive used when `RUST_LOG` is not set.
    pub log_filter: Option<String>,
}
