//! Template source readers.
//!
//! A [`TemplateSource`] fetches raw template bytes by name. Any error is treated
//! as "not found" by parameter resolution, which then falls back to the next
//! candidate name.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Reads template source bytes by name.
pub trait TemplateSource {
    /// Read the template called `name`.
    fn read_template(&self, name: &str) -> io::Result<Vec<u8>>;
}

impl<T: TemplateSource + ?Sized> TemplateSource for &T {
    fn read_template(&self, name: &str) -> io::Result<Vec<u8>> {
        (**self).read_template(name)
    }
}

/// In-memory templates keyed by name.
impl TemplateSource for HashMap<String, Vec<u8>> {
    fn read_template(&self, name: &str) -> io::Result<Vec<u8>> {
        self.get(name).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("template '{name}' not found"),
            )
        })
    }
}

/// Reads templates from the filesystem.
///
/// Relative names are tried against the working directory first, then against
/// each search path in order. Absolute names are read as-is.
#[derive(Debug, Clone, Default)]
pub struct FsTemplateSource {
    search_paths: Vec<PathBuf>,
}

impl FsTemplateSource {
    /// A source that only resolves names relative to the working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source with additional directories searched after the working directory.
    pub fn with_search_paths(search_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_paths: search_paths.into_iter().collect(),
        }
    }

    /// Configured search directories, in lookup order.
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let path = Path::new(name);
        if path.is_absolute() {
            return vec![path.to_path_buf()];
        }
        std::iter::once(path.to_path_buf())
            .chain(self.search_paths.iter().map(|dir| dir.join(path)))
            .collect()
    }
}

impl TemplateSource for FsTemplateSource {
    fn read_template(&self, name: &str) -> io::Result<Vec<u8>> {
        if name.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty template name",
            ));
        }

        let mut last_err = None;
        for candidate in self.candidates(name) {
            match std::fs::read(&candidate) {
                Ok(bytes) => {
                    tracing::debug!(path = %candidate.display(), "Read template source");
                    return Ok(bytes);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::NotFound)))
    }
}
