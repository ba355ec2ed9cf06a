//! Plugin parameter parsing.
//!
//! protoc hands the plugin a single `--template_opt` string. It is split on
//! commas and processed left to right:
//!
//! - `format` enables Go source formatting of the rendered output, wherever it
//!   appears in the list.
//! - Any other token names a template. The first one that can be read selects
//!   the template; later candidates are never read.
//!
//! A candidate `foo` or `foo.tmpl` is looked up as `foo` first and `foo.tmpl`
//! second. The template's display name is the last path component without the
//! `.tmpl` suffix.

use std::path::Path;

use crate::template_engine::TemplateSource;

/// Option token enabling Go source formatting.
pub const FORMAT_OPTION: &str = "format";

/// Conventional template file suffix, optional in the parameter.
pub const TEMPLATE_SUFFIX: &str = ".tmpl";

const PARAMETER_DELIMITER: char = ',';

/// The template chosen by the parameter string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedTemplate {
    /// Display name used in output file names (`test.pb.<name>.go`).
    pub name: String,
    /// The name the source was actually read from.
    pub path: String,
    /// Raw template source.
    pub source: Vec<u8>,
}

/// Boolean options applied by flag tokens.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Run the Go formatter over each rendered file.
    pub format: bool,
}

/// Result of parsing the parameter string.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Parameters {
    /// `None` when no candidate token could be read.
    pub template: Option<SelectedTemplate>,
    pub options: GenerateOptions,
}

/// Parse a comma-separated plugin parameter string.
pub fn parse_parameters<S: TemplateSource + ?Sized>(parameter: &str, source: &S) -> Parameters {
    let mut parameters = Parameters::default();

    for token in parameter.split(PARAMETER_DELIMITER) {
        match token {
            FORMAT_OPTION => parameters.options.format = true,
            "" => {}
            candidate => {
                if parameters.template.is_some() {
                    tracing::debug!(token = candidate, "Template already selected, ignoring");
                    continue;
                }
                parameters.template = resolve_template(candidate, source);
            }
        }
    }

    parameters
}

fn resolve_template<S: TemplateSource + ?Sized>(
    candidate: &str,
    source: &S,
) -> Option<SelectedTemplate> {
    let stem = candidate.strip_suffix(TEMPLATE_SUFFIX).unwrap_or(candidate);
    let with_suffix = format!("{stem}{TEMPLATE_SUFFIX}");

    for path in [stem, with_suffix.as_str()] {
        match source.read_template(path) {
            Ok(bytes) => {
                let name = display_name(stem);
                tracing::debug!(template = %name, path, "Selected template");
                return Some(SelectedTemplate {
                    name,
                    path: path.to_string(),
                    source: bytes,
                });
            }
            Err(e) => {
                tracing::debug!(path, error = %e, "Template candidate not readable");
            }
        }
    }
    None
}

fn display_name(stem: &str) -> String {
    Path::new(stem)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn templates() -> HashMap<String, Vec<u8>> {
        [
            ("broken.tmpl", "bad syntax, unfinished braces {{"),
            ("package", "package {{ package }}"),
            ("unknown", "hello {{ foo }}"),
            ("templates/service.tmpl", "{{ name }}"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect()
    }

    #[test]
    fn test_empty_parameter_selects_nothing() {
        let params = parse_parameters("", &templates());
        assert_eq!(params.template, None);
        assert!(!params.options.format);
    }

    #[test]
    fn test_literal_name() {
        let params = parse_parameters("package", &templates());
        let selected = params.template.unwrap();
        assert_eq!(selected.name, "package");
        assert_eq!(selected.path, "package");
        assert_eq!(selected.source, b"package {{ package }}");
    }

    #[test]
    fn test_suffix_is_stripped_before_lookup() {
        let selected = parse_parameters("package.tmpl", &templates())
            .template
            .unwrap();
        assert_eq!(selected.name, "package");
        assert_eq!(selected.path, "package");
    }

    #[test]
    fn test_suffix_appended_as_fallback() {
        let selected = parse_parameters("broken", &templates()).template.unwrap();
        assert_eq!(selected.name, "broken");
        assert_eq!(selected.path, "broken.tmpl");
    }

    #[test]
    fn test_display_name_is_base_component() {
        let selected = parse_parameters("templates/service", &templates())
            .template
            .unwrap();
        assert_eq!(selected.name, "service");
        assert_eq!(selected.path, "templates/service.tmpl");
    }

    #[test]
    fn test_first_resolvable_candidate_wins() {
        let params = parse_parameters("missing,unknown,package", &templates());
        assert_eq!(params.template.unwrap().name, "unknown");
    }

    #[test]
    fn test_format_flag_applies_in_any_position() {
        for parameter in ["format,package", "package,format", "package,broken,format"] {
            let params = parse_parameters(parameter, &templates());
            assert!(params.options.format, "{parameter}");
            assert_eq!(params.template.unwrap().name, "package", "{parameter}");
        }
    }

    #[test]
    fn test_format_alone_selects_nothing() {
        let params = parse_parameters("format", &templates());
        assert!(params.options.format);
        assert_eq!(params.template, None);
    }

    #[test]
    fn test_unresolvable_tokens_are_ignored() {
        let params = parse_parameters("nope,,also-nope", &templates());
        assert_eq!(params.template, None);
        assert!(!params.options.format);
    }

    /// Counts reads so later candidates can be shown to be skipped.
    struct CountingSource {
        inner: HashMap<String, Vec<u8>>,
        reads: std::cell::RefCell<Vec<String>>,
    }

    impl TemplateSource for CountingSource {
        fn read_template(&self, name: &str) -> std::io::Result<Vec<u8>> {
            self.reads.borrow_mut().push(name.to_string());
            self.inner.read_template(name)
        }
    }

    #[test]
    fn test_later_candidates_are_not_read() {
        let source = CountingSource {
            inner: templates(),
            reads: Default::default(),
        };
        let params = parse_parameters("package,unknown,format", &source);
        assert_eq!(params.template.unwrap().name, "package");
        assert_eq!(*source.reads.borrow(), vec!["package".to_string()]);
    }
}
