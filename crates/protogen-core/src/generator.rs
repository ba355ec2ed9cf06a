//! Request orchestration.
//!
//! [`Generator`] turns one encoded `CodeGeneratorRequest` into one encoded
//! `CodeGeneratorResponse`:
//!
//! 1. decode the request
//! 2. select the template and options from the parameter string
//! 3. compile the template once
//! 4. resolve every requested file to its descriptor
//! 5. render (and optionally format) each file in request order
//!
//! Failures in steps 1 to 4 abort the invocation with a [`GeneratorError`] and no
//! response. A render or format failure in step 5 is reported in the response's
//! `error` field; any files already generated are dropped and the remaining
//! files are not processed.

use std::collections::HashMap;
use std::io::{Read, Write};

use prost::Message;
use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use prost_types::FileDescriptorProto;

use crate::error::{GeneratorError, GeneratorResult};
use crate::format::{FormatError, Formatter, GoFormatter};
use crate::parameters::parse_parameters;
use crate::template_engine::{TemplateEngine, TemplateError, TemplateSource, TeraEngine};

const PROTO_SUFFIX: &str = ".proto";

/// Output file name for an input file rendered by a template.
///
/// `foo/bar.proto` with template `grpc` becomes `foo/bar.pb.grpc.go`.
pub fn output_file_name(proto_name: &str, template_name: &str) -> String {
    let stem = proto_name.strip_suffix(PROTO_SUFFIX).unwrap_or(proto_name);
    format!("{stem}.pb.{template_name}.go")
}

/// Drives one plugin invocation.
///
/// The format flag is per instance: it is set while parsing the request
/// parameter and read while rendering that request's files.
#[derive(Debug)]
pub struct Generator<S, E = TeraEngine, F = GoFormatter> {
    source: S,
    engine: E,
    formatter: F,
    format_output: bool,
}

impl<S: TemplateSource> Generator<S> {
    /// A generator using Tera templates and the Go formatter.
    pub fn new(source: S) -> Self {
        Self {
            source,
            engine: TeraEngine,
            formatter: GoFormatter,
            format_output: false,
        }
    }
}

impl<S, E, F> Generator<S, E, F>
where
    S: TemplateSource,
    E: TemplateEngine,
    F: Formatter,
{
    /// Replace the template engine.
    pub fn with_engine<E2: TemplateEngine>(self, engine: E2) -> Generator<S, E2, F> {
        Generator {
            source: self.source,
            engine,
            formatter: self.formatter,
            format_output: self.format_output,
        }
    }

    /// Replace the post-processing formatter.
    pub fn with_formatter<F2: Formatter>(self, formatter: F2) -> Generator<S, E, F2> {
        Generator {
            source: self.source,
            engine: self.engine,
            formatter,
            format_output: self.format_output,
        }
    }

    /// Whether the last parsed parameter enabled formatting.
    pub fn format_output(&self) -> bool {
        self.format_output
    }

    /// Read a whole request from `input` and write the whole response to `output`.
    ///
    /// Nothing is written when the invocation fails.
    pub fn run_io<R: Read, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> GeneratorResult<()> {
        let mut request = Vec::new();
        input
            .read_to_end(&mut request)
            .map_err(GeneratorError::Read)?;

        let response = self.run(&request)?;

        output
            .write_all(&response)
            .and_then(|()| output.flush())
            .map_err(GeneratorError::Write)
    }

    /// Decode a request, generate, and encode the response.
    pub fn run(&mut self, request: &[u8]) -> GeneratorResult<Vec<u8>> {
        let request = CodeGeneratorRequest::decode(request)?;
        let response = self.generate(&request)?;
        Ok(response.encode_to_vec())
    }

    /// Generate the response for an already-decoded request.
    pub fn generate(
        &mut self,
        request: &CodeGeneratorRequest,
    ) -> GeneratorResult<CodeGeneratorResponse> {
        let parameter = request.parameter();
        let parameters = parse_parameters(parameter, &self.source);
        self.format_output = parameters.options.format;

        let selected = parameters
            .template
            .ok_or_else(|| GeneratorError::no_template(parameter))?;
        let template = self
            .engine
            .compile(&selected.name, &selected.source)
            .map_err(|source| GeneratorError::Compile {
                template: selected.name.clone(),
                source,
            })?;

        let proto_files: HashMap<&str, &FileDescriptorProto> = request
            .proto_file
            .iter()
            .map(|file| (file.name(), file))
            .collect();

        let mut targets = Vec::with_capacity(request.file_to_generate.len());
        for file_name in &request.file_to_generate {
            if file_name.is_empty() {
                tracing::debug!("Skipping empty file_to_generate entry");
                continue;
            }
            let descriptor = proto_files
                .get(file_name.as_str())
                .ok_or_else(|| GeneratorError::missing_descriptor(file_name))?;
            targets.push(*descriptor);
        }

        let mut response = CodeGeneratorResponse {
            supported_features: Some(Feature::Proto3Optional as u64),
            ..Default::default()
        };

        for descriptor in targets {
            match self.render_file(&template, &selected.name, descriptor) {
                Ok(file) => response.file.push(file),
                Err(e) => {
                    tracing::warn!(
                        file = descriptor.name(),
                        template = %selected.name,
                        error = %e,
                        "Generation failed, discarding batch"
                    );
                    response.file.clear();
                    response.error = Some(e.to_string());
                    break;
                }
            }
        }

        tracing::info!(
            template = %selected.name,
            files = response.file.len(),
            format = self.format_output,
            failed = response.error.is_some(),
            "Generation finished"
        );
        Ok(response)
    }

    fn render_file(
        &self,
        template: &E::Template,
        template_name: &str,
        descriptor: &FileDescriptorProto,
    ) -> Result<File, FileError> {
        let rendered = self.engine.execute(template, descriptor)?;
        let content = if self.format_output {
            self.formatter.format(&rendered)?
        } else {
            rendered
        };

        Ok(File {
            name: Some(output_file_name(descriptor.name(), template_name)),
            content: Some(content),
            ..Default::default()
        })
    }
}

/// Per-file failure, reported in the response rather than returned.
#[derive(Debug, thiserror::Error)]
enum FileError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Format(#[from] FormatError),
}
