//! Go source validation and layout normalization.

use super::layout::layout;
use super::syntax::{self, Token, TokenClass};
use super::{FormatError, Formatter};

/// Formats rendered text as Go source.
///
/// The input is trimmed and parsed with the tree-sitter Go grammar. It must
/// start with a package clause and parse without errors; the first syntax
/// error is reported with its position. The layout is then rebuilt the way
/// gofmt prints it: tab indentation by block nesting, canonical spacing
/// between tokens, aligned columns for struct fields, keyed values and grouped
/// specs, no repeated blank lines, and a single trailing newline. Multi-line
/// raw strings and block comments are left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoFormatter;

impl Formatter for GoFormatter {
    fn format(&self, source: &str) -> Result<String, FormatError> {
        let source = source.trim();
        let parsed = syntax::parse(source)?;

        check_package_clause(&parsed.tokens, eof_position(source))?;
        if let Some(error) = parsed.error {
            tracing::debug!(%error, "Rendered output is not valid Go");
            return Err(error);
        }

        Ok(layout(&parsed.tokens))
    }
}

fn eof_position(source: &str) -> (usize, usize) {
    let line = source.matches('\n').count() + 1;
    let last = source.rsplit('\n').next().unwrap_or("");
    (line, last.chars().count() + 1)
}

fn describe(token: Option<&Token<'_>>) -> String {
    match token {
        Some(t) => format!("'{}'", t.text),
        None => "'EOF'".to_string(),
    }
}

fn error_at(token: Option<&Token<'_>>, eof: (usize, usize), message: String) -> FormatError {
    let (line, column) = token.map_or(eof, |t| (t.row + 1, t.column));
    FormatError::new(line, column, message)
}

fn check_package_clause(tokens: &[Token<'_>], eof: (usize, usize)) -> Result<(), FormatError> {
    let mut significant = tokens.iter().filter(|t| t.class != TokenClass::Comment);

    let keyword = significant.next();
    if !keyword.is_some_and(|t| t.is_keyword("package")) {
        return Err(error_at(
            keyword,
            eof,
            format!("expected 'package', found {}", describe(keyword)),
        ));
    }

    let name = match significant.next() {
        Some(t) if t.class == TokenClass::Word => t,
        other => {
            return Err(error_at(
                other,
                eof,
                format!("expected package name, found {}", describe(other)),
            ))
        }
    };
    if name.text == "_" {
        return Err(error_at(Some(name), eof, "invalid package name _".to_string()));
    }

    match significant.next() {
        Some(next) if next.row == name.row && !next.is_punct(";") => Err(error_at(
            Some(next),
            eof,
            format!("expected ';', found {}", describe(Some(next))),
        )),
        _ => Ok(()),
    }
}
