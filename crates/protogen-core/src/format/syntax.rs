//! Go parsing for the formatter, backed by tree-sitter.
//!
//! The parse tree is flattened into tokens: leaves, with string literals and
//! comments kept whole. Each token carries what the layout pass needs to print
//! it without the tree: its syntactic context, whether a binary operator is
//! printed without blanks, and where alignment cells begin.

use std::collections::{HashMap, HashSet};

use tree_sitter::{Node, Parser};

use super::FormatError;

const ATOMIC_KINDS: &[&str] = &[
    "interpreted_string_literal",
    "raw_string_literal",
    "rune_literal",
    "comment",
];

const LITERAL_KINDS: &[&str] = &[
    "interpreted_string_literal",
    "raw_string_literal",
    "rune_literal",
    "int_literal",
    "float_literal",
    "imaginary_literal",
];

const TOP_LEVEL_KINDS: &[&str] = &[
    "package_clause",
    "import_declaration",
    "function_declaration",
    "method_declaration",
    "type_declaration",
    "const_declaration",
    "var_declaration",
    "comment",
];

// Operator parents in which the operator takes a single operand.
const UNARY_PARENTS: &[&str] = &[
    "unary_expression",
    "pointer_type",
    "channel_type",
    "negated_type",
];

const PUNCTUATION: &[&str] = &[",", ";", ":", ".", "...", "++", "--"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delim {
    Paren,
    Bracket,
    Brace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenClass {
    Word,
    Literal,
    Keyword,
    Operator,
    Comment,
    Open(Delim),
    Close(Delim),
}

#[derive(Debug, Clone)]
pub(crate) struct Token<'s> {
    pub text: &'s str,
    pub class: TokenClass,
    /// Kind of the enclosing node.
    pub parent: &'static str,
    pub grandparent: &'static str,
    pub parent_id: usize,
    /// 0-based rows of the first and last character.
    pub row: usize,
    pub end_row: usize,
    /// 1-based column in characters.
    pub column: usize,
    /// The enclosing node fits on one row.
    pub single_row_parent: bool,
    /// Binary operator printed without surrounding blanks.
    pub compact: bool,
    /// Alignment group, when a column cell starts at this token.
    pub cell: Option<usize>,
}

impl Token<'_> {
    pub(crate) fn is(&self, class: TokenClass, text: &str) -> bool {
        self.class == class && self.text == text
    }

    pub(crate) fn is_keyword(&self, text: &str) -> bool {
        self.is(TokenClass::Keyword, text)
    }

    pub(crate) fn is_punct(&self, text: &str) -> bool {
        self.is(TokenClass::Operator, text)
    }

    pub(crate) fn is_binary(&self) -> bool {
        self.class == TokenClass::Operator
            && !PUNCTUATION.contains(&self.text)
            && !UNARY_PARENTS.contains(&self.parent)
    }

    pub(crate) fn is_unary(&self) -> bool {
        self.class == TokenClass::Operator
            && !PUNCTUATION.contains(&self.text)
            && UNARY_PARENTS.contains(&self.parent)
    }
}

/// Tokens of a parsed source plus the first syntax error, if any.
#[derive(Debug)]
pub(crate) struct ParsedSource<'s> {
    pub tokens: Vec<Token<'s>>,
    pub error: Option<FormatError>,
}

pub(crate) fn parse(source: &str) -> Result<ParsedSource<'_>, FormatError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .map_err(|e| FormatError::new(1, 1, format!("Go grammar unavailable: {e}")))?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| FormatError::new(1, 1, "Go parser produced no tree"))?;
    let root = tree.root_node();

    let error = if root.has_error() {
        first_error(root, source)
    } else {
        top_level_error(root, source)
    };

    let mut notes = Annotations::default();
    notes.visit(root, 1);

    let mut tokens = Vec::new();
    collect_tokens(root, None, "", source, &notes, &mut tokens);
    tracing::trace!(tokens = tokens.len(), has_error = error.is_some(), "Parsed Go source");
    Ok(ParsedSource { tokens, error })
}

fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn text_of<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

/// 1-based character column of a byte offset.
pub(crate) fn char_column(source: &str, byte: usize) -> usize {
    let before = source.get(..byte).unwrap_or("");
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    before[line_start..].chars().count() + 1
}

fn error_at(node: Node<'_>, source: &str, message: String) -> FormatError {
    FormatError::new(
        node.start_position().row + 1,
        char_column(source, node.start_byte()),
        message,
    )
}

fn describe(text: &str) -> String {
    match text.lines().next() {
        Some(first) if !first.is_empty() => format!("'{first}'"),
        _ => "'EOF'".to_string(),
    }
}

/// First `ERROR` or `MISSING` node in document order.
fn first_error(node: Node<'_>, source: &str) -> Option<FormatError> {
    if node.is_missing() {
        return Some(error_at(node, source, format!("expected '{}'", node.kind())));
    }
    if node.is_error() {
        let mut leaf = node;
        while let Some(child) = children(leaf).first().copied() {
            leaf = child;
        }
        let found = describe(text_of(leaf, source));
        return Some(error_at(node, source, format!("syntax error: unexpected {found}")));
    }
    if !node.has_error() {
        return None;
    }
    children(node)
        .into_iter()
        .find_map(|child| first_error(child, source))
}

/// The grammar accepts statements at the top level and imports anywhere; Go
/// does not.
fn top_level_error(root: Node<'_>, source: &str) -> Option<FormatError> {
    let mut past_imports = false;
    for child in children(root) {
        let kind = child.kind();
        if !child.is_named() || kind == "comment" || kind == "package_clause" {
            continue;
        }
        let misplaced = match kind {
            "import_declaration" => past_imports,
            _ => !TOP_LEVEL_KINDS.contains(&kind),
        };
        if misplaced {
            let found = describe(text_of(child, source).split_whitespace().next().unwrap_or(""));
            return Some(error_at(child, source, format!("expected declaration, found {found}")));
        }
        past_imports |= kind != "import_declaration";
    }
    None
}

fn classify(node: Node<'_>) -> TokenClass {
    let kind = node.kind();
    if kind == "comment" {
        TokenClass::Comment
    } else if node.is_named() {
        if LITERAL_KINDS.contains(&kind) {
            TokenClass::Literal
        } else {
            TokenClass::Word
        }
    } else {
        match kind {
            "(" => TokenClass::Open(Delim::Paren),
            "[" => TokenClass::Open(Delim::Bracket),
            "{" => TokenClass::Open(Delim::Brace),
            ")" => TokenClass::Close(Delim::Paren),
            "]" => TokenClass::Close(Delim::Bracket),
            "}" => TokenClass::Close(Delim::Brace),
            k if k.chars().all(|c| c.is_ascii_alphabetic()) => TokenClass::Keyword,
            _ => TokenClass::Operator,
        }
    }
}

fn collect_tokens<'t, 's>(
    node: Node<'t>,
    parent: Option<Node<'t>>,
    grandparent: &'static str,
    source: &'s str,
    notes: &Annotations,
    out: &mut Vec<Token<'s>>,
) {
    if node.child_count() > 0 && !ATOMIC_KINDS.contains(&node.kind()) {
        let kind = parent.map_or("", |p| p.kind());
        for child in children(node) {
            collect_tokens(child, Some(node), kind, source, notes, out);
        }
        return;
    }

    let text = text_of(node, source);
    // Newline terminators and zero-width missing nodes print nothing.
    if text.trim().is_empty() || text == "\0" {
        return;
    }

    let start = node.start_byte();
    out.push(Token {
        text,
        class: classify(node),
        parent: parent.map_or("", |p| p.kind()),
        grandparent,
        parent_id: parent.map_or(0, |p| p.id()),
        row: node.start_position().row,
        end_row: node.end_position().row,
        column: char_column(source, start),
        single_row_parent: parent
            .is_none_or(|p| p.start_position().row == p.end_position().row),
        compact: notes.compact.contains(&start),
        cell: notes.cells.get(&start).copied(),
    });
}

/// Go operator precedence, 1 (`||`) through 5 (multiplicative).
fn precedence(op: &str) -> usize {
    match op {
        "||" => 1,
        "&&" => 2,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "+" | "-" | "|" | "^" => 4,
        "*" | "/" | "%" | "<<" | ">>" | "&" | "&^" => 5,
        _ => 0,
    }
}

fn operator(node: Node<'_>) -> &'static str {
    node.child_by_field_name("operator").map_or("", |op| op.kind())
}

/// Whether an operand sits at a different precedence level than its parent.
fn diff_prec(operand: Node<'_>, prec: usize) -> usize {
    if operand.kind() == "binary_expression" && precedence(operator(operand)) == prec {
        0
    } else {
        1
    }
}

/// Precedence levels present in a binary expression chain, and the highest
/// level at which dropping blanks would glue two operators together.
fn walk_binary(node: Node<'_>) -> (bool, bool, usize) {
    let prec = precedence(operator(node));
    let mut has4 = prec == 4;
    let mut has5 = prec == 5;
    let mut max_problem = 0;

    let mut merge = |(h4, h5, mp): (bool, bool, usize)| {
        has4 |= h4;
        has5 |= h5;
        max_problem = max_problem.max(mp);
    };

    if let Some(left) = node.child_by_field_name("left") {
        if left.kind() == "binary_expression" && precedence(operator(left)) >= prec {
            merge(walk_binary(left));
        }
    }
    if let Some(right) = node.child_by_field_name("right") {
        match right.kind() {
            "binary_expression" if precedence(operator(right)) > prec => merge(walk_binary(right)),
            "unary_expression" => match (operator(node), operator(right)) {
                ("/", "*") | ("&", "&") | ("&", "^") => merge((false, false, 5)),
                ("+", "+") | ("-", "-") => merge((false, false, 4)),
                _ => {}
            },
            _ => {}
        }
    }
    (has4, has5, max_problem)
}

/// Operators at or above the cutoff precedence are printed without blanks.
fn cutoff(node: Node<'_>, depth: usize) -> usize {
    let (has4, has5, max_problem) = walk_binary(node);
    if max_problem > 0 {
        return max_problem + 1;
    }
    match (has4 && has5, depth == 1) {
        (true, true) => 5,
        (true, false) => 4,
        (false, true) => 6,
        (false, false) => 4,
    }
}

fn resets_depth(kind: &str) -> bool {
    kind == "block"
        || kind == "source_file"
        || kind.ends_with("_statement")
        || kind.ends_with("_declaration")
        || kind.ends_with("_spec")
        || kind.ends_with("_case")
}

fn named_count(node: Option<Node<'_>>) -> usize {
    node.map_or(0, |n| {
        children(n)
            .iter()
            .filter(|c| c.is_named() && c.kind() != "comment")
            .count()
    })
}

/// Layout facts computed from the tree, keyed by token start byte.
#[derive(Debug, Default)]
struct Annotations {
    compact: HashSet<usize>,
    cells: HashMap<usize, usize>,
}

impl Annotations {
    /// `depth` grows inside index expressions and multi-argument calls, where
    /// binary expressions are printed more tightly.
    fn visit(&mut self, node: Node<'_>, depth: usize) {
        let kind = node.kind();
        self.mark_cells(node);

        match kind {
            "binary_expression" => self.binary(node, depth),
            "index_expression" | "slice_expression" => {
                let operand = node.child_by_field_name("operand");
                for child in children(node) {
                    let inner = if Some(child) == operand { depth } else { depth + 1 };
                    self.visit(child, inner);
                }
            }
            "call_expression" => {
                for child in children(node) {
                    if child.kind() == "argument_list" {
                        let inner = if named_count(Some(child)) > 1 { depth + 1 } else { depth };
                        self.visit_children(child, inner);
                    } else {
                        self.visit(child, depth);
                    }
                }
            }
            "parenthesized_expression" => self.visit_children(node, depth.saturating_sub(1).max(1)),
            "literal_value" | "keyed_element" => self.visit_children(node, 1),
            "assignment_statement" | "short_var_declaration" => {
                let multi = named_count(node.child_by_field_name("left")) > 1
                    && named_count(node.child_by_field_name("right")) > 1;
                self.visit_children(node, if multi { 2 } else { 1 });
            }
            k if resets_depth(k) => self.visit_children(node, 1),
            _ => self.visit_children(node, depth),
        }
    }

    fn visit_children(&mut self, node: Node<'_>, depth: usize) {
        for child in children(node) {
            self.visit(child, depth);
        }
    }

    fn binary(&mut self, node: Node<'_>, depth: usize) {
        let (Some(left), Some(op), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("operator"),
            node.child_by_field_name("right"),
        ) else {
            return self.visit_children(node, depth);
        };
        let prec = precedence(op.kind());
        if prec >= cutoff(node, depth) {
            self.compact.insert(op.start_byte());
        }
        self.visit(left, depth + diff_prec(left, prec));
        self.visit(right, depth + 1);
    }

    fn mark(&mut self, node: Option<Node<'_>>, group: usize) {
        if let Some(node) = node {
            self.cells.insert(node.start_byte(), group);
        }
    }

    /// Column cells: field types and tags, keyed values on their own rows, and
    /// the type and value of specs in a parenthesized declaration.
    fn mark_cells(&mut self, node: Node<'_>) {
        let group = node.id();
        match node.kind() {
            "field_declaration_list" => {
                for field in children(node) {
                    if field.kind() != "field_declaration"
                        || field.child_by_field_name("name").is_none()
                    {
                        continue;
                    }
                    self.mark(field.child_by_field_name("type"), group);
                    self.mark(field.child_by_field_name("tag"), group);
                }
            }
            "literal_value" => {
                let mut last_row = node.start_position().row;
                for element in children(node) {
                    let row = element.start_position().row;
                    if element.kind() == "keyed_element"
                        && row > last_row
                        && row == element.end_position().row
                    {
                        let parts = children(element);
                        let value = parts
                            .iter()
                            .position(|p| p.kind() == ":")
                            .and_then(|i| parts.get(i + 1).copied());
                        self.mark(value, group);
                    }
                    last_row = element.end_position().row;
                }
            }
            "const_declaration" | "var_declaration" | "var_spec_list" => {
                let specs = children(node);
                let grouped =
                    node.kind() == "var_spec_list" || specs.iter().any(|c| c.kind() == "(");
                if !grouped {
                    return;
                }
                for spec in specs {
                    if !matches!(spec.kind(), "const_spec" | "var_spec") {
                        continue;
                    }
                    self.mark(spec.child_by_field_name("type"), group);
                    let assign = children(spec).into_iter().find(|c| c.kind() == "=");
                    self.mark(assign, group);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<Token<'_>> {
        let parsed = parse(src).unwrap();
        assert!(parsed.error.is_none(), "{src}: {:?}", parsed.error);
        parsed.tokens
    }

    fn find<'a, 's>(tokens: &'a [Token<'s>], text: &str) -> &'a Token<'s> {
        tokens.iter().find(|t| t.text == text).unwrap()
    }

    #[test]
    fn test_package_clause_tokens() {
        let tokens = tokens("package util");
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_keyword("package"));
        assert_eq!(tokens[1].class, TokenClass::Word);
        assert_eq!((tokens[1].row, tokens[1].column), (0, 9));
    }

    #[test]
    fn test_literals_and_comments_are_whole_tokens() {
        let src = "package a\n\nvar x = \"a\\\"b\" // note\nvar y = 'c' + `raw`\n";
        let tokens = tokens(src);
        assert_eq!(find(&tokens, "\"a\\\"b\"").class, TokenClass::Literal);
        assert_eq!(find(&tokens, "// note").class, TokenClass::Comment);
        assert_eq!(find(&tokens, "'c'").class, TokenClass::Literal);
        assert_eq!(find(&tokens, "`raw`").class, TokenClass::Literal);
    }

    #[test]
    fn test_multiline_raw_string_spans_rows() {
        let tokens = tokens("package a\nvar s = `one\ntwo\nthree`");
        let raw = tokens.last().unwrap();
        assert_eq!((raw.row, raw.end_row), (1, 3));
    }

    #[test]
    fn test_operator_roles() {
        let tokens = tokens("package a\nfunc f(p *int) int {\n\treturn -*p - 1\n}");
        let stars: Vec<_> = tokens.iter().filter(|t| t.text == "*").collect();
        assert!(stars.iter().all(|t| t.is_unary()));
        let minus: Vec<_> = tokens.iter().filter(|t| t.text == "-").collect();
        assert!(minus[0].is_unary());
        assert!(minus[1].is_binary());
        assert!(!find(&tokens, "(").is_binary());
    }

    #[test]
    fn test_compact_binary_operators() {
        let tokens = tokens("package a\nvar x = a*b + c\nvar y = s[i+1]\nvar z = f(a+b, c)");
        let compact: Vec<_> = tokens
            .iter()
            .filter(|t| t.is_binary() && t.compact)
            .map(|t| (t.row, t.text))
            .collect();
        assert_eq!(compact, vec![(1, "*"), (2, "+"), (3, "+")]);
    }

    #[test]
    fn test_field_cells_share_a_group() {
        let tokens = tokens("package a\ntype T struct {\n\tA int `json:\"a\"`\n\tB string\n}");
        let cells: Vec<_> = tokens.iter().filter_map(|t| t.cell.map(|g| (t.text, g))).collect();
        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|(_, g)| *g == cells[0].1));
        assert_eq!(cells[0].0, "int");
        assert_eq!(cells[2].0, "string");
    }

    #[test]
    fn test_single_specs_have_no_cells() {
        let tokens = tokens("package a\nvar x int = 1\n");
        assert!(tokens.iter().all(|t| t.cell.is_none()));
    }

    #[test]
    fn test_char_column_counts_characters() {
        assert_eq!(char_column("größe := 1", "größe".len()), 6);
        assert_eq!(char_column("a\nbc", 3), 2);
    }

    #[test]
    fn test_syntax_error_position() {
        let err = parse("package a\n\nvar x = )").unwrap().error.unwrap();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_rejects_top_level_statements() {
        let err = parse("package a\n\nx := 1").unwrap().error.unwrap();
        assert_eq!(err.to_string(), "3:1: expected declaration, found 'x'");
    }

    #[test]
    fn test_rejects_imports_after_declarations() {
        let err = parse("package a\n\nvar x = 1\n\nimport \"fmt\"").unwrap().error.unwrap();
        assert_eq!(err.message, "expected declaration, found 'import'");
    }
}
