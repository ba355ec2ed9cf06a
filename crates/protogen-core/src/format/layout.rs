//! Line layout for parsed Go tokens.
//!
//! Line breaks come from the source. Everything else on a line is rebuilt:
//! tab indentation by block nesting, token spacing the way gofmt prints it,
//! and elastic columns for struct fields, keyed values, grouped specs, and
//! trailing comments. Tokens spanning several rows (raw strings, block
//! comments) are printed verbatim.

use super::syntax::{Delim, Token, TokenClass};

/// A run of tokens printed as one source line. A multi-row token pulls the
/// tokens after it on its last row into the same line.
#[derive(Debug)]
struct Line {
    depth: usize,
    cells: Vec<String>,
    group: Option<usize>,
    blank_before: bool,
    multiline: bool,
}

pub(crate) fn layout(tokens: &[Token<'_>]) -> String {
    let mut lines = Vec::new();
    // One entry per open delimiter; `true` when it added an indentation level.
    let mut open: Vec<bool> = Vec::new();
    let mut continues = false;
    let mut previous_end: Option<usize> = None;

    for line_tokens in split_lines(tokens) {
        let leading_closers = line_tokens
            .iter()
            .take_while(|t| matches!(t.class, TokenClass::Close(_)))
            .count();
        open.truncate(open.len().saturating_sub(leading_closers));

        let mut depth = open.iter().filter(|indents| **indents).count();
        if outdented(line_tokens) {
            depth = depth.saturating_sub(1);
        } else if continues && leading_closers == 0 {
            depth += 1;
        }

        let (cells, group) = render_cells(line_tokens);
        let first_row = line_tokens.first().map_or(0, |t| t.row);
        let last_row = line_tokens.iter().map(|t| t.end_row).max().unwrap_or(first_row);
        lines.push(Line {
            depth,
            multiline: last_row > first_row,
            cells,
            group,
            blank_before: previous_end.is_some_and(|end| first_row > end + 1),
        });

        track_delimiters(&mut open, &line_tokens[leading_closers..]);
        continues = ends_expression(line_tokens);
        previous_end = Some(last_row);
    }

    align(&mut lines);

    let mut out = String::new();
    for line in &lines {
        if line.blank_before {
            out.push('\n');
        }
        for _ in 0..line.depth {
            out.push('\t');
        }
        for cell in &line.cells {
            out.push_str(cell);
        }
        out.push('\n');
    }
    out
}

fn split_lines<'a, 's>(tokens: &'a [Token<'s>]) -> Vec<&'a [Token<'s>]> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut end_row = None;
    for (i, token) in tokens.iter().enumerate() {
        match end_row {
            Some(row) if token.row <= row => {}
            Some(_) => {
                lines.push(&tokens[start..i]);
                start = i;
            }
            None => {}
        }
        end_row = Some(end_row.map_or(token.end_row, |row: usize| row.max(token.end_row)));
    }
    if start < tokens.len() {
        lines.push(&tokens[start..]);
    }
    lines
}

/// `case` and `default` clauses and labels sit one level out.
fn outdented(line_tokens: &[Token<'_>]) -> bool {
    match line_tokens.first() {
        Some(t) if t.is_keyword("case") || t.is_keyword("default") => true,
        Some(t) => t.parent == "labeled_statement",
        None => false,
    }
}

/// Apply one line's delimiters to the open stack. The first delimiter opened on
/// the line and still open at its end adds one indentation level.
fn track_delimiters(open: &mut Vec<bool>, line_tokens: &[Token<'_>]) {
    let mut baseline = open.len();
    for token in line_tokens {
        match token.class {
            TokenClass::Open(_) => open.push(false),
            TokenClass::Close(_) => {
                open.pop();
                baseline = baseline.min(open.len());
            }
            _ => {}
        }
    }
    if let Some(first) = open.get_mut(baseline) {
        *first = true;
    }
}

/// A line ending in a binary or assignment operator continues on the next.
fn ends_expression(line_tokens: &[Token<'_>]) -> bool {
    line_tokens
        .iter()
        .rev()
        .find(|t| t.class != TokenClass::Comment)
        .is_some_and(|t| t.is_binary())
}

/// Build the line's text, split where alignment cells begin. Returns the cells
/// and the group of the first cell break.
fn render_cells(line_tokens: &[Token<'_>]) -> (Vec<String>, Option<usize>) {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut group = None;

    for (i, token) in line_tokens.iter().enumerate() {
        if i > 0 {
            let prev = &line_tokens[i - 1];
            let trailing_comment = token.class == TokenClass::Comment
                && token.text.starts_with("//")
                && i + 1 == line_tokens.len();
            let cell = if trailing_comment {
                Some(token.parent_id)
            } else {
                token.cell
            };
            if let Some(cell) = cell {
                group.get_or_insert(cell);
                cells.push(std::mem::take(&mut current));
            } else if space_between(prev, token) {
                current.push(' ');
            }
        }
        current.push_str(token.text);
    }
    cells.push(current);
    (cells, group)
}

/// Whether gofmt prints a blank between two adjacent tokens on a line.
fn space_between(prev: &Token<'_>, next: &Token<'_>) -> bool {
    use TokenClass::{Close, Comment, Keyword, Open};

    if prev.class == Comment || next.class == Comment {
        return true;
    }

    match next.class {
        Close(Delim::Brace) => {
            return prev.class != Open(Delim::Brace) && next.parent != "literal_value";
        }
        Close(_) => return false,
        _ => {}
    }
    match prev.class {
        Open(Delim::Brace) => return prev.parent != "literal_value",
        Open(_) => return false,
        _ => {}
    }

    if [",", ";", ":"].iter().any(|p| next.is_punct(p)) {
        return false;
    }
    if prev.is_punct(".") || next.is_punct(".") {
        return false;
    }
    if prev.is_punct(",") || prev.is_punct(";") {
        return true;
    }
    if prev.is_punct(":") {
        return prev.parent != "slice_expression";
    }
    if next.is_punct("...") {
        return next.parent == "variadic_parameter_declaration" && prev.class == TokenClass::Word;
    }
    if prev.is_punct("...") {
        return false;
    }
    if next.is_punct("++") || next.is_punct("--") {
        return false;
    }
    if prev.is_punct("++") || prev.is_punct("--") {
        return true;
    }

    // `<-chan T` and `chan<- T`
    if next.is_punct("<-") && next.parent == "channel_type" {
        return !prev.is_keyword("chan");
    }
    if prev.is_punct("<-") && prev.parent == "channel_type" {
        return !next.is_keyword("chan");
    }

    if next.is_binary() {
        return !next.compact;
    }
    if prev.is_binary() {
        return !prev.compact;
    }
    if prev.is_unary() {
        return false;
    }
    if next.is_unary() {
        return prev.class != Close(Delim::Bracket);
    }

    match next.class {
        Open(Delim::Brace) => {
            return match next.parent {
                "literal_value" => false,
                "field_declaration_list" | "interface_type" => !next.single_row_parent,
                _ => true,
            };
        }
        Open(Delim::Paren) => {
            return match prev.class {
                Keyword if prev.text == "func" => next.grandparent == "method_declaration",
                Keyword => true,
                Close(Delim::Paren) => next.parent == "parameter_list",
                _ => false,
            };
        }
        Open(Delim::Bracket) => {
            if prev.is_keyword("map") {
                return false;
            }
            if matches!(
                next.parent,
                "slice_type" | "array_type" | "implicit_length_array_type"
            ) {
                return prev.class != Close(Delim::Bracket);
            }
            return prev.class == Keyword;
        }
        _ => {}
    }

    prev.class != Close(Delim::Bracket)
}

/// Pad cells so that consecutive lines of one group line up, the way
/// `text/tabwriter` does for gofmt: a column block is a run of lines that all
/// have that column terminated, padded to its widest cell plus one space.
fn align(lines: &mut [Line]) {
    let mut start = 0;
    while start < lines.len() {
        let mut end = start + 1;
        if let Some(group) = lines[start].group.filter(|_| !lines[start].multiline) {
            let depth = lines[start].depth;
            while end < lines.len()
                && !lines[end].blank_before
                && !lines[end].multiline
                && lines[end].group == Some(group)
                && lines[end].depth == depth
            {
                end += 1;
            }
        }
        align_block(&mut lines[start..end]);
        start = end;
    }
}

fn align_block(lines: &mut [Line]) {
    let columns = lines.iter().map(|l| l.cells.len()).max().unwrap_or(0);
    for column in 0..columns.saturating_sub(1) {
        let mut start = 0;
        while start < lines.len() {
            if lines[start].cells.len() <= column + 1 {
                start += 1;
                continue;
            }
            let mut end = start;
            while end < lines.len() && lines[end].cells.len() > column + 1 {
                end += 1;
            }
            let width = lines[start..end]
                .iter()
                .map(|l| l.cells[column].chars().count())
                .max()
                .unwrap_or(0);
            for line in &mut lines[start..end] {
                let cell = &mut line.cells[column];
                let pad = width + 1 - cell.chars().count();
                cell.push_str(&" ".repeat(pad));
            }
            start = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::syntax::parse;
    use super::*;

    fn relayout(src: &str) -> String {
        let parsed = parse(src).unwrap();
        assert!(parsed.error.is_none(), "{src}: {:?}", parsed.error);
        layout(&parsed.tokens)
    }

    fn body(src: &str) -> String {
        let out = relayout(&format!("package a\n\n{src}"));
        out.strip_prefix("package a\n\n").unwrap_or(&out).to_string()
    }

    #[test]
    fn test_operator_spacing() {
        assert_eq!(body("var x=1+2"), "var x = 1 + 2\n");
        assert_eq!(body("var y = a*b + c"), "var y = a*b + c\n");
        assert_eq!(body("var z = s[i+1 :]"), "var z = s[i+1:]\n");
        assert_eq!(body("var ok = ! done && -n<0"), "var ok = !done && -n < 0\n");
    }

    #[test]
    fn test_call_and_declaration_spacing() {
        let src = "func (s *Server) Get( ctx context.Context , ids ...int )( *User , error ){\n\
                   return nil,nil\n}";
        assert_eq!(
            body(src),
            "func (s *Server) Get(ctx context.Context, ids ...int) (*User, error) {\n\
             \treturn nil, nil\n}\n"
        );
        assert_eq!(body("var f = func ( ) { }"), "var f = func() {}\n");
        assert_eq!(body("var v = g( xs ... )"), "var v = g(xs...)\n");
    }

    #[test]
    fn test_type_spacing() {
        assert_eq!(
            body("var m map [ string ] [ ]* T"),
            "var m map[string][]*T\n"
        );
        assert_eq!(body("var e = struct { } { }"), "var e = struct{}{}\n");
        assert_eq!(body("var i interface { }"), "var i interface{}\n");
        assert_eq!(body("var c <- chan int"), "var c <-chan int\n");
    }

    #[test]
    fn test_composite_literal_spacing() {
        assert_eq!(
            body("var p = & Point { X : 1 , Y : 2 }"),
            "var p = &Point{X: 1, Y: 2}\n"
        );
    }

    #[test]
    fn test_struct_fields_align() {
        let src = "type T struct {\n\
                   \tID int `json:\"id\"`\n\
                   \tDisplayName string `json:\"name\"`\n}";
        assert_eq!(
            body(src),
            "type T struct {\n\
             \tID          int    `json:\"id\"`\n\
             \tDisplayName string `json:\"name\"`\n}\n"
        );
    }

    #[test]
    fn test_keyed_values_align() {
        let src = "var m = map[string]int{\n\"a\": 1,\n\"long\": 2,\n}";
        assert_eq!(
            body(src),
            "var m = map[string]int{\n\t\"a\":    1,\n\t\"long\": 2,\n}\n"
        );
    }

    #[test]
    fn test_grouped_consts_align() {
        let src = "const (\n\tStatus_UNKNOWN Status = 0\n\tStatus_OK Status = 1\n)";
        assert_eq!(
            body(src),
            "const (\n\tStatus_UNKNOWN Status = 0\n\tStatus_OK      Status = 1\n)\n"
        );
    }

    #[test]
    fn test_trailing_comments_align() {
        let src = "func f() {\n\tx := 1 // one\n\tlonger := 2 // two\n}";
        assert_eq!(
            body(src),
            "func f() {\n\tx := 1      // one\n\tlonger := 2 // two\n}\n"
        );
    }

    #[test]
    fn test_blank_line_breaks_alignment() {
        let src = "type T struct {\n\tA int\n\n\tLonger string\n}";
        assert_eq!(body(src), "type T struct {\n\tA int\n\n\tLonger string\n}\n");
    }

    #[test]
    fn test_labels_are_outdented() {
        let src = "func f() {\nouter:\nfor {\nbreak outer\n}\n}";
        assert_eq!(
            body(src),
            "func f() {\nouter:\n\tfor {\n\t\tbreak outer\n\t}\n}\n"
        );
    }
}
