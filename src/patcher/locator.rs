//! Structural anchors in foreign, unparsed source text.
//!
//! Nothing here parses Kotlin or XML. Block boundaries come from brace-depth
//! counting behind the [`BlockBoundaryLocator`] trait, and declarations are
//! found with regex anchors. Patchers only talk to this module, so the
//! counting strategy can be replaced by a real lexer without touching them.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A brace the locator decided counts toward block depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brace {
    Open,
    Close,
}

/// Locates brace-balanced block boundaries.
pub trait BlockBoundaryLocator {
    fn name(&self) -> &'static str;

    /// Every counted brace at or after `from`, in order
    fn braces(&self, text: &str, from: usize) -> Vec<(usize, Brace)>;

    /// Offset of the `}` matching the `{` at `open_index`
    fn find_block_end(&self, text: &str, open_index: usize) -> Option<usize> {
        if text.as_bytes().get(open_index) != Some(&b'{') {
            return None;
        }
        let mut depth = 0usize;
        for (idx, brace) in self.braces(text, open_index) {
            match brace {
                Brace::Open => depth += 1,
                Brace::Close => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(idx);
                    }
                }
            }
        }
        None
    }

    /// Depth never goes negative and ends at zero
    fn is_balanced(&self, text: &str) -> bool {
        let mut depth: i64 = 0;
        for (_, brace) in self.braces(text, 0) {
            depth += match brace {
                Brace::Open => 1,
                Brace::Close => -1,
            };
            if depth < 0 {
                return false;
            }
        }
        depth == 0
    }

    /// Offset of the last `}` that brings depth back to zero
    fn last_top_level_close(&self, text: &str) -> Option<usize> {
        let mut depth: i64 = 0;
        let mut last = None;
        for (idx, brace) in self.braces(text, 0) {
            match brace {
                Brace::Open => depth += 1,
                Brace::Close => {
                    depth -= 1;
                    if depth == 0 {
                        last = Some(idx);
                    }
                }
            }
        }
        last
    }
}

/// Counts every `{` and `}`, including those inside literals and comments.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBraceLocator;

impl BlockBoundaryLocator for RawBraceLocator {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn braces(&self, text: &str, from: usize) -> Vec<(usize, Brace)> {
        text.as_bytes()
            .iter()
            .enumerate()
            .skip(from)
            .filter_map(|(i, b)| match b {
                b'{' => Some((i, Brace::Open)),
                b'}' => Some((i, Brace::Close)),
                _ => None,
            })
            .collect()
    }
}

/// Ignores braces inside Kotlin/Java string, raw string and char literals and
/// inside comments. String templates (`"${...}"`) are followed so their
/// braces do not leak into the enclosing depth.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalBraceLocator;

#[derive(Debug, Clone, Copy)]
enum Lex {
    Code,
    Str,
    RawStr,
    /// Inside `${ ... }`, counting nested braces
    Template(u32),
}

impl BlockBoundaryLocator for LexicalBraceLocator {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn braces(&self, text: &str, from: usize) -> Vec<(usize, Brace)> {
        let b = text.as_bytes();
        let n = b.len();
        let mut out = Vec::new();
        let mut stack = vec![Lex::Code];
        let mut i = from;

        while i < n {
            let top = *stack.last().unwrap_or(&Lex::Code);
            match top {
                Lex::Code | Lex::Template(_) => {
                    if at(b, i, b"//") {
                        while i < n && b[i] != b'\n' {
                            i += 1;
                        }
                        continue;
                    }
                    if at(b, i, b"/*") {
                        // Kotlin block comments nest
                        let mut nesting = 0u32;
                        while i < n {
                            if at(b, i, b"/*") {
                                nesting += 1;
                                i += 2;
                            } else if at(b, i, b"*/") {
                                nesting -= 1;
                                i += 2;
                                if nesting == 0 {
                                    break;
                                }
                            } else {
                                i += 1;
                            }
                        }
                        continue;
                    }
                    if at(b, i, b"\"\"\"") {
                        stack.push(Lex::RawStr);
                        i += 3;
                        continue;
                    }
                    match b[i] {
                        b'"' => stack.push(Lex::Str),
                        b'\'' => {
                            if let Some(end) = char_literal_end(b, i) {
                                i = end + 1;
                                continue;
                            }
                        }
                        b'{' => match stack.last_mut() {
                            Some(Lex::Template(d)) => *d += 1,
                            _ => out.push((i, Brace::Open)),
                        },
                        b'}' => {
                            let mut template_closed = false;
                            match stack.last_mut() {
                                Some(Lex::Template(d)) if *d == 0 => template_closed = true,
                                Some(Lex::Template(d)) => *d -= 1,
                                _ => out.push((i, Brace::Close)),
                            }
                            if template_closed {
                                stack.pop();
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                Lex::Str => {
                    if b[i] == b'\\' {
                        i += 2;
                        continue;
                    }
                    if at(b, i, b"${") {
                        stack.push(Lex::Template(0));
                        i += 2;
                        continue;
                    }
                    if b[i] == b'"' || b[i] == b'\n' {
                        stack.pop();
                    }
                    i += 1;
                }
                Lex::RawStr => {
                    if at(b, i, b"${") {
                        stack.push(Lex::Template(0));
                        i += 2;
                        continue;
                    }
                    if at(b, i, b"\"\"\"") {
                        // Trailing quotes beyond the delimiter belong to the literal
                        i += 3;
                        while i < n && b[i] == b'"' {
                            i += 1;
                        }
                        stack.pop();
                        continue;
                    }
                    i += 1;
                }
            }
        }
        out
    }
}

fn at(b: &[u8], i: usize, pat: &[u8]) -> bool {
    b.get(i..i + pat.len()) == Some(pat)
}

/// Closing quote of a char literal starting at `start`, if it looks like one
fn char_literal_end(b: &[u8], start: usize) -> Option<usize> {
    let first = *b.get(start + 1)?;
    let scan_from = if first == b'\\' { start + 3 } else { start + 2 };
    (scan_from..(start + 9).min(b.len())).find(|&j| b[j] == b'\'')
}

/// Selectable locator strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    Raw,
    #[default]
    Lexical,
}

static RAW: RawBraceLocator = RawBraceLocator;
static LEXICAL: LexicalBraceLocator = LexicalBraceLocator;

impl LocatorKind {
    pub fn locator(&self) -> &'static dyn BlockBoundaryLocator {
        match self {
            LocatorKind::Raw => &RAW,
            LocatorKind::Lexical => &LEXICAL,
        }
    }
}

impl std::str::FromStr for LocatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(LocatorKind::Raw),
            "lexical" => Ok(LocatorKind::Lexical),
            other => Err(format!("unknown locator '{}', expected raw or lexical", other)),
        }
    }
}

/// A located method definition with a brace body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    /// Offset of the first character of the declaration line
    pub start: usize,
    /// Leading whitespace of the declaration line
    pub indent: String,
    /// Raw parameter list text between the parentheses
    pub params: String,
    /// Offset of the body's opening `{`
    pub open_brace: usize,
}

/// A located class declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub start: usize,
    pub indent: String,
    /// Offset just past the header, trailing whitespace excluded
    pub header_end: usize,
    /// `None` for the single-line `class X : Y()` form
    pub open_brace: Option<usize>,
}

const MODIFIERS: &str =
    r"(?:(?:override|public|protected|private|internal|open|final|suspend|operator)[ \t]+)*";

static ACTIVITY_CLASS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)(?:(?:public|internal|open|final|abstract)[ \t]+)*class[ \t]+(\w+)[^\n{]*:[^\n{]*Activity[ \t]*\([^\n{]*",
    )
    .expect("Invalid activity class regex")
});

/// Find a method definition by name, with a `{` body
pub fn find_method_declaration(text: &str, method_name: &str) -> Option<MethodDecl> {
    let pattern = format!(
        r"(?m)^([ \t]*){}fun[ \t]+{}[ \t]*\(([^)]*)\)[ \t]*(?::[ \t]*[^={{\n]+)?\s*\{{",
        MODIFIERS,
        regex::escape(method_name)
    );
    let regex = Regex::new(&pattern).ok()?;
    let caps = regex.captures(text)?;
    let whole = caps.get(0)?;
    Some(MethodDecl {
        start: whole.start(),
        indent: caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
        params: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
        open_brace: whole.end() - 1,
    })
}

/// Loose presence check: any `fun name(` at all, body or not
pub fn has_method(text: &str, method_name: &str) -> bool {
    let pattern = format!(r"\bfun[ \t]+{}[ \t]*\(", regex::escape(method_name));
    Regex::new(&pattern)
        .map(|r| r.is_match(text))
        .unwrap_or(false)
}

/// Find the activity class: by name when given, else the first class whose
/// supertype list names an `...Activity()` constructor call
pub fn find_class_declaration(text: &str, class_name: Option<&str>) -> Option<ClassDecl> {
    let (start, indent, name, header) = match class_name {
        Some(name) => {
            let pattern = format!(
                r"(?m)^([ \t]*)(?:(?:public|internal|open|final|abstract)[ \t]+)*class[ \t]+{}\b[^\n{{]*",
                regex::escape(name)
            );
            let regex = Regex::new(&pattern).ok()?;
            let caps = regex.captures(text)?;
            let whole = caps.get(0)?;
            (
                whole.start(),
                caps.get(1)?.as_str().to_string(),
                name.to_string(),
                whole.as_str(),
            )
        }
        None => {
            let caps = ACTIVITY_CLASS_REGEX.captures(text)?;
            let whole = caps.get(0)?;
            (
                whole.start(),
                caps.get(1)?.as_str().to_string(),
                caps.get(2)?.as_str().to_string(),
                whole.as_str(),
            )
        }
    };

    let header_end = start + header.trim_end().len();
    let after = &text[header_end..];
    let skipped = after.len() - after.trim_start().len();
    let open_brace = match after.trim_start().as_bytes().first() {
        Some(b'{') => Some(header_end + skipped),
        _ => None,
    };

    Some(ClassDecl {
        name,
        start,
        indent,
        header_end,
        open_brace,
    })
}

/// Span of the first `<element ...>` opening tag
pub fn find_xml_open_tag(text: &str, element: &str) -> Option<Range<usize>> {
    let pattern = format!(r"<{}\b[^>]*>", regex::escape(element));
    let regex = Regex::new(&pattern).ok()?;
    regex.find(text).map(|m| m.range())
}

/// Identifiers declared by a Kotlin parameter list, in order
///
/// `requestCode: Int, permissions: Array<out String>, grantResults: IntArray`
/// yields `["requestCode", "permissions", "grantResults"]`.
pub fn parameter_names(params: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in params.chars() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                pieces.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    pieces.push(current);

    pieces
        .iter()
        .filter_map(|piece| {
            let head = piece.split(':').next()?.trim();
            let name = head
                .split_whitespace()
                .filter(|tok| !tok.starts_with('@') && !matches!(*tok, "vararg" | "val" | "var" | "final"))
                .last()?;
            if name.chars().all(|c| c.is_alphanumeric() || c == '_') && !name.is_empty() {
                Some(name.to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Offset of the start of the line containing `idx`
pub fn line_start(text: &str, idx: usize) -> usize {
    text[..idx].rfind('\n').map(|p| p + 1).unwrap_or(0)
}

/// Offset just past the newline ending the line containing `idx`
pub fn line_end_inclusive(text: &str, idx: usize) -> usize {
    text[idx..]
        .find('\n')
        .map(|p| idx + p + 1)
        .unwrap_or(text.len())
}

/// Indentation of the first non-blank line after `open_brace`, if any
pub fn body_indent(text: &str, open_brace: usize, close_brace: usize) -> Option<String> {
    text.get(open_brace + 1..close_brace)?
        .lines()
        .skip(1)
        .find(|l| !l.trim().is_empty())
        .map(|l| l[..l.len() - l.trim_start().len()].to_string())
}
