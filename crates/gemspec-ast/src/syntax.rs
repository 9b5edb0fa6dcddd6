//! Ruby syntax access on top of ast-grep
//!
//! The engine never builds its own AST. It walks the tree-sitter concrete syntax tree that
//! ast-grep exposes and reads node kinds, fields and byte ranges. The helpers below
//! normalize the handful of shapes the locator and catalog care about (calls, blocks,
//! string literals) so that grammar differences stay in one place.

use ast_grep_core::source::StrDoc;
use ast_grep_core::{AstGrep, Node};
use ast_grep_language::Ruby;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

use crate::source::SourceBuffer;

/// A node of the parsed Ruby tree
pub type RubyNode<'r> = Node<'r, StrDoc<Ruby>>;

/// Invalid input reported by the parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{label}:{line}:{column}: {message}")]
pub struct SyntaxError {
    pub label: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Parsed manifest source
pub struct SyntaxTree {
    grep: AstGrep<StrDoc<Ruby>>,
    label: String,
}

impl SyntaxTree {
    /// Parse `text`, rejecting trees that contain error or missing nodes
    pub fn parse(buffer: &SourceBuffer, label: &str) -> Result<Self, SyntaxError> {
        let grep = AstGrep::new(buffer.text(), Ruby);
        let tree = SyntaxTree {
            grep,
            label: label.to_string(),
        };
        if let Some(error) = tree.first_error(buffer) {
            debug!("Parse of {} failed: {}", label, error);
            return Err(error);
        }
        Ok(tree)
    }

    pub fn root(&self) -> RubyNode<'_> {
        self.grep.root()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn first_error(&self, buffer: &SourceBuffer) -> Option<SyntaxError> {
        let root = self.root();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let children: Vec<_> = node.children().collect();
            let is_root = node.range() == root.range() && node.kind() == root.kind();
            let missing = children.is_empty()
                && !is_root
                && !node.is_named()
                && node.range().is_empty();

            if node.kind() == "ERROR" || missing {
                let start = node.range().start;
                let (line, column) = buffer.line_col(start);
                let message = if missing {
                    format!("syntax error, missing `{}`", node.kind())
                } else {
                    format!(
                        "syntax error near `{}`",
                        buffer.line_text(start).trim()
                    )
                };
                return Some(SyntaxError {
                    label: self.label.clone(),
                    line,
                    column,
                    message,
                });
            }
            // reversed so the earliest error in source order is reported first
            stack.extend(children.into_iter().rev());
        }
        None
    }
}

/// Children that carry meaning: named and not comments
pub fn significant_children<'r>(node: &RubyNode<'r>) -> Vec<RubyNode<'r>> {
    node.children()
        .filter(|child| child.is_named() && child.kind() != "comment")
        .collect()
}

/// Text of an `identifier` node
pub fn identifier_name(node: &RubyNode<'_>) -> Option<String> {
    (node.kind() == "identifier").then(|| node.text().to_string())
}

/// A plain single- or double-quoted string without interpolation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringLiteral {
    /// Content between the delimiters with escapes resolved
    pub value: String,
    pub quote: char,
    pub range: Range<usize>,
}

/// Read a node as a plain string literal
pub fn string_literal(node: &RubyNode<'_>) -> Option<StringLiteral> {
    if node.kind() != "string" {
        return None;
    }
    let plain = significant_children(node)
        .iter()
        .all(|child| matches!(child.kind().as_ref(), "string_content" | "escape_sequence"));
    if !plain {
        return None;
    }

    let text = node.text();
    let quote = text.chars().next()?;
    if !matches!(quote, '\'' | '"') || text.len() < 2 || !text.ends_with(quote) {
        return None;
    }
    Some(StringLiteral {
        value: unescape(&text[1..text.len() - 1], quote)?,
        quote,
        range: node.range(),
    })
}

/// Resolve the escapes a plain literal may carry
///
/// Single-quoted strings only escape `\\` and `\'`. Double-quoted strings also get the
/// common control escapes; numeric and unicode escapes are rejected so such literals are
/// never rewritten.
fn unescape(raw: &str, quote: char) -> Option<String> {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        let escaped = chars.next()?;
        match (quote, escaped) {
            (_, '\\') => value.push('\\'),
            (q, e) if q == e => value.push(e),
            ('\'', other) => {
                value.push('\\');
                value.push(other);
            }
            (_, '#' | '\'') => value.push(escaped),
            (_, 'n') => value.push('\n'),
            (_, 't') => value.push('\t'),
            (_, 'r') => value.push('\r'),
            (_, 's') => value.push(' '),
            _ => return None,
        }
    }
    Some(value)
}

/// Segments of a constant path such as `Gem::Specification`
pub fn constant_path(node: &RubyNode<'_>) -> Option<Vec<String>> {
    match node.kind().as_ref() {
        "constant" => Some(vec![node.text().to_string()]),
        "scope_resolution" => {
            let name = node.field("name")?;
            if name.kind() != "constant" {
                return None;
            }
            let mut segments = match node.field("scope") {
                Some(scope) => constant_path(&scope)?,
                None => Vec::new(),
            };
            segments.push(name.text().to_string());
            Some(segments)
        }
        _ => None,
    }
}

/// A method call split into its parts
pub struct CallParts<'r> {
    pub receiver: Option<RubyNode<'r>>,
    pub method: RubyNode<'r>,
    pub arguments: Option<RubyNode<'r>>,
    pub block: Option<RubyNode<'r>>,
}

impl<'r> CallParts<'r> {
    pub fn method_name(&self) -> String {
        self.method.text().to_string()
    }

    /// Argument nodes without punctuation or comments
    pub fn argument_nodes(&self) -> Vec<RubyNode<'r>> {
        self.arguments
            .as_ref()
            .map(significant_children)
            .unwrap_or_default()
    }

    /// Whether the argument list is wrapped in parentheses
    pub fn is_parenthesized(&self) -> bool {
        self.arguments
            .as_ref()
            .is_some_and(|args| args.text().starts_with('('))
    }
}

/// Split a call node; handles both the unified `call` shape and the older
/// `method_call` wrapper some grammar versions produce for calls with blocks
pub fn call_parts<'r>(node: &RubyNode<'r>) -> Option<CallParts<'r>> {
    match node.kind().as_ref() {
        "call" => Some(CallParts {
            receiver: node.field("receiver"),
            method: node.field("method")?,
            arguments: node.field("arguments"),
            block: node.field("block"),
        }),
        "method_call" => {
            let inner = node.field("method")?;
            let (receiver, method) = if inner.kind() == "call" {
                (inner.field("receiver"), inner.field("method")?)
            } else {
                (None, inner)
            };
            Some(CallParts {
                receiver,
                method,
                arguments: node.field("arguments"),
                block: node.field("block"),
            })
        }
        _ => None,
    }
}

/// A `do ... end` or `{ ... }` block split into its parts
pub struct BlockParts<'r> {
    pub node: RubyNode<'r>,
    pub parameters: Option<RubyNode<'r>>,
    pub statements: Vec<RubyNode<'r>>,
    /// The closing `end` or `}`
    pub closer: Option<RubyNode<'r>>,
}

pub fn block_parts<'r>(node: &RubyNode<'r>) -> Option<BlockParts<'r>> {
    if !matches!(node.kind().as_ref(), "do_block" | "block") {
        return None;
    }
    let mut parameters = None;
    let mut statements = Vec::new();
    let mut closer = None;

    for child in node.children() {
        let kind = child.kind().to_string();
        match kind.as_str() {
            "block_parameters" => parameters = Some(child),
            "body_statement" | "block_body" => statements.extend(significant_children(&child)),
            "end" | "}" if !child.is_named() => closer = Some(child),
            "comment" => {}
            _ if child.is_named() => statements.push(child),
            _ => {}
        }
    }

    Some(BlockParts {
        node: node.clone(),
        parameters,
        statements,
        closer,
    })
}
