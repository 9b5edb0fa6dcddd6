//! Whitespace-aware placement of edits
//!
//! Deletions swallow the whole line (indentation, trailing comment, preceding line
//! terminator) when the statement owns its line. Appended statements copy the indentation
//! of the last statement, or go one level deeper than the block call for an empty block.

use gemspec_ast::{DependencyDeclaration, ManifestBlock, SourceBuffer};
use gemspec_config::RewriteConfig;
use std::ops::Range;

use crate::edit::EditInstruction;
use crate::errors::RewriteError;

/// Range to delete so that removing `statement` leaves no blank line behind
pub fn statement_removal(buffer: &SourceBuffer, statement: Range<usize>) -> Range<usize> {
    let owns_line = buffer.is_line_prefix_blank(statement.start)
        && buffer.rest_of_line_is_trivia(statement.end);
    if !owns_line {
        return statement;
    }

    let line_start = buffer.line_start(statement.start);
    let line_end = buffer.line_end(statement.end);
    match buffer.preceding_terminator(line_start) {
        Some(terminator) => terminator..line_end,
        // first line of the file: take the following terminator instead
        None => line_start..after_terminator(buffer, line_end),
    }
}

fn after_terminator(buffer: &SourceBuffer, line_end: usize) -> usize {
    let rest = &buffer.text()[line_end..];
    if rest.starts_with("\r\n") {
        line_end + 2
    } else if rest.starts_with('\n') {
        line_end + 1
    } else {
        line_end
    }
}

/// Single edit that adds `statements` as the new last lines of the block
pub fn append_statements(
    buffer: &SourceBuffer,
    block: &ManifestBlock<'_>,
    config: &RewriteConfig,
    statements: &[String],
) -> Result<EditInstruction, RewriteError> {
    let newline = buffer.newline();
    let block_indent = buffer.indentation_at(block.call().range().start);
    let nested_indent = format!("{}{}", block_indent, " ".repeat(config.indent_width));

    if let Some(last) = block.statements().last() {
        let range = block.statement_extent(last);
        let indent = if buffer.is_line_prefix_blank(range.start) {
            buffer.indentation_at(range.start).to_string()
        } else {
            nested_indent
        };
        let position = if buffer.rest_of_line_is_trivia(range.end) {
            buffer.line_end(range.end)
        } else {
            range.end
        };
        return Ok(EditInstruction::InsertAfter {
            position,
            text: join_lines(statements, newline, &indent),
        });
    }

    let closer = block.closer().ok_or_else(|| {
        RewriteError::InternalInvariant("manifest block has no closing token".to_string())
    })?;
    let anchor_end = block.last_child_before_closer().range().end;
    let closer_start = closer.range().start;
    let closer_on_own_line = buffer.line_index(closer_start) > buffer.line_index(anchor_end);

    if buffer.rest_of_line_is_trivia(anchor_end) && closer_on_own_line {
        Ok(EditInstruction::InsertAfter {
            position: buffer.line_end(anchor_end),
            text: join_lines(statements, newline, &nested_indent),
        })
    } else {
        // `do |spec| end` on one line: break the closer onto its own line
        Ok(EditInstruction::Replace {
            range: anchor_end..closer_start,
            text: format!(
                "{}{}{}",
                join_lines(statements, newline, &nested_indent),
                newline,
                block_indent
            ),
        })
    }
}

fn join_lines(statements: &[String], newline: &str, indent: &str) -> String {
    statements
        .iter()
        .map(|statement| format!("{}{}{}", newline, indent, statement))
        .collect()
}

/// Render `value` as a Ruby string literal delimited by `quote`
pub fn quote_literal(value: &str, quote: char) -> String {
    let mut rendered = String::with_capacity(value.len() + 2);
    rendered.push(quote);
    let double = quote == '"';
    for c in value.chars() {
        match c {
            '\n' if double => rendered.push_str("\\n"),
            '\t' if double => rendered.push_str("\\t"),
            '\r' if double => rendered.push_str("\\r"),
            _ => {
                if c == '\\' || c == quote || (double && c == '#') {
                    rendered.push('\\');
                }
                rendered.push(c);
            }
        }
    }
    rendered.push(quote);
    rendered
}

/// `spec.add_dependency 'name', 'req'` or the parenthesized form
pub fn render_dependency(
    receiver: &str,
    dependency: &DependencyDeclaration,
    quote: char,
    parenthesized: bool,
) -> String {
    let args = std::iter::once(dependency.gem_name())
        .chain(dependency.version_constraints().iter().map(String::as_str))
        .map(|value| quote_literal(value, quote))
        .collect::<Vec<_>>()
        .join(", ");
    let verb = dependency.method_kind().verb();
    if parenthesized {
        format!("{receiver}.{verb}({args})")
    } else {
        format!("{receiver}.{verb} {args}")
    }
}

/// `spec.name = value`
pub fn render_attribute(receiver: &str, name: &str, expression: &str) -> String {
    format!("{receiver}.{name} = {expression}")
}
