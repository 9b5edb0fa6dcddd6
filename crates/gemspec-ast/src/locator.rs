//! Finds the `Gem::Specification.new do |spec| ... end` block
//!
//! The first block call in depth-first order whose receiver is the configured constructor,
//! whose method is `new`, and whose block binds exactly one parameter is the manifest
//! block. Traversal stops there, so matching calls nested inside it never become a second
//! manifest block.

use gemspec_config::RewriteConfig;
use std::ops::Range;
use tracing::debug;

use crate::catalog::Catalog;
use crate::syntax::{
    block_parts, call_parts, constant_path, identifier_name, significant_children, RubyNode,
};

/// The located declaration block
#[derive(Clone)]
pub struct ManifestBlock<'r> {
    receiver_name: String,
    call: RubyNode<'r>,
    node: RubyNode<'r>,
    parameters: RubyNode<'r>,
    statements: Vec<RubyNode<'r>>,
    closer: Option<RubyNode<'r>>,
    /// `(opener start, body end)` for every heredoc inside the block
    heredocs: Vec<(usize, usize)>,
}

impl<'r> ManifestBlock<'r> {
    /// Identifier bound as the block parameter
    pub fn receiver_name(&self) -> &str {
        &self.receiver_name
    }

    /// The whole `Constructor.new do ... end` call
    pub fn call(&self) -> &RubyNode<'r> {
        &self.call
    }

    /// Direct statements in source order, comments excluded
    pub fn statements(&self) -> &[RubyNode<'r>] {
        &self.statements
    }

    /// End of the last heredoc body opened within `range`
    ///
    /// Heredoc bodies are separate nodes on the lines after their opener, so a statement
    /// such as `spec.description = <<~DESC` does not cover its own text.
    pub fn heredoc_end(&self, range: Range<usize>) -> Option<usize> {
        self.heredocs
            .iter()
            .filter(|(opener, _)| range.contains(opener))
            .map(|&(_, end)| end)
            .max()
    }

    /// Statement range extended over any heredoc bodies it opens
    pub fn statement_extent(&self, statement: &RubyNode<'_>) -> Range<usize> {
        let range = statement.range();
        let end = self
            .heredoc_end(range.clone())
            .map_or(range.end, |end| end.max(range.end));
        range.start..end
    }

    /// Closing `end` or `}`
    pub fn closer(&self) -> Option<&RubyNode<'r>> {
        self.closer.as_ref()
    }

    /// Last direct child before the closer, comments included
    pub fn last_child_before_closer(&self) -> RubyNode<'r> {
        let closer_start = self.closer.as_ref().map(|closer| closer.range().start);
        self.node
            .children()
            .filter(|child| child.is_named())
            .filter(|child| closer_start.map_or(true, |start| child.range().end <= start))
            .last()
            .unwrap_or_else(|| self.parameters.clone())
    }
}

/// Result of the single locate-and-catalog traversal
pub struct ManifestScan<'r> {
    block: ManifestBlock<'r>,
    catalog: Catalog<'r>,
}

impl<'r> ManifestScan<'r> {
    pub fn block(&self) -> &ManifestBlock<'r> {
        &self.block
    }

    pub fn catalog(&self) -> &Catalog<'r> {
        &self.catalog
    }

    pub fn into_parts(self) -> (ManifestBlock<'r>, Catalog<'r>) {
        (self.block, self.catalog)
    }
}

/// Matches block calls against the configured constructor
pub struct BlockLocator {
    constructor: Vec<String>,
}

impl BlockLocator {
    pub fn new(config: &RewriteConfig) -> Self {
        BlockLocator {
            constructor: config
                .constructor_segments()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Locate the manifest block and catalog its statements
    pub fn scan<'r>(&self, root: &RubyNode<'r>) -> Option<ManifestScan<'r>> {
        let block = self.locate(root)?;
        let catalog = Catalog::build(&block);
        debug!(
            "Manifest block bound to '{}' holds {} statements, {} cataloged",
            block.receiver_name(),
            block.statements().len(),
            catalog.len()
        );
        Some(ManifestScan { block, catalog })
    }

    /// Depth-first search for the first matching block call
    pub fn locate<'r>(&self, root: &RubyNode<'r>) -> Option<ManifestBlock<'r>> {
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if let Some(block) = self.match_block_call(&node) {
                return Some(block);
            }
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev());
        }
        None
    }

    fn match_block_call<'r>(&self, node: &RubyNode<'r>) -> Option<ManifestBlock<'r>> {
        let call = call_parts(node)?;
        if call.method_name() != "new" || call.arguments.is_some() {
            return None;
        }
        let receiver = call.receiver.as_ref()?;
        if constant_path(receiver)? != self.constructor {
            return None;
        }

        let block = block_parts(call.block.as_ref()?)?;
        let parameters = block.parameters?;
        let params = significant_children(&parameters);
        let receiver_name = match params.as_slice() {
            [single] => identifier_name(single)?,
            _ => {
                debug!(
                    "Constructor block at byte {} binds {} parameters, skipping",
                    node.range().start,
                    params.len()
                );
                return None;
            }
        };

        debug!(
            "Found manifest block '{}' at bytes {:?}",
            receiver_name,
            node.range()
        );
        let heredocs = heredoc_spans(&block.node);
        Some(ManifestBlock {
            receiver_name,
            call: node.clone(),
            node: block.node,
            parameters,
            statements: block
                .statements
                .into_iter()
                .filter(|statement| statement.kind() != "heredoc_body")
                .collect(),
            closer: block.closer,
            heredocs,
        })
    }
}

/// Pair heredoc openers with their bodies; both appear in source order
fn heredoc_spans(block: &RubyNode<'_>) -> Vec<(usize, usize)> {
    let mut openers = Vec::new();
    let mut bodies = Vec::new();
    let mut stack = vec![block.clone()];
    while let Some(node) = stack.pop() {
        match node.kind().as_ref() {
            "heredoc_beginning" => openers.push(node.range().start),
            "heredoc_body" => {
                // the terminator line's newline belongs to the next line
                let text = node.text();
                let body = text.trim_end_matches(['\r', '\n']);
                bodies.push(node.range().start + body.len());
                continue;
            }
            _ => {}
        }
        stack.extend(node.children());
    }
    openers.sort_unstable();
    bodies.sort_unstable();
    openers.into_iter().zip(bodies).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceBuffer;
    use crate::syntax::SyntaxTree;

    fn locate_in(text: &str, config: &RewriteConfig) -> Option<(String, usize)> {
        let buffer = SourceBuffer::new(text);
        let tree = SyntaxTree::parse(&buffer, "test.gemspec").unwrap();
        let root = tree.root();
        BlockLocator::new(config)
            .scan(&root)
            .map(|scan| {
                (
                    scan.block().receiver_name().to_string(),
                    scan.block().statements().len(),
                )
            })
    }

    #[test]
    fn test_locates_standard_block() {
        let text = "# frozen_string_literal: true\n\nrequire_relative 'lib/demo/version'\n\nGem::Specification.new do |s|\n  s.name = 'demo'\n  s.version = '1.0'\nend\n";
        let found = locate_in(text, &RewriteConfig::default());
        assert_eq!(found, Some(("s".to_string(), 2)));
    }

    #[test]
    fn test_brace_block_and_root_qualifier() {
        let text = "::Gem::Specification.new { |spec| spec.name = 'x' }\n";
        let found = locate_in(text, &RewriteConfig::default());
        assert_eq!(found, Some(("spec".to_string(), 1)));
    }

    #[test]
    fn test_other_constructors_are_ignored() {
        let text = "Gem::Other.new do |spec|\n  spec.name = 'x'\nend\nFoo.new do |spec|\nend\n";
        assert!(locate_in(text, &RewriteConfig::default()).is_none());
    }

    #[test]
    fn test_parameter_count_must_be_one() {
        let text = "Gem::Specification.new do |spec, extra|\n  spec.name = 'x'\nend\nGem::Specification.new do\nend\n";
        assert!(locate_in(text, &RewriteConfig::default()).is_none());
    }

    #[test]
    fn test_configured_single_segment_constructor() {
        let text = "Block.new do |spec|\n  spec.name = 'foo'\nend\n";
        assert!(locate_in(text, &RewriteConfig::default()).is_none());
        let config = RewriteConfig::default().with_constructor("Block");
        assert_eq!(locate_in(text, &config), Some(("spec".to_string(), 1)));
    }

    #[test]
    fn test_first_block_wins_and_nested_blocks_are_inert() {
        let text = "Gem::Specification.new do |outer|\n  Gem::Specification.new do |inner|\n    inner.name = 'nested'\n  end\n  outer.name = 'top'\nend\n";
        let buffer = SourceBuffer::new(text);
        let tree = SyntaxTree::parse(&buffer, "nested.gemspec").unwrap();
        let root = tree.root();
        let scan = BlockLocator::new(&RewriteConfig::default())
            .scan(&root)
            .unwrap();
        assert_eq!(scan.block().receiver_name(), "outer");
        let names: Vec<_> = scan.catalog().attributes().map(|a| a.name().to_string()).collect();
        assert_eq!(names, vec!["name".to_string()]);
        assert_eq!(
            scan.catalog().attribute("name").unwrap().value().source(),
            "'top'"
        );
    }

    #[test]
    fn test_last_child_before_closer() {
        let text = "Gem::Specification.new do |spec|\n  spec.name = 'x'\n  # trailing note\nend\n";
        let buffer = SourceBuffer::new(text);
        let tree = SyntaxTree::parse(&buffer, "t.gemspec").unwrap();
        let root = tree.root();
        let scan = BlockLocator::new(&RewriteConfig::default())
            .scan(&root)
            .unwrap();
        let last = scan.block().last_child_before_closer();
        assert!(last.kind() == "comment" || last.kind() == "body_statement");

        let empty = "Gem::Specification.new do |spec|\nend\n";
        let buffer = SourceBuffer::new(empty);
        let tree = SyntaxTree::parse(&buffer, "e.gemspec").unwrap();
        let root = tree.root();
        let scan = BlockLocator::new(&RewriteConfig::default())
            .scan(&root)
            .unwrap();
        assert!(scan.block().statements().is_empty());
        assert_eq!(scan.block().last_child_before_closer().kind(), "block_parameters");
    }
}
