//! Structural access to gemspec manifests using ast-grep
//!
//! This crate turns manifest text into the pieces the rewriting engine needs:
//! 1. [`SourceBuffer`]: the original bytes plus line/column lookups
//! 2. [`SyntaxTree`]: a tree-sitter Ruby parse that rejects broken input
//! 3. [`BlockLocator`]: finds the `Gem::Specification.new do |spec|` block
//! 4. [`Catalog`]: typed dependency and attribute entries for that block
//!
//! Nothing here mutates text. Byte ranges handed out always refer to the original buffer.
pub mod catalog;
pub mod locator;
pub mod source;
pub mod syntax;

pub use catalog::{
    AttributeDeclaration, AttributeValue, Catalog, CatalogEntry, Category, Declaration,
    DependencyDeclaration, MethodKind,
};
pub use locator::{BlockLocator, ManifestBlock, ManifestScan};
pub use source::SourceBuffer;
pub use syntax::{RubyNode, StringLiteral, SyntaxError, SyntaxTree};
