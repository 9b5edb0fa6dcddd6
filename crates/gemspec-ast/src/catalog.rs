//! Typed view of the statements inside the manifest block
//!
//! Only two statement shapes are understood:
//! - `spec.add_dependency 'name', 'req', ...` (and the runtime/development verbs)
//! - `spec.attr = value`
//!
//! Everything else is left alone and never edited.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Range;
use tracing::{debug, warn};

use crate::locator::ManifestBlock;
use crate::syntax::{call_parts, identifier_name, string_literal, RubyNode, StringLiteral};

/// Which dependency verb a declaration uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    #[default]
    Generic,
    Runtime,
    Development,
}

impl MethodKind {
    pub const ALL: [MethodKind; 3] = [
        MethodKind::Generic,
        MethodKind::Runtime,
        MethodKind::Development,
    ];

    /// Canonical method name for this kind
    pub fn verb(self) -> &'static str {
        match self {
            MethodKind::Generic => "add_dependency",
            MethodKind::Runtime => "add_runtime_dependency",
            MethodKind::Development => "add_development_dependency",
        }
    }

    pub fn from_verb(verb: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.verb() == verb)
    }

    /// `Generic` and `Runtime` share a category
    pub fn category(self) -> Category {
        match self {
            MethodKind::Generic | MethodKind::Runtime => Category::Runtime,
            MethodKind::Development => Category::Development,
        }
    }
}

/// Binary dependency classification used for conflict detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Runtime,
    Development,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Runtime => write!(f, "RUNTIME"),
            Category::Development => write!(f, "DEVELOPMENT"),
        }
    }
}

/// `spec.add_dependency 'name', 'req', ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDeclaration {
    method_kind: MethodKind,
    gem_name: String,
    version_constraints: SmallVec<[String; 2]>,
}

impl DependencyDeclaration {
    pub fn new<I, S>(method_kind: MethodKind, gem_name: impl Into<String>, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DependencyDeclaration {
            method_kind,
            gem_name: gem_name.into(),
            version_constraints: constraints.into_iter().map(Into::into).collect(),
        }
    }

    pub fn method_kind(&self) -> MethodKind {
        self.method_kind
    }

    pub fn gem_name(&self) -> &str {
        &self.gem_name
    }

    pub fn version_constraints(&self) -> &[String] {
        &self.version_constraints
    }
}

/// Right-hand side of an attribute assignment, kept as source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    source: String,
    range: Range<usize>,
    literal: Option<StringLiteral>,
    heredoc_end: Option<usize>,
}

impl AttributeValue {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// The value when it is a plain string literal
    pub fn literal(&self) -> Option<&StringLiteral> {
        self.literal.as_ref()
    }

    /// End of heredoc bodies that the value opens on later lines
    pub fn heredoc_end(&self) -> Option<usize> {
        self.heredoc_end
    }
}

/// `spec.name = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDeclaration {
    name: String,
    value: AttributeValue,
}

impl AttributeDeclaration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Dependency(DependencyDeclaration),
    Attribute(AttributeDeclaration),
}

/// A recognized statement and the node it came from
#[derive(Clone)]
pub struct CatalogEntry<'r> {
    node: RubyNode<'r>,
    extent: Range<usize>,
    declaration: Declaration,
    quote: Option<char>,
    parenthesized: bool,
}

impl<'r> CatalogEntry<'r> {
    pub fn node(&self) -> &RubyNode<'r> {
        &self.node
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    /// Byte range of the whole statement, heredoc bodies included
    pub fn range(&self) -> Range<usize> {
        self.extent.clone()
    }

    pub fn as_dependency(&self) -> Option<&DependencyDeclaration> {
        match &self.declaration {
            Declaration::Dependency(dep) => Some(dep),
            Declaration::Attribute(_) => None,
        }
    }

    pub fn as_attribute(&self) -> Option<&AttributeDeclaration> {
        match &self.declaration {
            Declaration::Attribute(attr) => Some(attr),
            Declaration::Dependency(_) => None,
        }
    }

    /// Quote character of the dependency's gem name literal
    pub fn quote(&self) -> Option<char> {
        self.quote
    }

    /// Whether the dependency call wraps its arguments in parentheses
    pub fn is_parenthesized(&self) -> bool {
        self.parenthesized
    }
}

impl fmt::Debug for CatalogEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogEntry")
            .field("range", &self.range())
            .field("declaration", &self.declaration)
            .field("quote", &self.quote)
            .field("parenthesized", &self.parenthesized)
            .finish()
    }
}

/// Ordered catalog of the manifest block's recognized statements
#[derive(Debug, Clone)]
pub struct Catalog<'r> {
    receiver_name: String,
    entries: Vec<CatalogEntry<'r>>,
    /// Gem names of dependency calls that could not be cataloged
    skipped: Vec<String>,
}

impl<'r> Catalog<'r> {
    /// Classify every direct statement of `block`
    pub fn build(block: &ManifestBlock<'r>) -> Self {
        let receiver = block.receiver_name();
        let mut entries = Vec::new();
        let mut skipped = Vec::new();
        for statement in block.statements() {
            let classified = match classify_dependency(block, statement) {
                Classified::Entry(entry) => Some(entry),
                Classified::Skipped(name) => {
                    skipped.extend(name);
                    None
                }
                Classified::NotDependency => classify_attribute(block, statement),
            };
            if let Some(entry) = classified {
                debug!(
                    "Cataloged {:?} at bytes {:?}",
                    entry.declaration,
                    entry.range()
                );
                entries.push(entry);
            }
        }
        Catalog {
            receiver_name: receiver.to_string(),
            entries,
            skipped,
        }
    }

    pub fn receiver_name(&self) -> &str {
        &self.receiver_name
    }

    pub fn entries(&self) -> &[CatalogEntry<'r>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyDeclaration> + '_ {
        self.entries.iter().filter_map(CatalogEntry::as_dependency)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDeclaration> + '_ {
        self.entries.iter().filter_map(CatalogEntry::as_attribute)
    }

    /// Last assignment of an attribute, mirroring evaluation order
    pub fn attribute(&self, name: &str) -> Option<&AttributeDeclaration> {
        self.entries
            .iter()
            .rev()
            .filter_map(CatalogEntry::as_attribute)
            .find(|attr| attr.name() == name)
    }

    /// Whether a dependency call naming `gem` was left out of the catalog
    pub fn has_skipped_dependency(&self, gem: &str) -> bool {
        self.skipped.iter().any(|name| name == gem)
    }
}

enum Classified<'r> {
    Entry(CatalogEntry<'r>),
    /// A dependency verb with unusable arguments, and its literal gem name if any
    Skipped(Option<String>),
    NotDependency,
}

fn receiver_matches(receiver: Option<&RubyNode<'_>>, receiver_name: &str) -> bool {
    receiver
        .and_then(identifier_name)
        .is_some_and(|name| name == receiver_name)
}

fn classify_dependency<'r>(block: &ManifestBlock<'r>, statement: &RubyNode<'r>) -> Classified<'r> {
    let Some(call) = call_parts(statement) else {
        return Classified::NotDependency;
    };
    if !receiver_matches(call.receiver.as_ref(), block.receiver_name()) || call.block.is_some() {
        return Classified::NotDependency;
    }
    let Some(method_kind) = MethodKind::from_verb(&call.method_name()) else {
        return Classified::NotDependency;
    };

    let arguments = call.argument_nodes();
    let literals: Option<Vec<StringLiteral>> = arguments.iter().map(string_literal).collect();
    let literals = match literals {
        Some(literals) if literals.len() >= 2 => literals,
        _ => {
            warn!(
                "Skipping {} call with non-literal or missing arguments: {}",
                method_kind.verb(),
                statement.text().lines().next().unwrap_or_default()
            );
            let name = arguments
                .first()
                .and_then(string_literal)
                .map(|literal| literal.value);
            return Classified::Skipped(name);
        }
    };

    let quote = literals[0].quote;
    let mut values = literals.into_iter().map(|literal| literal.value);
    let Some(gem_name) = values.next() else {
        return Classified::Skipped(None);
    };
    Classified::Entry(CatalogEntry {
        node: statement.clone(),
        extent: block.statement_extent(statement),
        declaration: Declaration::Dependency(DependencyDeclaration::new(
            method_kind,
            gem_name,
            values,
        )),
        quote: Some(quote),
        parenthesized: call.is_parenthesized(),
    })
}

fn classify_attribute<'r>(block: &ManifestBlock<'r>, statement: &RubyNode<'r>) -> Option<CatalogEntry<'r>> {
    if statement.kind() != "assignment" {
        return None;
    }
    let left = statement.field("left")?;
    let right = statement.field("right")?;
    let call = call_parts(&left)?;
    if !receiver_matches(call.receiver.as_ref(), block.receiver_name())
        || call.arguments.is_some()
        || call.block.is_some()
        || call.method.kind() != "identifier"
    {
        return None;
    }

    let range = right.range();
    let value = AttributeValue {
        source: right.text().to_string(),
        heredoc_end: block
            .heredoc_end(range.clone())
            .filter(|&end| end > range.end),
        range,
        literal: string_literal(&right),
    };
    Some(CatalogEntry {
        node: statement.clone(),
        extent: block.statement_extent(statement),
        declaration: Declaration::Attribute(AttributeDeclaration {
            name: call.method_name().trim_end_matches('=').to_string(),
            value,
        }),
        quote: None,
        parenthesized: false,
    })
}
