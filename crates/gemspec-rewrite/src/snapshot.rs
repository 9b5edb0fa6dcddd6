//! Read-only view of the manifest handed to instruction callbacks
//!
//! The engine never evaluates Ruby. A [`SnapshotEvaluator`] receives a borrowed
//! [`EvaluationContext`] for the duration of one call and produces a [`ManifestSnapshot`];
//! the default [`CatalogEvaluator`] reads literal values straight from the catalog.

use gemspec_ast::{Catalog, MethodKind, SourceBuffer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::RewriteError;

/// One dependency as seen by the snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotDependency {
    pub name: String,
    pub kind: MethodKind,
    pub requirements: Vec<String>,
}

/// What callers may know about the manifest before editing it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSnapshot {
    pub name: Option<String>,
    pub version: Option<String>,
    pub dependencies: Vec<SnapshotDependency>,
    /// Attribute name to right-hand side source, last assignment wins
    pub attributes: BTreeMap<String, String>,
}

impl ManifestSnapshot {
    pub fn dependency(&self, name: &str) -> Option<&SnapshotDependency> {
        self.dependencies.iter().find(|dep| dep.name == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Borrowed inputs available while a snapshot is produced
pub struct EvaluationContext<'a, 'r> {
    label: &'a str,
    buffer: &'a SourceBuffer,
    catalog: &'a Catalog<'r>,
}

impl<'a, 'r> EvaluationContext<'a, 'r> {
    pub fn new(label: &'a str, buffer: &'a SourceBuffer, catalog: &'a Catalog<'r>) -> Self {
        EvaluationContext {
            label,
            buffer,
            catalog,
        }
    }

    pub fn label(&self) -> &str {
        self.label
    }

    pub fn source(&self) -> &str {
        self.buffer.text()
    }

    pub fn catalog(&self) -> &Catalog<'r> {
        self.catalog
    }
}

/// Produces the snapshot for one session
pub trait SnapshotEvaluator {
    fn evaluate(&self, context: &EvaluationContext<'_, '_>) -> Result<ManifestSnapshot, RewriteError>;
}

/// Builds the snapshot from cataloged literals only
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogEvaluator;

impl SnapshotEvaluator for CatalogEvaluator {
    fn evaluate(&self, context: &EvaluationContext<'_, '_>) -> Result<ManifestSnapshot, RewriteError> {
        let catalog = context.catalog();
        let literal = |name: &str| {
            catalog
                .attribute(name)
                .and_then(|attr| attr.value().literal())
                .map(|literal| literal.value.clone())
        };

        let dependencies = catalog
            .dependencies()
            .map(|dep| SnapshotDependency {
                name: dep.gem_name().to_string(),
                kind: dep.method_kind(),
                requirements: dep.version_constraints().to_vec(),
            })
            .collect();
        let attributes = catalog
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().source().to_string()))
            .collect();

        Ok(ManifestSnapshot {
            name: literal("name"),
            version: literal("version"),
            dependencies,
            attributes,
        })
    }
}
