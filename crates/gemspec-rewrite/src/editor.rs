//! Mutation operations exposed to instruction callbacks
//!
//! [`CatalogEditor`] keeps a working copy of every cataloged statement and of the
//! statements appended during the session. Operations only change that working copy;
//! [`CatalogEditor::into_edits`] turns the final state into byte-range edits once, which
//! keeps repeated instructions idempotent and edits non-overlapping.

use gemspec_ast::{
    Catalog, Declaration, DependencyDeclaration, ManifestBlock, MethodKind, SourceBuffer,
    SyntaxTree,
};
use gemspec_config::RewriteConfig;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::edit::EditSet;
use crate::errors::RewriteError;
use crate::layout::{
    append_statements, quote_literal, render_attribute, render_dependency, statement_removal,
};
use crate::snapshot::ManifestSnapshot;

/// Add or update a dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRequest {
    pub name: String,
    pub requirements: SmallVec<[String; 2]>,
    pub kind: MethodKind,
    /// Allow moving a dependency between RUNTIME and DEVELOPMENT
    pub force_type_change: bool,
}

impl DependencyRequest {
    pub fn new<I, S>(name: impl Into<String>, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DependencyRequest {
            name: name.into(),
            requirements: requirements
                .into_iter()
                .map(|req| req.as_ref().to_string())
                .collect(),
            kind: MethodKind::Generic,
            force_type_change: false,
        }
    }

    pub fn with_kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force_type_change = force;
        self
    }

    fn validate(&self) -> Result<(), RewriteError> {
        validate_gem_name(&self.name)?;
        if self.requirements.is_empty() {
            return Err(RewriteError::InvalidInstruction(format!(
                "dependency '{}' needs at least one version requirement",
                self.name
            )));
        }
        if self.requirements.iter().any(|req| req.trim().is_empty()) {
            return Err(RewriteError::InvalidInstruction(format!(
                "dependency '{}' has an empty version requirement",
                self.name
            )));
        }
        Ok(())
    }
}

/// Operations available inside [`crate::RewriteSession::rewrite`]
pub trait ManifestEditor {
    /// Identifier bound by the manifest block, e.g. `spec`
    fn receiver_name(&self) -> &str;

    /// Read-only view of the manifest as it was before this session's edits
    fn snapshot(&self) -> &ManifestSnapshot;

    fn upsert_dependency(&mut self, request: DependencyRequest) -> Result<(), RewriteError>;

    /// Remove every declaration of `name`; absent dependencies are a no-op
    fn remove_dependency(&mut self, name: &str) -> Result<(), RewriteError>;

    /// Set an attribute to a raw Ruby expression
    fn set_attribute(&mut self, name: &str, expression: &str) -> Result<(), RewriteError>;

    /// Set an attribute to a string literal
    fn set_string_attribute(&mut self, name: &str, value: &str) -> Result<(), RewriteError>;

    fn remove_attribute(&mut self, name: &str) -> Result<(), RewriteError>;

    fn add_dependency(&mut self, name: &str, requirements: &[&str]) -> Result<(), RewriteError> {
        self.upsert_dependency(DependencyRequest::new(name, requirements))
    }

    fn add_runtime_dependency(
        &mut self,
        name: &str,
        requirements: &[&str],
    ) -> Result<(), RewriteError> {
        self.upsert_dependency(
            DependencyRequest::new(name, requirements).with_kind(MethodKind::Runtime),
        )
    }

    fn add_development_dependency(
        &mut self,
        name: &str,
        requirements: &[&str],
    ) -> Result<(), RewriteError> {
        self.upsert_dependency(
            DependencyRequest::new(name, requirements).with_kind(MethodKind::Development),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Working {
    Dependency(DependencyDeclaration),
    Attribute { name: String, value: String },
}

#[derive(Debug, Clone)]
struct WorkingEntry {
    /// Index into the catalog, `None` for statements appended this session
    origin: Option<usize>,
    /// `None` once removed
    current: Option<Working>,
    changed: bool,
}

impl WorkingEntry {
    fn dependency(&self, name: &str) -> Option<&DependencyDeclaration> {
        match &self.current {
            Some(Working::Dependency(dep)) if dep.gem_name() == name => Some(dep),
            _ => None,
        }
    }

    fn is_attribute(&self, name: &str) -> bool {
        matches!(&self.current, Some(Working::Attribute { name: attr, .. }) if attr == name)
    }

    fn update(&mut self, next: Option<Working>) {
        if self.current != next {
            self.current = next;
            self.changed = true;
        }
    }
}

/// [`ManifestEditor`] over a cataloged manifest block
pub struct CatalogEditor<'s, 'r> {
    buffer: &'s SourceBuffer,
    block: &'s ManifestBlock<'r>,
    catalog: &'s Catalog<'r>,
    config: &'s RewriteConfig,
    snapshot: ManifestSnapshot,
    entries: Vec<WorkingEntry>,
    failure: Option<RewriteError>,
}

impl<'s, 'r> CatalogEditor<'s, 'r> {
    pub fn new(
        buffer: &'s SourceBuffer,
        block: &'s ManifestBlock<'r>,
        catalog: &'s Catalog<'r>,
        config: &'s RewriteConfig,
        snapshot: ManifestSnapshot,
    ) -> Self {
        let entries = catalog
            .entries()
            .iter()
            .enumerate()
            .map(|(idx, entry)| WorkingEntry {
                origin: Some(idx),
                current: Some(match entry.declaration() {
                    Declaration::Dependency(dep) => Working::Dependency(dep.clone()),
                    Declaration::Attribute(attr) => Working::Attribute {
                        name: attr.name().to_string(),
                        value: attr.value().source().to_string(),
                    },
                }),
                changed: false,
            })
            .collect();

        CatalogEditor {
            buffer,
            block,
            catalog,
            config,
            snapshot,
            entries,
            failure: None,
        }
    }

    /// First error any operation returned, even if the callback swallowed it
    pub fn take_failure(&mut self) -> Option<RewriteError> {
        self.failure.take()
    }

    /// Translate the working state into edits against the original buffer
    pub fn into_edits(self) -> Result<EditSet, RewriteError> {
        let receiver = self.block.receiver_name();
        let default_quote = self.config.quote.as_char();
        let mut edits = EditSet::new();
        let mut appended = Vec::new();

        for entry in &self.entries {
            let Some(idx) = entry.origin else {
                match &entry.current {
                    Some(Working::Dependency(dep)) => {
                        appended.push(render_dependency(receiver, dep, default_quote, false));
                    }
                    Some(Working::Attribute { name, value }) => {
                        appended.push(render_attribute(receiver, name, value));
                    }
                    None => {}
                }
                continue;
            };
            if !entry.changed {
                continue;
            }

            let original = self.catalog.entries().get(idx).ok_or_else(|| {
                RewriteError::InternalInvariant(format!("catalog entry {idx} vanished"))
            })?;
            match &entry.current {
                None => edits.delete(statement_removal(self.buffer, original.range())),
                Some(Working::Dependency(dep)) => {
                    let quote = original.quote().unwrap_or(default_quote);
                    let text = render_dependency(receiver, dep, quote, original.is_parenthesized());
                    if text != original.node().text() {
                        edits.replace(original.range(), text);
                    }
                }
                Some(Working::Attribute { value, .. }) => {
                    let attr = original.as_attribute().ok_or_else(|| {
                        RewriteError::InternalInvariant(format!(
                            "catalog entry {idx} is not an attribute"
                        ))
                    })?;
                    if value != attr.value().source() {
                        let range = attr.value().range();
                        edits.replace(range.clone(), value.clone());
                        // the opener line keeps its trailing comment, the body lines go
                        if let Some(body_end) = attr.value().heredoc_end() {
                            let tail = self.buffer.line_end(range.end);
                            if tail < body_end {
                                edits.delete(tail..body_end);
                            }
                        }
                    }
                }
            }
        }

        if !appended.is_empty() {
            edits.push(append_statements(
                self.buffer,
                self.block,
                self.config,
                &appended,
            )?);
        }
        debug!("Materialized {} edits", edits.len());
        Ok(edits)
    }

    fn record<T>(&mut self, result: Result<T, RewriteError>) -> Result<T, RewriteError> {
        if let Err(err) = &result {
            if self.failure.is_none() {
                self.failure = Some(err.clone());
            }
        }
        result
    }

    fn upsert(&mut self, request: &DependencyRequest) -> Result<(), RewriteError> {
        request.validate()?;
        let requested = request.kind.category();
        let matches: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.dependency(&request.name).is_some())
            .map(|(idx, _)| idx)
            .collect();

        if matches.is_empty() {
            if self.catalog.has_skipped_dependency(&request.name) {
                warn!(
                    "'{}' already has a declaration that cannot be edited; adding another",
                    request.name
                );
            }
            info!("Adding dependency '{}'", request.name);
            self.entries.push(WorkingEntry {
                origin: None,
                current: Some(Working::Dependency(DependencyDeclaration::new(
                    request.kind,
                    &request.name,
                    request.requirements.iter(),
                ))),
                changed: true,
            });
            return Ok(());
        }

        if !request.force_type_change {
            let conflict = matches
                .iter()
                .filter_map(|&idx| self.entries[idx].dependency(&request.name))
                .map(|dep| dep.method_kind().category())
                .find(|existing| *existing != requested);
            if let Some(existing) = conflict {
                return Err(RewriteError::TypeConflict {
                    gem: request.name.clone(),
                    existing,
                    requested,
                });
            }
        }

        info!(
            "Updating {} declaration(s) of '{}'",
            matches.len(),
            request.name
        );
        for idx in matches {
            let entry = &mut self.entries[idx];
            let Some(existing) = entry.dependency(&request.name) else {
                continue;
            };
            let kind = if existing.method_kind().category() == requested {
                existing.method_kind()
            } else {
                request.kind
            };
            entry.update(Some(Working::Dependency(DependencyDeclaration::new(
                kind,
                &request.name,
                request.requirements.iter(),
            ))));
        }
        Ok(())
    }

    fn remove_dependency_entries(&mut self, name: &str) -> Result<(), RewriteError> {
        validate_gem_name(name)?;
        let mut removed = 0;
        for entry in &mut self.entries {
            if entry.dependency(name).is_some() {
                entry.update(None);
                removed += 1;
            }
        }
        if self.catalog.has_skipped_dependency(name) {
            warn!(
                "'{}' has a declaration that cannot be edited; leaving it in place",
                name
            );
        }
        debug!("Removed {} declaration(s) of '{}'", removed, name);
        Ok(())
    }

    /// Set every occurrence of `name`; `render` gets the original literal quote, if any
    fn assign(
        &mut self,
        name: &str,
        render: impl Fn(Option<char>) -> String,
    ) -> Result<(), RewriteError> {
        validate_attribute_name(name)?;
        let catalog = self.catalog;
        let mut found = false;
        for entry in &mut self.entries {
            if !entry.is_attribute(name) {
                continue;
            }
            found = true;
            let quote = entry
                .origin
                .and_then(|idx| catalog.entries().get(idx))
                .and_then(|original| original.as_attribute())
                .and_then(|attr| attr.value().literal())
                .map(|literal| literal.quote);
            entry.update(Some(Working::Attribute {
                name: name.to_string(),
                value: render(quote),
            }));
        }

        if !found {
            info!("Adding attribute '{}'", name);
            self.entries.push(WorkingEntry {
                origin: None,
                current: Some(Working::Attribute {
                    name: name.to_string(),
                    value: render(None),
                }),
                changed: true,
            });
        }
        Ok(())
    }

    fn remove_attribute_entries(&mut self, name: &str) -> Result<(), RewriteError> {
        validate_attribute_name(name)?;
        for entry in &mut self.entries {
            if entry.is_attribute(name) {
                entry.update(None);
            }
        }
        Ok(())
    }
}

impl ManifestEditor for CatalogEditor<'_, '_> {
    fn receiver_name(&self) -> &str {
        self.block.receiver_name()
    }

    fn snapshot(&self) -> &ManifestSnapshot {
        &self.snapshot
    }

    fn upsert_dependency(&mut self, request: DependencyRequest) -> Result<(), RewriteError> {
        let result = self.upsert(&request);
        self.record(result)
    }

    fn remove_dependency(&mut self, name: &str) -> Result<(), RewriteError> {
        let result = self.remove_dependency_entries(name);
        self.record(result)
    }

    fn set_attribute(&mut self, name: &str, expression: &str) -> Result<(), RewriteError> {
        let result = validate_expression(name, expression).and_then(|()| {
            let expression = expression.trim().to_string();
            self.assign(name, |_| expression.clone())
        });
        self.record(result)
    }

    fn set_string_attribute(&mut self, name: &str, value: &str) -> Result<(), RewriteError> {
        let default_quote = self.config.quote.as_char();
        let result = self.assign(name, |quote| {
            quote_literal(value, quote.unwrap_or(default_quote))
        });
        self.record(result)
    }

    fn remove_attribute(&mut self, name: &str) -> Result<(), RewriteError> {
        let result = self.remove_attribute_entries(name);
        self.record(result)
    }
}

fn validate_gem_name(name: &str) -> Result<(), RewriteError> {
    if name.trim().is_empty() {
        return Err(RewriteError::InvalidInstruction(
            "gem name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// The expression must be non-empty and parse on its own
fn validate_expression(name: &str, expression: &str) -> Result<(), RewriteError> {
    if expression.trim().is_empty() {
        return Err(RewriteError::InvalidInstruction(format!(
            "attribute '{}' needs a non-empty expression",
            name
        )));
    }
    let buffer = SourceBuffer::new(expression.trim());
    SyntaxTree::parse(&buffer, name).map_err(|err| {
        RewriteError::InvalidInstruction(format!(
            "expression for attribute '{}' is not valid Ruby: {}",
            name, err.message
        ))
    })?;
    Ok(())
}

fn validate_attribute_name(name: &str) -> Result<(), RewriteError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(RewriteError::InvalidInstruction(format!(
            "'{}' is not a valid attribute name",
            name
        )));
    }
    Ok(())
}
