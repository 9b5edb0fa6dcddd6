//! Orchestration of a single rewrite
//!
//! A session walks `Idle -> Parsing -> Locating -> Cataloging -> AwaitingInstructions ->
//! Editing -> Done`, dropping to `Failed` on the first error. The state survives the call so
//! that a session left mid-run (a panicking instruction callback) refuses to start again.

use gemspec_ast::{BlockLocator, SourceBuffer, SyntaxTree};
use gemspec_config::RewriteConfig;
use std::fmt;
use tracing::{debug, info};

use crate::editor::{CatalogEditor, ManifestEditor};
use crate::errors::RewriteError;
use crate::snapshot::{CatalogEvaluator, EvaluationContext, ManifestSnapshot, SnapshotEvaluator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Parsing,
    Locating,
    Cataloging,
    AwaitingInstructions,
    Editing,
    Done,
    Failed,
}

impl SessionState {
    /// Whether a new rewrite may start from this state
    pub fn is_resting(self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Done | SessionState::Failed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Parsing => "parsing",
            SessionState::Locating => "locating",
            SessionState::Cataloging => "cataloging",
            SessionState::AwaitingInstructions => "awaiting instructions",
            SessionState::Editing => "editing",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Rewrites manifest text according to caller instructions
pub struct RewriteSession<E = CatalogEvaluator> {
    config: RewriteConfig,
    evaluator: E,
    state: SessionState,
}

impl RewriteSession {
    pub fn new(config: RewriteConfig) -> Self {
        Self::with_evaluator(config, CatalogEvaluator)
    }
}

impl Default for RewriteSession {
    fn default() -> Self {
        Self::new(RewriteConfig::default())
    }
}

impl<E: SnapshotEvaluator> RewriteSession<E> {
    pub fn with_evaluator(config: RewriteConfig, evaluator: E) -> Self {
        RewriteSession {
            config,
            evaluator,
            state: SessionState::Idle,
        }
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run `instructions` against the manifest block in `source` and return the new text
    ///
    /// `label` only appears in diagnostics. The callback runs exactly once. Any failed
    /// editor operation fails the whole rewrite, even if the callback ignored the error.
    pub fn rewrite<F>(
        &mut self,
        source: &str,
        label: &str,
        instructions: F,
    ) -> Result<String, RewriteError>
    where
        F: FnOnce(&mut dyn ManifestEditor) -> Result<(), RewriteError>,
    {
        if !self.state.is_resting() {
            return Err(RewriteError::InternalInvariant(format!(
                "rewrite session re-entered while {}",
                self.state
            )));
        }

        let result = self.run(source, label, instructions);
        match &result {
            Ok(_) => self.enter(SessionState::Done),
            Err(err) => {
                debug!("Rewrite of {} failed: {}", label, err);
                self.enter(SessionState::Failed);
            }
        }
        result
    }

    /// Snapshot of the manifest without editing it
    pub fn inspect(&mut self, source: &str, label: &str) -> Result<ManifestSnapshot, RewriteError> {
        let mut snapshot = None;
        self.rewrite(source, label, |editor| {
            snapshot = Some(editor.snapshot().clone());
            Ok(())
        })?;
        snapshot.ok_or_else(|| {
            RewriteError::InternalInvariant("instruction callback did not run".to_string())
        })
    }

    fn enter(&mut self, next: SessionState) {
        debug!("Session {} -> {}", self.state, next);
        self.state = next;
    }

    fn run<F>(&mut self, source: &str, label: &str, instructions: F) -> Result<String, RewriteError>
    where
        F: FnOnce(&mut dyn ManifestEditor) -> Result<(), RewriteError>,
    {
        self.enter(SessionState::Parsing);
        let buffer = SourceBuffer::new(source);
        let tree = SyntaxTree::parse(&buffer, label)?;
        let root = tree.root();

        self.enter(SessionState::Locating);
        let scan = BlockLocator::new(&self.config)
            .scan(&root)
            .ok_or_else(|| RewriteError::Structure {
                label: label.to_string(),
                constructor: self.config.constructor.clone(),
            })?;

        self.enter(SessionState::Cataloging);
        let (block, catalog) = scan.into_parts();
        info!(
            "{}: manifest block '{}' with {} cataloged statements",
            label,
            block.receiver_name(),
            catalog.len()
        );
        let snapshot = self
            .evaluator
            .evaluate(&EvaluationContext::new(label, &buffer, &catalog))?;

        self.enter(SessionState::AwaitingInstructions);
        let mut editor = CatalogEditor::new(&buffer, &block, &catalog, &self.config, snapshot);
        instructions(&mut editor)?;
        if let Some(err) = editor.take_failure() {
            return Err(err);
        }

        let edits = editor.into_edits()?;
        self.enter(SessionState::Editing);
        if edits.is_empty() {
            return Ok(source.to_string());
        }
        let output = edits.apply(source)?;

        // the result must still be a valid manifest
        let rewritten = SourceBuffer::new(output.as_str());
        SyntaxTree::parse(&rewritten, label).map_err(|err| {
            RewriteError::InternalInvariant(format!("rewritten text no longer parses: {}", err))
        })?;
        Ok(output)
    }
}
