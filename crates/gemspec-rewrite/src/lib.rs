//! Format-preserving rewriting of gemspec manifests
//!
//! A [`RewriteSession`] parses the manifest, finds the `Gem::Specification.new do |spec|`
//! block, catalogs its dependency and attribute statements and hands a [`ManifestEditor`]
//! to the caller. Whatever the caller asks for is turned into a small set of byte-range
//! edits, so everything outside the touched statements comes back byte for byte.
//!
//! ```no_run
//! use gemspec_rewrite::{RewriteSession, ManifestEditor};
//!
//! let source = "Gem::Specification.new do |spec|\n  spec.name = 'demo'\nend\n";
//! let mut session = RewriteSession::default();
//! let output = session.rewrite(source, "demo.gemspec", |editor| {
//!     editor.add_dependency("rack", &[">= 2.0"])
//! })?;
//! assert!(output.contains("spec.add_dependency 'rack', '>= 2.0'"));
//! # Ok::<(), gemspec_rewrite::RewriteError>(())
//! ```
pub mod edit;
pub mod editor;
pub mod errors;
pub mod layout;
pub mod script;
pub mod session;
pub mod snapshot;

pub use editor::{CatalogEditor, DependencyRequest, ManifestEditor};
pub use errors::RewriteError;
pub use gemspec_ast::{Category, MethodKind};
pub use gemspec_config::{QuoteStyle, RewriteConfig};
pub use script::{Instruction, InstructionScript, ScriptError};
pub use session::{RewriteSession, SessionState};
pub use snapshot::{
    CatalogEvaluator, EvaluationContext, ManifestSnapshot, SnapshotDependency, SnapshotEvaluator,
};
