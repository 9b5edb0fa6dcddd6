//! Declarative instruction scripts
//!
//! A script is a TOML file with one `[[instructions]]` table per operation:
//!
//! ```toml
//! [[instructions]]
//! action = "add_dependency"
//! name = "rack"
//! requirements = [">= 2.0"]
//! kind = "runtime"
//!
//! [[instructions]]
//! action = "set_attribute"
//! name = "summary"
//! string = "Rack tooling"
//! ```

use gemspec_ast::MethodKind;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::editor::{DependencyRequest, ManifestEditor};
use crate::errors::RewriteError;

/// Errors raised while loading a script
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse instruction script: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Instruction {index}: {message}")]
    Invalid { index: usize, message: String },
}

/// One scripted operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Instruction {
    AddDependency {
        name: String,
        requirements: Vec<String>,
        #[serde(default)]
        kind: MethodKind,
        #[serde(default)]
        force: bool,
    },
    RemoveDependency {
        name: String,
    },
    SetAttribute {
        name: String,
        /// Written as a string literal
        #[serde(default, skip_serializing_if = "Option::is_none")]
        string: Option<String>,
        /// Written verbatim
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expression: Option<String>,
    },
    RemoveAttribute {
        name: String,
    },
}

impl Instruction {
    pub fn apply(&self, editor: &mut dyn ManifestEditor) -> Result<(), RewriteError> {
        match self {
            Instruction::AddDependency {
                name,
                requirements,
                kind,
                force,
            } => editor.upsert_dependency(
                DependencyRequest::new(name.as_str(), requirements)
                    .with_kind(*kind)
                    .forced(*force),
            ),
            Instruction::RemoveDependency { name } => editor.remove_dependency(name),
            Instruction::SetAttribute {
                name,
                string: Some(value),
                expression: None,
            } => editor.set_string_attribute(name, value),
            Instruction::SetAttribute {
                name,
                string: None,
                expression: Some(expression),
            } => editor.set_attribute(name, expression),
            Instruction::SetAttribute { name, .. } => Err(RewriteError::InvalidInstruction(
                format!(
                    "set_attribute '{}' needs exactly one of `string` or `expression`",
                    name
                ),
            )),
            Instruction::RemoveAttribute { name } => editor.remove_attribute(name),
        }
    }

    fn check(&self) -> Result<(), String> {
        match self {
            Instruction::SetAttribute {
                string, expression, ..
            } if string.is_some() == expression.is_some() => {
                Err("set_attribute needs exactly one of `string` or `expression`".to_string())
            }
            Instruction::AddDependency { requirements, .. } if requirements.is_empty() => {
                Err("add_dependency needs at least one requirement".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// An ordered list of instructions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionScript {
    #[serde(default)]
    pub instructions: Vec<Instruction>,
}

impl InstructionScript {
    pub fn from_toml_str(content: &str) -> Result<Self, ScriptError> {
        let script: InstructionScript = toml::from_str(content)?;
        for (index, instruction) in script.instructions.iter().enumerate() {
            instruction
                .check()
                .map_err(|message| ScriptError::Invalid {
                    index: index + 1,
                    message,
                })?;
        }
        debug!("Loaded script with {} instructions", script.len());
        Ok(script)
    }

    pub fn from_path(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Run every instruction in order, stopping at the first error
    pub fn apply(&self, editor: &mut dyn ManifestEditor) -> Result<(), RewriteError> {
        for instruction in &self.instructions {
            debug!("Applying {:?}", instruction);
            instruction.apply(editor)?;
        }
        Ok(())
    }
}
