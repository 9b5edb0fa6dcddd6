//! `add`, `remove` and `apply`: commands that rewrite a manifest

use anyhow::{Context, Result};
use clap::Args;
use gemspec_logger as logger;
use gemspec_rewrite::{
    DependencyRequest, InstructionScript, ManifestEditor, MethodKind, RewriteError,
    RewriteSession,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::{GlobalOpts, Outcome, OutputOpts};

#[derive(Args, Debug, Clone)]
pub struct AddCommand {
    /// Gemspec file to edit
    pub file: PathBuf,
    /// Gem name
    pub name: String,
    /// Version requirements, e.g. ">= 1.0" "< 2"
    #[arg(required = true, num_args = 1..)]
    pub requirements: Vec<String>,
    /// Declare with add_runtime_dependency
    #[arg(long, conflicts_with = "development")]
    pub runtime: bool,
    /// Declare with add_development_dependency
    #[arg(long)]
    pub development: bool,
    /// Allow moving the dependency between runtime and development
    #[arg(long)]
    pub force: bool,
    #[command(flatten)]
    pub output: OutputOpts,
}

impl AddCommand {
    fn request(&self) -> DependencyRequest {
        let kind = if self.runtime {
            MethodKind::Runtime
        } else if self.development {
            MethodKind::Development
        } else {
            MethodKind::Generic
        };
        DependencyRequest::new(self.name.as_str(), &self.requirements)
            .with_kind(kind)
            .forced(self.force)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RemoveCommand {
    /// Gemspec file to edit
    pub file: PathBuf,
    /// Gem name
    pub name: String,
    #[command(flatten)]
    pub output: OutputOpts,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyCommand {
    /// Gemspec file to edit
    pub file: PathBuf,
    /// TOML instruction script
    #[arg(short, long)]
    pub script: PathBuf,
    #[command(flatten)]
    pub output: OutputOpts,
}

pub fn handle_add(cmd: &AddCommand, global: &GlobalOpts) -> Result<Outcome> {
    let request = cmd.request();
    rewrite_file(&cmd.file, &cmd.output, global, |editor| {
        editor.upsert_dependency(request)
    })
}

pub fn handle_remove(cmd: &RemoveCommand, global: &GlobalOpts) -> Result<Outcome> {
    rewrite_file(&cmd.file, &cmd.output, global, |editor| {
        editor.remove_dependency(&cmd.name)
    })
}

pub fn handle_apply(cmd: &ApplyCommand, global: &GlobalOpts) -> Result<Outcome> {
    let script = InstructionScript::from_path(&cmd.script)
        .with_context(|| format!("Failed to load script {}", cmd.script.display()))?;
    logger::debug(&format!(
        "Applying {} instructions from {}",
        script.len(),
        cmd.script.display()
    ));
    rewrite_file(&cmd.file, &cmd.output, global, |editor| script.apply(editor))
}

/// Read `file`, run the instructions and route the result according to `output`
fn rewrite_file<F>(
    file: &Path,
    output: &OutputOpts,
    global: &GlobalOpts,
    instructions: F,
) -> Result<Outcome>
where
    F: FnOnce(&mut dyn ManifestEditor) -> Result<(), RewriteError>,
{
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let config = global.load_config()?;
    let label = file.display().to_string();

    let rewritten = RewriteSession::new(config).rewrite(&source, &label, instructions)?;
    let outcome = if rewritten == source {
        Outcome::Unchanged
    } else {
        Outcome::Changed
    };

    if output.check {
        if outcome == Outcome::Changed {
            logger::warn(&format!("{} would be changed", label));
        }
        return Ok(outcome);
    }

    if output.write {
        if outcome == Outcome::Changed {
            fs::write(file, &rewritten)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            logger::success(&format!("Updated {}", label));
        } else {
            logger::info(&format!("{} is already up to date", label));
        }
        return Ok(outcome);
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(rewritten.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(outcome)
}
