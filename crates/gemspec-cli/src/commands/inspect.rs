use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use gemspec_rewrite::{ManifestSnapshot, MethodKind, RewriteSession};
use std::fs;
use std::path::PathBuf;

use crate::common::GlobalOpts;

#[derive(Args, Debug, Clone)]
pub struct InspectCommand {
    /// Gemspec file to read
    pub file: PathBuf,
    /// Print the snapshot as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn handle_inspect(cmd: &InspectCommand, global: &GlobalOpts) -> Result<()> {
    let source = fs::read_to_string(&cmd.file)
        .with_context(|| format!("Failed to read {}", cmd.file.display()))?;
    let config = global.load_config()?;
    let label = cmd.file.display().to_string();
    let snapshot = RewriteSession::new(config).inspect(&source, &label)?;

    if cmd.json {
        println!("{}", snapshot.to_json()?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn print_snapshot(snapshot: &ManifestSnapshot) {
    println!(
        "{} {}",
        snapshot.name.as_deref().unwrap_or("(unnamed)").bold().green(),
        snapshot.version.as_deref().unwrap_or("(no literal version)")
    );
    if snapshot.dependencies.is_empty() {
        println!("  {}", "(no dependencies)".yellow());
        return;
    }
    for dep in &snapshot.dependencies {
        let kind = match dep.kind {
            MethodKind::Development => "development",
            MethodKind::Generic | MethodKind::Runtime => "runtime",
        };
        println!(
            "  {} {} ({})",
            dep.name.cyan(),
            dep.requirements.join(", "),
            kind.dimmed()
        );
    }
}
