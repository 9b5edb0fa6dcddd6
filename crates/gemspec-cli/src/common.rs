//! Common types and utilities shared across commands

use anyhow::{Context, Result};
use clap::{Args, Parser};
use gemspec_config::RewriteConfig;
use std::path::PathBuf;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Config file (defaults to $GEMSPEC_REWRITE_CONFIG, then the user config dir)"
    )]
    pub config: Option<PathBuf>,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    pub fn load_config(&self) -> Result<RewriteConfig> {
        RewriteConfig::load(self.config.as_deref()).context("Failed to load configuration")
    }
}

/// Where the rewritten manifest goes
#[derive(Args, Debug, Clone, Default)]
pub struct OutputOpts {
    /// Rewrite the file in place instead of printing the result
    #[arg(short, long, conflicts_with = "check")]
    pub write: bool,

    /// Print nothing; exit with status 1 if the file would change
    #[arg(long)]
    pub check: bool,
}

/// Result of a mutating command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Unchanged,
    Changed,
}
