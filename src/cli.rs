use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::scanner::Category;

/// rootsweep - Safe disk space reclaimer for web application trees
#[derive(Parser, Debug)]
#[command(name = "rootsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Boundary root, overriding the configured one
    #[arg(short, long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report reclaimable files, duplicates and empty directories
    Scan(ScanArgs),

    /// Delete one class of candidates
    Clean(CleanArgs),

    /// Inspect, restore and purge backups
    #[command(subcommand)]
    Backups(BackupsCommand),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip duplicate detection
    #[arg(long)]
    pub no_duplicates: bool,
}

/// What `clean` deletes.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanTarget {
    Temp,
    Cache,
    Backup,
    Old,
    Duplicates,
    EmptyDirs,
}

impl CleanTarget {
    /// Scan category behind this target, if it is one.
    pub fn category(self) -> Option<Category> {
        match self {
            CleanTarget::Temp => Some(Category::Temp),
            CleanTarget::Cache => Some(Category::Cache),
            CleanTarget::Backup => Some(Category::Backup),
            CleanTarget::Old => Some(Category::Old),
            CleanTarget::Duplicates | CleanTarget::EmptyDirs => None,
        }
    }
}

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// What to delete
    #[arg(value_enum)]
    pub target: CleanTarget,

    /// Show what would be cleaned without doing it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Delete without copying files into the backup quarantine
    #[arg(long)]
    pub no_backup: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum BackupsCommand {
    /// List backups, newest first
    List {
        /// Show at most N backups
        #[arg(short = 'n', long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Restore a backup to its original location
    Restore {
        /// Blob file name as shown by `backups list`
        name: String,
    },

    /// Delete backups older than the retention window
    Purge {
        /// Retention in days, overriding the configured one
        #[arg(long, value_name = "N")]
        days: Option<u32>,
    },

    /// Show the space held by backups
    Size,
}
