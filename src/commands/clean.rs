//! Clean command implementation.

use anyhow::Result;
use humansize::{format_size, BINARY};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cleaner::CleanReport;
use crate::cli::{CleanArgs, CleanTarget};
use crate::config::Config;
use crate::duplicates::DuplicateGroup;
use crate::scanner::FileRecord;
use crate::session::Session;

use super::{plural, spinner};

/// What a clean run is about to act on.
enum Selection {
    Files(Vec<FileRecord>),
    Duplicates(Vec<DuplicateGroup>),
    Dirs(Vec<PathBuf>),
}

impl Selection {
    fn count(&self) -> usize {
        match self {
            Selection::Files(records) => records.len(),
            Selection::Duplicates(groups) => groups.iter().map(|g| g.redundant().len()).sum(),
            Selection::Dirs(dirs) => dirs.len(),
        }
    }

    fn size(&self) -> u64 {
        match self {
            Selection::Files(records) => records.iter().map(|r| r.size).sum(),
            Selection::Duplicates(groups) => groups.iter().map(|g| g.reclaimable()).sum(),
            Selection::Dirs(_) => 0,
        }
    }
}

/// Run the clean command.
pub fn run(config: Config, args: CleanArgs, quiet: bool) -> Result<()> {
    let mut session = Session::open(config)?;

    let progress = spinner("Scanning...", quiet)?;
    let report = session.scanner().scan();
    let selection = match (args.target.category(), args.target) {
        (Some(category), _) => {
            // recent uploads are reported by the scan but never deleted
            let (held, files): (Vec<FileRecord>, Vec<FileRecord>) = report
                .records(category)
                .iter()
                .cloned()
                .partition(|r| r.protected);
            if !held.is_empty() {
                println!(
                    "Keeping {} recently uploaded file{}.",
                    held.len(),
                    plural(held.len())
                );
            }
            Selection::Files(files)
        }
        (None, CleanTarget::Duplicates) => {
            progress.set_message("Comparing files...");
            Selection::Duplicates(session.detector().detect(&report).groups)
        }
        (None, _) => Selection::Dirs(report.empty_dirs.clone()),
    };
    progress.finish_and_clear();

    let count = selection.count();
    if count == 0 {
        println!("Nothing to clean.");
        return Ok(());
    }

    println!(
        "Found {} item{} ({})",
        count,
        plural(count),
        format_size(selection.size(), BINARY)
    );

    // Confirmation
    if !args.force && !args.dry_run {
        print!("\nProceed with cleanup? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let backup = !args.no_backup;
    if backup && !args.dry_run && session.prepare_backups()?.is_none() {
        tracing::warn!("Backups are disabled in the configuration");
    }
    let cleaner = session.cleaner(args.dry_run, backup);

    let result = match &selection {
        Selection::Files(records) => cleaner.clean_files(records),
        Selection::Duplicates(groups) => cleaner.clean_duplicates(groups),
        Selection::Dirs(dirs) => cleaner.clean_empty_dirs(dirs),
    };

    print_results(&result);

    if result.has_failures() {
        std::process::exit(5); // Partial failure
    }

    Ok(())
}

fn print_results(result: &CleanReport) {
    if result.dry_run {
        println!("\n[DRY RUN] Would remove:");
        for path in &result.removed {
            println!("  {}", path.display());
        }
    }

    println!("\nResults:");
    let verb = if result.dry_run { "Would remove" } else { "Removed" };
    println!("  {}: {} item{}", verb, result.deleted, plural(result.deleted));
    if result.skipped > 0 {
        println!("  Skipped: {} item{}", result.skipped, plural(result.skipped));
    }
    if result.failed > 0 {
        println!("  Failed:  {} item{}", result.failed, plural(result.failed));
    }
    if !result.backups.is_empty() {
        println!("  Backed up: {} file{}", result.backups.len(), plural(result.backups.len()));
    }
    println!("  Freed:   {}", format_size(result.bytes_freed, BINARY));

    for issue in result.issues.iter().filter(|i| i.kind.is_failure()) {
        eprintln!("  Error: {} ({}): {}", issue.path.display(), issue.kind, issue.reason);
    }
}
