//! Backup management: list, restore, purge, size.

use anyhow::{bail, Result};
use humansize::{format_size, BINARY};
use std::time::Duration;

use crate::backup::BackupStore;
use crate::cli::BackupsCommand;
use crate::config::Config;

use super::plural;

const SECS_PER_DAY: u64 = 86_400;

pub fn run(config: Config, command: BackupsCommand) -> Result<()> {
    config.validate()?;
    let Some(store) = BackupStore::existing_from_config(&config)? else {
        if let BackupsCommand::Restore { name } = &command {
            bail!("Backup not found: {name}");
        }
        println!("No backups in {}", config.resolve(&config.backup.dir).display());
        return Ok(());
    };

    match command {
        BackupsCommand::List { limit } => {
            let records = store.list(limit)?;
            if records.is_empty() {
                println!("No backups in {}", store.dir().display());
                return Ok(());
            }

            println!("  {:<19} {:>10}  {:<40}  {}", "CREATED", "SIZE", "NAME", "ORIGINAL");
            for record in &records {
                println!(
                    "  {:<19} {:>10}  {:<40}  {}",
                    record.created_at.format("%Y-%m-%d %H:%M:%S"),
                    format_size(record.size, BINARY),
                    record.blob_name(),
                    record.relative_path.display()
                );
            }
        }
        BackupsCommand::Restore { name } => {
            let record = store.find(&name)?;
            let target = store.restore(&record)?;
            println!("Restored {}", target.display());
        }
        BackupsCommand::Purge { days } => {
            let retention = match days {
                Some(d) => Duration::from_secs(u64::from(d) * SECS_PER_DAY),
                None => config.backup.retention(),
            };
            let report = store.purge(retention)?;
            println!(
                "Purged {} backup{} ({})",
                report.removed,
                plural(report.removed),
                format_size(report.bytes, BINARY)
            );
            for (path, reason) in &report.failures {
                eprintln!("  Error: {}: {}", path.display(), reason);
            }
            if !report.failures.is_empty() {
                std::process::exit(5); // Partial failure
            }
        }
        BackupsCommand::Size => {
            let count = store.list(None)?.len();
            println!(
                "{} in {} backup{} ({})",
                format_size(store.total_size()?, BINARY),
                count,
                plural(count),
                store.dir().display()
            );
        }
    }

    Ok(())
}
