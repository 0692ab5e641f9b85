//! Per-request wiring of guard, scanner, detector and cleaner.

use serde::Serialize;

use crate::backup::BackupStore;
use crate::cleaner::Cleaner;
use crate::config::Config;
use crate::duplicates::{DuplicateDetector, DuplicateReport};
use crate::error::Result;
use crate::guard::PathGuard;
use crate::scanner::{ScanOptions, ScanReport, TreeScanner};

/// Scan results together with duplicate groups.
#[derive(Debug, Clone, Serialize)]
pub struct Survey {
    pub report: ScanReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<DuplicateReport>,
}

/// Everything one command needs, built from a validated `Config`.
pub struct Session {
    config: Config,
    guard: PathGuard,
    backups: Option<BackupStore>,
}

impl Session {
    /// Validate `config` and build the guard.
    ///
    /// Nothing is written: an existing quarantine is attached, a missing one
    /// is left for `prepare_backups`.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let guard = PathGuard::from_config(&config)?;
        let backups = if config.backup.enabled {
            BackupStore::existing_from_config(&config)?
        } else {
            None
        };

        Ok(Self {
            config,
            guard,
            backups,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    pub fn backups(&self) -> Option<&BackupStore> {
        self.backups.as_ref()
    }

    /// Create the quarantine if backups are enabled and it does not exist yet.
    pub fn prepare_backups(&mut self) -> Result<Option<&BackupStore>> {
        if self.backups.is_none() && self.config.backup.enabled {
            self.backups = Some(BackupStore::from_config(&self.config)?);
        }
        Ok(self.backups.as_ref())
    }

    pub fn scanner(&self) -> TreeScanner<'_> {
        TreeScanner::new(&self.guard, ScanOptions::from_config(&self.config))
    }

    pub fn detector(&self) -> DuplicateDetector {
        DuplicateDetector::from_config(&self.config)
    }

    /// A cleaner; backups are used when requested and enabled.
    pub fn cleaner(&self, dry_run: bool, backup: bool) -> Cleaner<'_> {
        let cleaner = Cleaner::new(&self.guard).dry_run(dry_run);
        match (&self.backups, backup) {
            (Some(store), true) => cleaner.with_backups(store),
            _ => cleaner,
        }
    }

    /// Scan, then detect duplicates when enabled and requested.
    pub fn survey(&self, duplicates: bool) -> Survey {
        let report = self.scanner().scan();
        let duplicates = (duplicates && self.config.scan.detect_duplicates)
            .then(|| self.detector().detect(&report));
        Survey { report, duplicates }
    }
}
