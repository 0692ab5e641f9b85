//! Duplicate content detection over scanned records.
//!
//! Groups are deterministic: candidates are ordered by discovery ordinal
//! before any (parallel) hashing, and the first member of every group is the
//! one to keep.

mod fingerprint;

pub use fingerprint::{fingerprint, FULL_HASH_LIMIT, SAMPLE_LEN};
pub(crate) use fingerprint::to_hex;

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::scanner::{Category, FileRecord, ScanReport};

/// Categories whose records take part in duplicate detection.
pub const ELIGIBLE: [Category; 4] = [
    Category::Temp,
    Category::Cache,
    Category::Backup,
    Category::Old,
];

/// Files sharing one fingerprint. The first member is kept.
///
/// A group always holds at least two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    fingerprint: String,
    members: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Group `members` under `fingerprint`, or `None` with fewer than two.
    pub fn new(fingerprint: String, members: Vec<FileRecord>) -> Option<Self> {
        (members.len() > 1).then_some(Self {
            fingerprint,
            members,
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Members in discovery order.
    pub fn members(&self) -> &[FileRecord] {
        &self.members
    }

    /// The member that survives deletion.
    pub fn keep(&self) -> &FileRecord {
        &self.members[0]
    }

    /// Members after the kept one.
    pub fn redundant(&self) -> &[FileRecord] {
        &self.members[1..]
    }

    /// Bytes freed by deleting the redundant members.
    pub fn reclaimable(&self) -> u64 {
        self.redundant().iter().map(|r| r.size).sum()
    }
}

/// A file that could not be fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DuplicateReport {
    /// Groups ordered by the discovery order of their kept member
    pub groups: Vec<DuplicateGroup>,
    pub failures: Vec<FingerprintFailure>,
}

impl DuplicateReport {
    pub fn reclaimable(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::reclaimable).sum()
    }
}

/// Groups scanned records by content fingerprint.
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    max_size: u64,
}

impl DuplicateDetector {
    /// Files larger than `max_size` bytes are left out.
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.scan.max_duplicate_size())
    }

    pub fn detect(&self, report: &ScanReport) -> DuplicateReport {
        let candidates: Vec<&FileRecord> = report
            .records_in_order(&ELIGIBLE)
            .into_iter()
            .filter(|r| r.size > 0 && r.size <= self.max_size)
            .collect();

        // Only sizes shared by several files can hold duplicates.
        let mut per_size: HashMap<u64, usize> = HashMap::new();
        for record in &candidates {
            *per_size.entry(record.size).or_default() += 1;
        }
        let candidates: Vec<&FileRecord> = candidates
            .into_iter()
            .filter(|r| per_size[&r.size] > 1)
            .collect();

        let hashed: Vec<(&FileRecord, Result<String, String>)> = candidates
            .par_iter()
            .map(|record| (*record, fingerprint_record(record)))
            .collect();

        let mut result = DuplicateReport::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<(String, Vec<FileRecord>)> = Vec::new();

        for (record, outcome) in hashed {
            match outcome {
                Ok(fp) => match index.get(&fp) {
                    Some(&i) => buckets[i].1.push(record.clone()),
                    None => {
                        index.insert(fp.clone(), buckets.len());
                        buckets.push((fp, vec![record.clone()]));
                    }
                },
                Err(reason) => {
                    tracing::debug!(path = %record.path.display(), %reason, "Fingerprint failed");
                    result.failures.push(FingerprintFailure {
                        path: record.path.clone(),
                        reason,
                    });
                }
            }
        }

        result.groups = buckets
            .into_iter()
            .filter_map(|(fp, members)| DuplicateGroup::new(fp, members))
            .collect();
        tracing::info!(
            groups = result.groups.len(),
            failures = result.failures.len(),
            reclaimable = result.reclaimable(),
            "Duplicate detection complete"
        );
        result
    }
}

/// Fingerprint a record, refusing files that changed since the scan.
fn fingerprint_record(record: &FileRecord) -> Result<String, String> {
    let metadata = fs::symlink_metadata(&record.path).map_err(|e| e.to_string())?;
    if !metadata.is_file() {
        return Err("no longer a regular file".into());
    }
    let mtime = metadata.modified().map_err(|e| e.to_string())?;
    if metadata.len() != record.size || mtime != record.mtime {
        return Err("changed since scan".into());
    }
    fingerprint(&record.path, record.size).map_err(|e| e.to_string())
}
