//! Guarded deletion of scan results.
//!
//! This module provides:
//! - Re-validation of every candidate right before deletion
//! - Optional copy into the backup quarantine first
//! - Per-item outcome reporting

mod executor;
mod report;

pub use executor::Cleaner;
pub use report::{CleanReport, IssueKind, ItemIssue};
