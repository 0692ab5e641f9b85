//! Copy-before-delete quarantine with restore and retention.

mod record;
mod store;

pub use record::{BackupRecord, META_SUFFIX};
pub use store::{BackupStore, PurgeReport, DENY_FILE};
