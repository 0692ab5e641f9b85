mod classify;
mod formatter;
mod options;
mod record;
mod walker;

pub use classify::classify;
pub use formatter::{format_duplicates, format_empty_dirs, format_json, format_table, FormatOptions};
pub use options::{ScanOptions, DEFAULT_MAX_DEPTH, DEFAULT_MAX_FILES};
pub use record::{Category, FileRecord, ScanReport};
pub use walker::TreeScanner;
