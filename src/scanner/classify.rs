//! File classification by name, location and age.

use std::time::Duration;

use super::record::Category;

const TEMP_SUFFIXES: &[&str] = &[".tmp", ".temp", ".bak", ".old", ".swp", "~"];
const CACHE_MARKERS: &[&str] = &["/cache/", "/w3tc/", "/wp-rocket/", "/litespeed/"];
const BACKUP_MARKERS: &[&str] = &["/backup"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "tar", "gz", "backup"];

/// Classify a file given its boundary-relative `/`-joined path.
///
/// First match wins: temp, cache, backup, old, uncategorized-old.
/// Returns `None` for files that are not cleanup candidates.
pub fn classify(relative: &str, size: u64, age: Duration, min_age: Duration) -> Option<Category> {
    let path = format!("/{}", relative.to_lowercase());
    let name = path.rsplit('/').next().unwrap_or_default();
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    let is_old = age > min_age;

    if TEMP_SUFFIXES.iter().any(|s| name.ends_with(s)) || name.contains(".tmp") {
        return Some(Category::Temp);
    }

    if CACHE_MARKERS.iter().any(|m| path.contains(m)) || extension == "cache" {
        return Some(Category::Cache);
    }

    if BACKUP_MARKERS.iter().any(|m| path.contains(m)) || ARCHIVE_EXTENSIONS.contains(&extension)
    {
        return is_old.then_some(Category::Backup);
    }

    if is_old && size > 0 {
        return Some(Category::Old);
    }

    is_old.then_some(Category::UncategorizedOld)
}
