//! Path helpers shared by the guard, scanner and backup store.

use std::path::{Component, Path, PathBuf};

/// Remove `.` and `..` components without touching the filesystem.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize as much of `path` as exists, then append the rest lexically.
///
/// Used for rule paths that may not exist yet, so they still compare
/// correctly against canonical candidates.
pub fn resolve_best_effort(path: &Path) -> PathBuf {
    let normalized = normalize_lexically(path);
    if let Ok(canonical) = normalized.canonicalize() {
        return canonical;
    }

    let mut existing = normalized.as_path();
    while let Some(parent) = existing.parent() {
        existing = parent;
        if let Ok(canonical) = existing.canonicalize() {
            return match normalized.strip_prefix(existing) {
                Ok(rest) => canonical.join(rest),
                Err(_) => normalized.clone(),
            };
        }
    }
    normalized
}

/// Path of `path` below `base`, joined with `/` regardless of platform.
pub fn slash_relative(path: &Path, base: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
