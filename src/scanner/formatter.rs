use humansize::{format_size, BINARY};
use serde::Serialize;

use crate::duplicates::DuplicateReport;

use super::record::{Category, ScanReport};

/// Format options for text output
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Show at most this many paths per section
    pub list_limit: Option<usize>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            list_limit: Some(20),
        }
    }
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list_limit(mut self, n: usize) -> Self {
        self.list_limit = Some(n);
        self
    }

    pub fn unlimited() -> Self {
        Self { list_limit: None }
    }

    fn take(&self, len: usize) -> usize {
        self.list_limit.map_or(len, |n| n.min(len))
    }
}

/// Per-category counts and sizes.
pub fn format_table(report: &ScanReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("{:<18} {:>8} {:>12}\n", "CATEGORY", "FILES", "SIZE"));
    output.push_str(&format!("{:-<18} {:->8} {:->12}\n", "", "", ""));

    for category in Category::ALL {
        let records = report.records(category);
        let marker = if category.is_bulk_eligible() { "" } else { " (review)" };
        output.push_str(&format!(
            "{:<18} {:>8} {:>12}{}\n",
            category.as_str(),
            records.len(),
            format_size(report.category_size(category), BINARY),
            marker
        ));
    }

    output.push_str(&format!(
        "\nScanned {} files, {} total",
        report.total_files,
        format_size(report.total_size, BINARY)
    ));
    if report.truncated {
        output.push_str(" (file limit reached, results are partial)");
    }
    output.push('\n');
    output
}

/// Duplicate groups, kept member first.
pub fn format_duplicates(duplicates: &DuplicateReport, options: &FormatOptions) -> String {
    let mut output = String::new();

    if duplicates.groups.is_empty() {
        output.push_str("No duplicate files found.\n");
    } else {
        output.push_str(&format!(
            "{} duplicate group{}, {} reclaimable\n",
            duplicates.groups.len(),
            if duplicates.groups.len() == 1 { "" } else { "s" },
            format_size(duplicates.reclaimable(), BINARY)
        ));

        let shown = options.take(duplicates.groups.len());
        for group in &duplicates.groups[..shown] {
            output.push_str(&format!(
                "\n  {} x {}\n",
                group.members().len(),
                format_size(group.keep().size, BINARY)
            ));
            output.push_str(&format!("    keep    {}\n", group.keep().path.display()));
            for member in group.redundant() {
                output.push_str(&format!("    delete  {}\n", member.path.display()));
            }
        }
        if shown < duplicates.groups.len() {
            output.push_str(&format!(
                "\n  ... and {} more groups\n",
                duplicates.groups.len() - shown
            ));
        }
    }

    if !duplicates.failures.is_empty() {
        output.push_str(&format!(
            "{} file{} could not be compared\n",
            duplicates.failures.len(),
            if duplicates.failures.len() == 1 { "" } else { "s" }
        ));
    }
    output
}

pub fn format_empty_dirs(report: &ScanReport, options: &FormatOptions) -> String {
    let dirs = &report.empty_dirs;
    if dirs.is_empty() {
        return "No empty directories found.\n".to_string();
    }

    let mut output = format!(
        "{} empty director{}\n",
        dirs.len(),
        if dirs.len() == 1 { "y" } else { "ies" }
    );
    let shown = options.take(dirs.len());
    for dir in &dirs[..shown] {
        output.push_str(&format!("  {}\n", dir.display()));
    }
    if shown < dirs.len() {
        output.push_str(&format!("  ... {} more\n", dirs.len() - shown));
    }
    output
}

/// Format any report as JSON
pub fn format_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
