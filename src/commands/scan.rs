//! Scan command implementation

use anyhow::Result;

use crate::cli::ScanArgs;
use crate::config::Config;
use crate::scanner::{format_duplicates, format_empty_dirs, format_json, format_table, FormatOptions};
use crate::session::Session;

use super::spinner;

/// Run the scan command
pub fn run(config: Config, args: ScanArgs, quiet: bool) -> Result<()> {
    let session = Session::open(config)?;

    tracing::info!(root = %session.guard().boundary().display(), "Scanning");

    let progress = spinner("Scanning...", quiet || args.json)?;
    let survey = session.survey(!args.no_duplicates);
    progress.finish_and_clear();

    if args.json {
        println!("{}", format_json(&survey, true)?);
        return Ok(());
    }

    let options = FormatOptions::default();
    println!("{}", format_table(&survey.report));
    if let Some(duplicates) = &survey.duplicates {
        println!("{}", format_duplicates(duplicates, &options));
    }
    print!("{}", format_empty_dirs(&survey.report, &options));

    Ok(())
}
