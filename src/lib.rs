//! rootsweep - Safe disk space reclaimer for web application trees
//!
//! This crate provides functionality for:
//! - Protecting runtime files and directories from deletion
//! - Classifying reclaimable files and finding empty directories
//! - Detecting duplicate content
//! - Deleting candidates with backup, restore and retention

pub mod backup;
pub mod cleaner;
pub mod cli;
pub mod commands;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod guard;
pub mod scanner;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SweepError};
pub use session::{Session, Survey};
