//! Corpus operations.
//!
//! Each operation loads one overlay snapshot, walks it (or an incoming
//! batch) in order, and stages writes through the same non-destructive
//! merge rules. Every operation defaults to dry-run; `write` makes it
//! stick.

pub mod duplicates;
pub mod import;
pub mod migrate;
pub mod repair;

pub use duplicates::{find_duplicate_groups, remove_duplicates, DuplicateGroup, RemoveStats};
pub use import::{run_import, ImportOptions};
pub use migrate::{migrate_to_stable_ids, MigrateOptions, MigrateStats};
pub use repair::{repair_coordinates, RepairStats};
