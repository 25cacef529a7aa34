//! Batch input parsing.
//!
//! Batches arrive as CSV exports from several upstream lists, each with its
//! own header vocabulary, so header resolution goes through an alias table
//! rather than a fixed schema.

pub mod csv;

pub use csv::{read_batch, ParsedRow};
