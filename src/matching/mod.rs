pub mod candidates;
pub mod merge;
pub mod variants;

pub use candidates::{find_candidates, MatcherOptions};
pub use merge::{build_patch, merge_records, new_record, resolve, ResolveOptions};
pub use variants::candidate_names;
