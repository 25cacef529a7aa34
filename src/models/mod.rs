pub mod core;
pub mod matching;

pub use self::core::{Coordinate, IncomingRecord, Mountain, Trailhead};
pub use matching::{Action, ConflictNote, MatchOutcome, MatchStrategy, MergePlan, Patch};
