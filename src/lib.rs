pub mod corpus;
pub mod identity;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod ops;
pub mod report;
pub mod store;
pub mod utils;

pub use corpus::CorpusOverlay;
pub use report::ReconciliationReport;
