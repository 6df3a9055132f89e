// Library interface for newsdigest stages
// This allows tests and the binaries to import modules

pub mod classify;
pub mod dedup;
pub mod distribute;
pub mod format;
pub mod ingestion;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod sanitize;
pub mod scraping;
pub mod storage;

pub use models::{CandidateItem, Classification, EnrichedItem};
pub use pipeline::{Pipeline, RunReport};
