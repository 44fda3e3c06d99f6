//! Local implementations of the batch core's collaborators.

pub mod analyzer;
pub mod repository;

pub use analyzer::CommandAnalyzer;
pub use repository::JsonRecordRepository;
