pub mod summary;

pub use summary::{ComparisonResult, Document, SummaryResult, Verdict};
