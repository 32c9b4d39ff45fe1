pub mod engine;
pub mod error;
pub mod resolver;
pub mod spec;
pub mod validation;

pub use engine::{compute_all, compute_index, CorpusResults, IndexResult, IndexValue, Tally};
pub use error::{IndexError, IndexFailure};
pub use spec::{IndexSpec, OutputRange, Rule};
pub use validation::{validate_analysis, vocabulary_report, DimensionCoverage};
