pub mod loader;
pub mod types;

pub use loader::{find_data_file, load_records, LoadedCorpus};
pub use types::{AnnotationRecord, DimensionValue, EntityMention};
