//! Domain layer: mutation trees, mutation types and the levels they split on
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod cluster;
pub mod enumerate;
pub mod error;
pub mod levels;
pub mod mutype;
pub mod record;
pub mod tree;

pub use cluster::{Clusterer, Clustering, MeanShift};
pub use error::{DomainError, DomainResult};
pub use levels::{FieldParser, LevelName, LevelRegistry, LevelSplitter};
pub use mutype::{KeyEntry, MuType, SetKey};
pub use record::{MutationTable, Record, Row, SampleSet, SAMPLE_FIELD};
pub use tree::{MuNode, MuTree};
