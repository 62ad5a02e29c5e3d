//! Storage of runs, observations and comparison results.
//!
//! The comparison engine only talks to [`ObservationStore`]; two backends
//! are provided:
//!
//! - [`MemoryStore`]: `RwLock`-guarded maps, for tests and embedding
//! - [`DirectoryStore`]: JSON files under a data directory, used by the CLI

mod directory;
mod memory;
mod snapshot;
mod traits;

pub use directory::DirectoryStore;
pub use memory::MemoryStore;
pub use snapshot::RunSnapshot;
pub use traits::{ComparisonKey, ObservationStore};
