pub mod chunk;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use chunk::build_passages;
pub use snapshot::{PlanSnapshot, PolicySet};
pub use types::{Passage, SourceTag};
