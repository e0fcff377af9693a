/// Monthly capacity ratings.
pub mod capacity;
pub mod engine;
/// Join of dispatch values and generator metadata.
pub mod preprocess;
pub mod summary;
pub mod types;

pub use engine::{EngineConfig, Redistribution, redistribute};
pub use preprocess::{DispatchTables, GeneratorCatalog, preprocess};
