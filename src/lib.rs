pub mod config;
pub mod engine;
pub mod error;
pub mod file_ops;
pub mod hashers;
pub mod models;
pub mod utils;

pub use config::{BusyPolicy, EngineConfig};
pub use engine::{CancelHandle, FileHashEngine, JobHandle};
pub use error::{EngineError, InvalidInput};
pub use models::{Algorithm, JobEvent, JobId, JobOutcome, JobState, ProgressEvent, ResultEvent};
