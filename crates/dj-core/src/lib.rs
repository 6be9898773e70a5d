pub mod data_uri;
pub mod error;
pub mod job;
pub mod prompt;
pub mod store;

pub use error::{Error, Result};
pub use job::{GenerationJob, JobResult, JobStatus};
pub use store::{JobStore, MemoryJobStore};
