use thiserror::Error;
use crate::job::JobStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("job {id} is already {status}")]
    AlreadyFinished { id: String, status: JobStatus },

    #[error("job {id} cannot move from {from} to {to}")]
    StatusRegression { id: String, from: JobStatus, to: JobStatus },

    #[error("completed job {0} carries no result")]
    MissingResult(String),

    #[error("invalid data URI: {0}")]
    DataUri(String),

    #[error("job store lock poisoned")]
    Poisoned,
}
