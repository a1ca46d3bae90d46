use thiserror::Error;

/// Errors produced while generating or analysing a dataset.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("could not {context}")]
    PersistenceFailure {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset sink is already closed, refusing to append")]
    SinkClosed,

    #[error("dataset file ends in a partially written line, refusing to append")]
    SinkFailed,

    #[error("worker {worker} did not complete: {reason}")]
    ConcurrencyFailure { worker: usize, reason: String },
}

impl SimError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(msg.into())
    }

    pub fn persistence(context: impl Into<String>, source: std::io::Error) -> Self {
        SimError::PersistenceFailure {
            context: context.into(),
            source,
        }
    }
}

pub type SimResult<T> = std::result::Result<T, SimError>;
