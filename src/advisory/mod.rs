pub mod extract;
pub mod openai;
pub mod orchestrator;
pub mod prompt;
pub mod types;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvisoryError {
    #[error("Reasoning service connection failed: {0}")]
    Connection(String),

    #[error("Reasoning service request timed out after {0}s")]
    Timeout(u64),

    #[error("Reasoning service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Analysis superseded by a newer submission")]
    Superseded,

    #[error("Internal lock error")]
    LockPoisoned,
}
