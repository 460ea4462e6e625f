//! Scheduling collaborator error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule plan {id}: start {start} is after end {end}")]
    InvalidWindow { id: String, start: u64, end: u64 },

    #[error("scheduler plugin already registered: {0}")]
    DuplicatePlugin(String),

    #[error("unknown scheduler plugin: {0}")]
    UnknownPlugin(String),

    #[error("state store error: {0}")]
    State(#[from] tidescale_state::StateError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
