/***************************************/
/*        3rd party libraries          */
/***************************************/
use thiserror::Error;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::Direction;

/// Everything that can stop a simulation run.
///
/// Protocol disagreements inside a run (no eligible car, door not open yet, car full) are never
/// errors; actors block and retry instead.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown floor: {0}")]
    UnknownFloor(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("floor {floor} still has a pending {direction} call")]
    PendingCall { floor: String, direction: Direction },

    #[error("floor {floor} still has {waiting} passenger(s) waiting")]
    Stranded { floor: String, waiting: usize },

    #[error("elevator E{car} still carries {occupants} passenger(s)")]
    Occupied { car: u32, occupants: usize },

    #[error("{0} was interrupted")]
    Interrupted(String),
}

pub type SimResult<T> = Result<T, SimError>;
