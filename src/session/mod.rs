//! Session module - connection lifecycle and generation state

pub mod progress;
pub mod state;

pub use progress::{percent, ProgressState};
pub use state::{ConnectionStatus, GenerationSession, Rejection, SessionUpdate};
