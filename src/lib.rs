//! Gen Studio Client
//!
//! Terminal client for a streaming image-generation backend. A prompt and its
//! parameters go out over one WebSocket; step progress and the final image
//! come back as JSON frames.

pub mod app;
pub mod config;
pub mod error;
pub mod form;
pub mod health;
pub mod protocol;
pub mod render;
pub mod session;
pub mod transport;

pub use app::{Outcome, Studio};
pub use error::{AppError, Result};
pub use form::{GenerationForm, ReferenceImage};
pub use protocol::{GenerationRequest, OutboundMessage, ServerMessage};
pub use session::{GenerationSession, ProgressState, Rejection, SessionUpdate};
