//! Protocol module - messages spoken over the generation socket

pub mod messages;

pub use messages::{
    ControlMessage, GenerationMeta, GenerationRequest, OutboundMessage, ServerMessage,
};
