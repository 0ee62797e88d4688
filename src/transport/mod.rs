//! Transport module - the WebSocket link to the backend

pub mod websocket;

pub use websocket::{Connection, TransportEvent};
