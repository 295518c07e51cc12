//! The `transport` module is responsible for handling network communication
//! with clients, primarily via WebSockets.
//!
//! It defines the JSON messaging protocol used between clients and the
//! server, wires the process-wide component graph into each connection,
//! and implements the WebSocket server itself, parsing frames and
//! forwarding them to the broker, gateway, and fanout router.

pub mod context;
pub mod message;
pub mod websocket;

pub use context::AppContext;

#[cfg(test)]
mod tests;
