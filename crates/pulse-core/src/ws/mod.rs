//! WebSocket transport: one text session per connection.

pub mod client;

pub use client::{StreamConnector, TextStream, WsConnConfig, WsConnector, WsTextStream};
