//! # PopBridge
//!
//! `popbridge` is a WebSocket-to-MQTT bridge built with Rust. It exposes a
//! JSON message protocol over WebSockets to browser clients and maps each
//! client connection onto exactly one MQTT broker session, relaying broker
//! traffic back to the client that owns it.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `broker`: Owns the outbound MQTT connection for one session and exposes broker activity as an event stream.
//! - `session`: The per-connection state machine plus the registry tracking all live sessions.
//! - `config`: Handles loading and managing bridge configuration.
//! - `transport`: The WebSocket server, the client message protocol, and its codec.
//! - `utils`: Shared utilities, such as error types and logging setup.

pub mod broker;
pub mod config;
pub mod session;
pub mod transport;
pub mod utils;
