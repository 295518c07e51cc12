//! # Airwave
//!
//! `airwave` is a real-time air-quality distribution server built with Rust.
//! Sensor devices push pollutant readings over WebSockets, either as a
//! direct write or by publishing to a topic; each reading is scored with a
//! deterministic Air Quality Index, persisted, and fanned out to the
//! observers currently watching that channel.
//!
//! ## Core Modules
//!
//! The library is structured into several modules, each with a distinct responsibility:
//!
//! - `aqi`: the pure breakpoint-interpolation engine that turns raw
//!   concentrations into an overall index, per-pollutant sub-indices, and
//!   a dominant pollutant.
//! - `broker`: the topic-based publish/subscribe core with QoS 0/1/2
//!   delivery tracking and retained messages.
//! - `directory`: the channel directory seam (existence and credential
//!   checks; channels themselves are managed elsewhere).
//! - `fanout`: per-channel rooms of live observer sessions and the emit
//!   path that pushes enriched readings to them.
//! - `ingest`: the gateway that validates a reading, scores it, persists
//!   it, and hands it to the fanout router.
//! - `config`: loading and merging server configuration.
//! - `persistence`: the append-and-query reading history store (sled).
//! - `session`: a connected WebSocket session and its send handle.
//! - `stats`: process-wide informational counters.
//! - `transport`: the WebSocket server and the JSON wire protocol.
//! - `utils`: shared utilities (errors, logging).

pub mod aqi;
pub mod broker;
pub mod config;
pub mod directory;
pub mod fanout;
pub mod ingest;
pub mod persistence;
pub mod session;
pub mod stats;
pub mod transport;
pub mod utils;
