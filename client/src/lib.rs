//! # Arena Client Library
//!
//! Client-side movement prediction and server reconciliation for the arena
//! shooter. The local player moves the moment a key is held; the server's
//! periodic snapshots then confirm or correct that movement without visible lag.
//!
//! ## Architecture Overview
//!
//! ### Client-Side Prediction
//! Every tick with a non-idle intent gets the next sequence number, is recorded
//! in the pending queue, is sent to the server, and is applied locally right away
//! using the shared movement simulator.
//!
//! ### Server Reconciliation
//! Each snapshot carries the last input sequence the server applied for us.
//! Acknowledged inputs are dropped from the front of the pending queue and the
//! rest are replayed on top of the authoritative position. Because prediction
//! and replay call the same pure simulator, the replayed position agrees with
//! what the server will compute once it has seen those inputs.
//!
//! ### Remote Entities
//! Other players and bullets are shown exactly as the last snapshot reported
//! them. No prediction or smoothing is applied.
//!
//! ## Module Organization
//!
//! - `input`: held keys, pointer and trigger state sampled into a movement intent
//! - `prediction`: sequence counter, pending queue and the speculative step
//! - `reconcile`: acknowledgement trimming and replay
//! - `store`: latest players and bullets, with the local player overridden
//! - `rate_limiter`: time-window throttle for firing
//! - `session`: one connection's state and its `tick`/`handle_message` entry points
//! - `network`: the `Transport` seam and a loopback link for headless runs
//! - `config`, `error`: runtime settings and error types
//!
//! ## Usage Example
//!
//! ```rust
//! use client::session::ClientSession;
//! use shared::{ArenaBounds, ClientMessage, MovementIntent};
//! use std::time::Duration;
//!
//! let mut session = ClientSession::new(ArenaBounds::default(), Duration::from_millis(200));
//! let mut outbox: Vec<ClientMessage> = Vec::new();
//!
//! session.handle_text(r#"{"type":"bootstrap","id":"p1"}"#)?;
//! session.handle_text(
//!     r#"{"type":"update","players":[{"id":"p1","position":{"x":100,"y":100},"sequence":0}],"bullets":[]}"#,
//! )?;
//!
//! // Called by the host's tick driver.
//! session.tick(MovementIntent::UP, &mut outbox);
//! assert_eq!(outbox.len(), 1);
//! assert_eq!(session.predicted_position().map(|p| p.y), Some(95.0));
//! # Ok::<(), client::error::ClientError>(())
//! ```
//!
//! ## Execution Model
//!
//! Everything here runs on one execution context. `tick` and `handle_message`
//! take `&mut self`, so a reconciliation always finishes before the next
//! prediction tick reads the queue. Nothing blocks; sending is handed to the
//! transport and forgotten.

pub mod config;
pub mod error;
pub mod input;
pub mod network;
pub mod prediction;
pub mod rate_limiter;
pub mod reconcile;
pub mod session;
pub mod store;
