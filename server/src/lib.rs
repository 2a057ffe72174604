//! # Game Server Library
//!
//! Authoritative server for the arena. It owns the one true World State,
//! applies join/leave/move requests from clients, and keeps every client
//! replica honest with full snapshots and periodic `time` messages.
//!
//! ## Single-Threaded Event Loop
//! Connection tasks only parse frames and forward them; every state change
//! happens in [`network::Server::run`], one event at a time. Before handling
//! an event the world is projected forward to the current wall clock, so
//! joins and snapshots always reflect "now".
//!
//! ## Module Organization
//!
//! ### Client Manager Module (`client_manager`)
//! Open connections, their outbound queues, and which player name each
//! connection joined as.
//!
//! ### Game Module (`game`)
//! The authoritative [`shared::World`], enemy seeding, the update counter and
//! the queue of lifecycle events waiting to be broadcast.
//!
//! ### Network Module (`network`)
//! WebSocket accept loop, per-connection reader/writer tasks, and the main
//! loop that turns inbound messages and timer ticks into broadcasts.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> server::network::ServerResult<()> {
//!     let server = Server::bind("127.0.0.1:8080", ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
