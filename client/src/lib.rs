//! # Game Client Library
//!
//! Headless client for the arena. It keeps a local replica of the server's
//! World State and projects it forward on a ~30 Hz timer, so entity positions
//! are available between server messages.
//!
//! ## Clock Reconciliation
//! Client and server wall clocks are never assumed to agree. The first
//! snapshot fixes an offset between them; after that the replica is projected
//! to "server time now". Each periodic `time` message overrides the replica's
//! timestamp with the server's and adds the difference to an accumulated
//! skew. Past the threshold the client asks for a full snapshot.
//!
//! ## Module Organization
//!
//! ### Clock Module (`clock`)
//! Start offset, accumulated skew and the resync decision.
//!
//! ### Game Module (`game`)
//! [`game::Session`]: the replica world plus message handling. No I/O.
//!
//! ### Network Module (`network`)
//! WebSocket connection and the select loop driving a session.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientConfig};
//!
//! # async fn example() -> client::network::ClientResult<()> {
//! let config = ClientConfig {
//!     name: Some("alice".to_string()),
//!     ..ClientConfig::default()
//! };
//! let mut client = Client::connect("ws://127.0.0.1:8080", config).await?;
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod game;
pub mod network;
