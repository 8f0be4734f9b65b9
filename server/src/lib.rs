//! The authoritative Battleship server.
//!
//! ## Core responsibilities
//!
//! The server runs the one true copy of every joined player's board and the
//! match's turn order. Clients only ever see masked descriptors and the
//! messages the server chooses to send; no game-affecting decision is ever
//! made client-side.
//!
//! ## Architecture
//!
//! A single-threaded, single-task event loop (see [`network::Server`])
//! multiplexes the listening socket and every open session's next line with
//! one `tokio::select!`, rebuilt fresh every iteration. There is no
//! `tokio::spawn` per connection and no `Arc<Mutex<_>>`/`Arc<RwLock<_>>`
//! anywhere in the hot path: the `Game` and the session table are owned
//! outright by the loop.
//!
//! ## Modules
//!
//! - [`session`]: a single accepted connection's socket halves and line
//!   framing, independent of game state.
//! - [`game`]: the match state machine — lobby, turn order, termination,
//!   and results persistence.
//! - [`network`]: the event loop and per-message protocol handling.

pub mod game;
pub mod network;
pub mod session;
