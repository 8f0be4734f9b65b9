//! The Battleship client: a protocol driver plus the targeting engine that
//! can stand in for a human at the keyboard.
//!
//! ## Architecture
//!
//! Like the server, the driver (see [`driver`]) is a single-task event loop:
//! one `tokio::select!` multiplexes the server socket and whatever is
//! feeding it local commands — a human typing lines on stdin, an in-process
//! [`bot::Bot`], or an out-of-process [`shell_bot::ShellBot`] child. The
//! driver never mutates its view of the match except in response to a
//! server message; it is a view and a command source, nothing more.
//!
//! ## Modules
//!
//! - [`transport`]: the two shapes a server connection can take — a real
//!   TCP stream, or (when this binary itself is launched as a shell bot's
//!   child) this process's own stdin/stdout.
//! - [`view`]: client-side copies of every board the server has told us
//!   about, built from the same [`shared::Board`] the server uses.
//! - [`targeting`]: the `TargetingStrategy` trait and its five
//!   implementors.
//! - [`bot`]: the `Bot` trait bots implement, plus `EngineBot`, the
//!   in-process adapter from a `TargetingStrategy` to a full bot.
//! - [`shell_bot`]: spawns and speaks to an out-of-process bot.
//! - [`driver`]: the event loop tying all of the above together.
//! - [`tester`]: the in-process bot-vs-bot harness behind `--test`.

pub mod bot;
pub mod driver;
pub mod shell_bot;
pub mod targeting;
pub mod tester;
pub mod transport;
pub mod view;
