//! A single accepted TCP connection, pre- or post- attachment to a player.
//!
//! A `Session` owns its socket halves and its own line buffer. It does not
//! know about the `Game`; the server loop is the only thing that maps a
//! session's `handle` to a board by name.

use std::time::{Duration, Instant};

use log::debug;
use shared::error::GameError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

/// Monotonically increasing connection id standing in for the file
/// descriptor the source's event loop multiplexed on. Always `>= 0`;
/// `Board::handle` goes negative only to mean "disconnected".
pub type Handle = i64;

/// Per spec.md:76, a line over this many bytes with no terminator
/// terminates the session rather than growing the buffer unbounded.
const MAX_LINE_BYTES: usize = 4096;

pub struct Session {
    handle: Handle,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// Set once the session has joined a board; `None` pre-join.
    player_name: Option<String>,
    last_activity: Instant,
    /// Set while a ping is outstanding, waiting for any line back.
    awaiting_pong_since: Option<Instant>,
}

impl Session {
    pub fn new(handle: Handle, reader: OwnedReadHalf, writer: OwnedWriteHalf) -> Self {
        Session {
            handle,
            reader: BufReader::new(reader),
            writer,
            player_name: None,
            last_activity: Instant::now(),
            awaiting_pong_since: None,
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn player_name(&self) -> Option<&str> {
        self.player_name.as_deref()
    }

    pub fn set_player_name(&mut self, name: impl Into<String>) {
        self.player_name = Some(name.into());
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.awaiting_pong_since = None;
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    pub fn mark_ping_sent(&mut self) {
        if self.awaiting_pong_since.is_none() {
            self.awaiting_pong_since = Some(Instant::now());
        }
    }

    pub fn pong_overdue(&self, window: Duration) -> bool {
        self.awaiting_pong_since
            .map(|since| since.elapsed() > window)
            .unwrap_or(false)
    }

    /// Reads one `\n`-terminated line, without the trailing newline. `Ok(None)`
    /// means the peer closed the connection cleanly (EOF). Caps the amount
    /// read before a terminator is seen at [`MAX_LINE_BYTES`]; a line that
    /// never terminates within the cap returns `Err` rather than buffering
    /// an unbounded amount from a malicious or buggy peer.
    pub async fn read_line(&mut self) -> Result<Option<String>, GameError> {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return if buf.is_empty() {
                    Ok(None)
                } else {
                    Err(GameError::Protocol("connection closed mid-line".to_string()))
                };
            }
            if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                buf.extend_from_slice(&available[..pos]);
                let consumed = pos + 1;
                std::pin::Pin::new(&mut self.reader).consume(consumed);
                self.touch();
                let text = String::from_utf8_lossy(&buf).into_owned();
                return Ok(Some(text));
            }
            let take = available.len();
            if buf.len() + take > MAX_LINE_BYTES {
                std::pin::Pin::new(&mut self.reader).consume(take);
                return Err(GameError::Protocol(format!(
                    "line exceeds {MAX_LINE_BYTES}-byte limit with no terminator"
                )));
            }
            buf.extend_from_slice(available);
            std::pin::Pin::new(&mut self.reader).consume(take);
        }
    }

    /// Writes one already-encoded line (caller includes the trailing `\n`).
    pub async fn write_line(&mut self, line: &str) -> Result<(), GameError> {
        debug!("-> [{}] {}", self.handle, line.trim_end());
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::{TcpListener, TcpStream};

    /// A loopback `(Session, TcpStream)` pair: the session reads from one end
    /// of a real socket, the test drives the other end.
    async fn session_pair() -> (Session, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server_stream, _) = listener.accept().await.unwrap();
        let (read_half, write_half) = server_stream.into_split();
        (Session::new(1, read_half, write_half), client)
    }

    #[tokio::test]
    async fn reads_one_line_without_the_trailing_newline() {
        let (mut session, mut client) = session_pair().await;
        client.write_all(b"J|alice\n").await.unwrap();

        let line = session.read_line().await.unwrap();
        assert_eq!(line.as_deref(), Some("J|alice"));
    }

    #[tokio::test]
    async fn reads_pipelined_lines_one_at_a_time() {
        let (mut session, mut client) = session_pair().await;
        client.write_all(b"P\nP\n").await.unwrap();

        assert_eq!(session.read_line().await.unwrap().as_deref(), Some("P"));
        assert_eq!(session.read_line().await.unwrap().as_deref(), Some("P"));
    }

    #[tokio::test]
    async fn clean_close_before_any_bytes_reads_as_none() {
        let (mut session, client) = session_pair().await;
        drop(client);

        let line = session.read_line().await.unwrap();
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn close_mid_line_is_an_error_not_a_partial_line() {
        let (mut session, mut client) = session_pair().await;
        client.write_all(b"J|alice").await.unwrap();
        drop(client);

        let result = session.read_line().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn a_line_past_the_byte_cap_with_no_terminator_is_an_error() {
        let (mut session, mut client) = session_pair().await;
        let oversized = vec![b'x'; MAX_LINE_BYTES + 1];
        client.write_all(&oversized).await.unwrap();

        let result = session.read_line().await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn write_line_round_trips_through_the_socket() {
        let (mut session, mut client) = session_pair().await;
        session.write_line("G|1|title\n").await.unwrap();

        let mut buf = vec![0u8; 32];
        let n = tokio::io::AsyncReadExt::read(&mut client, &mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"G|1|title\n");
    }
}
