//! The two shapes a connection to "the server" can take.
//!
//! Most of the time this is a real TCP stream. But when this binary is
//! itself launched as a [`crate::shell_bot::ShellBot`] child, there is no
//! socket at all: the parent process mirrors the live server's protocol
//! onto our stdin and reads our chosen moves from our stdout. The driver
//! (see [`crate::driver`]) is written once against this enum so the same
//! dispatch code runs identically either way.

use shared::error::{GameError, GameResult};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

pub enum ServerTransport {
    Tcp {
        reader: BufReader<OwnedReadHalf>,
        writer: OwnedWriteHalf,
    },
    Stdio {
        reader: BufReader<Stdin>,
        writer: Stdout,
    },
}

impl ServerTransport {
    pub async fn connect(addr: &str) -> GameResult<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| GameError::PermanentIo(format!("failed to connect to {addr}: {e}")))?;
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();
        Ok(ServerTransport::Tcp {
            reader: BufReader::new(reader),
            writer,
        })
    }

    /// Used when this process is itself a `ShellBot` child: the mirrored
    /// protocol arrives on our real stdin, our choices go to our real
    /// stdout.
    pub fn stdio() -> Self {
        ServerTransport::Stdio {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }

    /// Reads one `\n`-terminated line without the trailing newline.
    /// `Ok(None)` means the peer (or parent) closed its end.
    pub async fn read_line(&mut self) -> GameResult<Option<String>> {
        let mut buf = String::new();
        let n = match self {
            ServerTransport::Tcp { reader, .. } => reader.read_line(&mut buf).await?,
            ServerTransport::Stdio { reader, .. } => reader.read_line(&mut buf).await?,
        };
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(buf.strip_suffix('\n').unwrap_or(&buf).to_string()))
    }

    /// Writes one already-encoded line (including its trailing `\n`).
    pub async fn write_line(&mut self, line: &str) -> GameResult<()> {
        match self {
            ServerTransport::Tcp { writer, .. } => {
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            ServerTransport::Stdio { writer, .. } => {
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }
}
