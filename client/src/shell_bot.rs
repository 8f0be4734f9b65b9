//! Out-of-process bot transport (§4.6): a bot that runs as a child process
//! and speaks the same line-oriented protocol as a live server connection,
//! over its own stdin/stdout instead of a socket.
//!
//! The parent (this module) mirrors every line it reads from the real
//! server onto the child's stdin, and reads the child's stdout for its `S`
//! or `K` choice on its turn. This makes a shell bot indistinguishable, from
//! the driver's point of view, from any other local command source.

use log::debug;
use shared::error::{GameError, GameResult};
use shared::message::ServerMessage;
use shared::Configuration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

const SHELL_BOT_VERSION: &str = "1";

/// Builds the same `G|...` line a server would send a fresh connection,
/// reusing this process's already-known match config so the child can run
/// its own [`crate::driver::read_game_info`] handshake over its stdio
/// transport exactly as it would over a real socket.
fn game_info_line(config: &Configuration, title: &str, started: bool) -> GameResult<String> {
    let msg = ServerMessage::GameInfo {
        version: SHELL_BOT_VERSION.to_string(),
        title: title.to_string(),
        min_players: config.min_players(),
        max_players: config.max_players(),
        joined: 0,
        point_goal: config.point_goal(),
        width: config.board_width(),
        height: config.board_height(),
        boats: config.ships().iter().map(|s| s.to_display_string()).collect(),
        started,
    };
    msg.encode()
}

pub struct ShellBot {
    child: Child,
    reader: BufReader<ChildStdout>,
    writer: ChildStdin,
}

impl ShellBot {
    /// Spawns `cmd` (split on whitespace — this crate has no shell-quoting
    /// dependency, so arguments containing spaces are not supported) with
    /// piped stdio, then sends the `I|name|version|player` identification
    /// line followed by a synthesized `GameInfo` line, so the child can run
    /// the same handshake it would over a real socket before the mirrored
    /// protocol stream starts.
    pub async fn spawn(cmd: &str, player: &str, config: &Configuration, title: &str, started: bool) -> GameResult<ShellBot> {
        let mut parts = cmd.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| GameError::Config("empty --bot command".to_string()))?;
        let mut child = Command::new(program)
            .args(parts)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| GameError::PermanentIo(format!("failed to spawn bot {cmd:?}: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GameError::PermanentIo("bot child has no stdout".to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| GameError::PermanentIo("bot child has no stdin".to_string()))?;

        let mut bot = ShellBot {
            child,
            reader: BufReader::new(stdout),
            writer: stdin,
        };
        let identify = format!("I|{player}|{SHELL_BOT_VERSION}|{player}\n");
        bot.write_line(&identify).await?;
        bot.write_line(&game_info_line(config, title, started)?).await?;
        Ok(bot)
    }

    /// Mirrors a line from the real server onto the child's stdin.
    pub async fn write_line(&mut self, line: &str) -> GameResult<()> {
        debug!("-> [bot] {}", line.trim_end());
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Reads the child's next line (its `S`/`K` choice, or anything else it
    /// emits on its own stdout). `Ok(None)` means the child closed stdout.
    pub async fn read_line(&mut self) -> GameResult<Option<String>> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(buf.strip_suffix('\n').unwrap_or(&buf).to_string()))
    }

    pub async fn wait(&mut self) -> GameResult<std::process::ExitStatus> {
        self.child
            .wait()
            .await
            .map_err(|e| GameError::PermanentIo(format!("bot child wait failed: {e}")))
    }
}

impl Drop for ShellBot {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}
