//! The protocol driver: the event loop tying a [`crate::transport::ServerTransport`]
//! to a local command source — a human typing lines on stdin, an in-process
//! [`crate::bot::Bot`], or an out-of-process [`crate::shell_bot::ShellBot`].
//!
//! The driver itself never decides a move; it only applies every incoming
//! `ServerMessage` to a [`ClientState`] and forwards it to whichever command
//! source is in play.

use log::{debug, warn};
use shared::error::{GameError, GameResult};
use shared::message::{ClientMessage, ServerMessage};
use shared::ship::Ship;
use shared::Configuration;
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};

use crate::bot::Bot;
use crate::shell_bot::ShellBot;
use crate::transport::ServerTransport;
use crate::view::ClientState;

/// What the initial `G|...` `GameInfo` line told us before we joined.
pub struct Handshake {
    pub config: Configuration,
    pub title: String,
    pub started: bool,
}

/// Reads and parses the server's opening `GameInfo` line. Must be the very
/// first thing read off a fresh connection.
pub async fn read_game_info(transport: &mut ServerTransport) -> GameResult<Handshake> {
    let line = transport
        .read_line()
        .await?
        .ok_or_else(|| GameError::PermanentIo("server closed before sending GameInfo".to_string()))?;
    match ServerMessage::decode(&line)? {
        ServerMessage::GameInfo {
            title,
            min_players,
            max_players,
            width,
            height,
            boats,
            started,
            ..
        } => {
            let mut builder = shared::configuration::ConfigurationBuilder::new(title.clone())
                .min_players(min_players)
                .max_players(max_players)
                .board_size(width, height);
            for boat in &boats {
                if let Some(ship) = Ship::from_display_string(boat) {
                    builder = builder.add_ship(ship);
                }
            }
            let config = builder.build()?;
            Ok(Handshake { config, title, started })
        }
        other => Err(GameError::Protocol(format!("expected GameInfo as the first message, got {other:?}"))),
    }
}

/// Sends the `J|name[|desc]` join request.
pub async fn join(transport: &mut ServerTransport, name: &str, descriptor: Option<String>) -> GameResult<()> {
    let msg = ClientMessage::Join { name: name.to_string(), descriptor };
    transport.write_line(&msg.encode()?).await
}

/// Owns the connection and the client-side view of the match in progress.
pub struct Driver {
    transport: ServerTransport,
    state: ClientState,
    you: String,
}

impl Driver {
    pub fn new(transport: ServerTransport, you: impl Into<String>, config: Configuration, title: String) -> Self {
        let you = you.into();
        Driver {
            transport,
            state: ClientState::new(you.clone(), config, title),
            you,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn you(&self) -> &str {
        &self.you
    }

    /// Reads and applies the next line from the server. `Ok(None)` means the
    /// connection closed.
    pub async fn read_message(&mut self) -> GameResult<Option<ServerMessage>> {
        let Some(line) = self.transport.read_line().await? else {
            return Ok(None);
        };
        debug!("<- {line}");
        let msg = ServerMessage::decode(&line)?;
        self.apply(&msg);
        Ok(Some(msg))
    }

    fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::Joined { name } => self.state.apply_joined(name),
            ServerMessage::YourBoard { descriptor } => self.state.apply_your_board(descriptor),
            ServerMessage::Left { name } => self.state.apply_left(name),
            ServerMessage::Board { name, status, descriptor, score, skips } => {
                self.state.apply_board(name, status, descriptor, *score, *skips)
            }
            ServerMessage::Started { order } => self.state.apply_started(order.clone()),
            ServerMessage::Turn { name } => self.state.apply_turn(name),
            ServerMessage::Finish { .. } => self.state.apply_finish(),
            ServerMessage::GameInfo { .. }
            | ServerMessage::Skipped { .. }
            | ServerMessage::Hit { .. }
            | ServerMessage::Message { .. }
            | ServerMessage::Result { .. }
            | ServerMessage::Error { .. } => {}
        }
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> GameResult<()> {
        let line = msg.encode()?;
        debug!("-> {}", line.trim_end());
        self.transport.write_line(&line).await
    }
}

fn describe(you: &str, msg: &ServerMessage) {
    match msg {
        ServerMessage::Joined { name } => println!("* {name} joined"),
        ServerMessage::Left { name } => println!("* {name} left"),
        ServerMessage::Started { order } => println!("* game started, turn order: {}", order.join(", ")),
        ServerMessage::Turn { name } if name == you => println!("* your turn"),
        ServerMessage::Turn { name } => println!("* {name}'s turn"),
        ServerMessage::Skipped { name, reason } => match reason {
            Some(r) => println!("* {name} skipped ({r})"),
            None => println!("* {name} skipped"),
        },
        ServerMessage::Hit { shooter, target, square } => println!("* {shooter} hit {target} at {square}"),
        ServerMessage::Message { from, text, .. } => println!("[{from}] {text}"),
        ServerMessage::Finish { turns, players, .. } => println!("* game finished after {turns} turns, {players} players"),
        ServerMessage::Result { name, score, skips, turns, status } => {
            println!("* {name}: {status}, score={score}, skips={skips}, turns={turns}")
        }
        ServerMessage::Error { text } => println!("! error: {text}"),
        _ => {}
    }
}

/// Runs the driver against an in-process [`Bot`]: every server message
/// updates both the client view and the bot, and on our turn the bot picks
/// the shot (or skip) directly, no local input needed.
pub async fn run_bot(driver: &mut Driver, bot: &mut dyn Bot) -> GameResult<()> {
    let you = driver.you().to_string();
    bot.new_game(driver.state().config(), &you);

    loop {
        let Some(msg) = driver.read_message().await? else {
            return Ok(());
        };
        match &msg {
            ServerMessage::Joined { name } => bot.player_joined(name),
            ServerMessage::Board { name, .. } => {
                if let Some(board) = driver.state().board(name) {
                    bot.update_board(name, board);
                }
            }
            ServerMessage::Started { order } => bot.start_game(order),
            ServerMessage::Finish { .. } => {
                bot.finish_game();
                return Ok(());
            }
            ServerMessage::Hit { shooter, target, square } => bot.on_hit(shooter, target, square),
            ServerMessage::Message { from, text, .. } => bot.on_message(from, text),
            ServerMessage::Turn { name } if name == &you => {
                let reply = match bot.best_shot(&you) {
                    Some((target, coord)) => ClientMessage::Shoot { target, x: coord.x(), y: coord.y() },
                    None => ClientMessage::Skip { name: you.clone() },
                };
                driver.send(&reply).await?;
            }
            _ => {}
        }
    }
}

/// Runs the driver delegating every move to an out-of-process [`ShellBot`].
/// Every line read from the server is mirrored verbatim onto the child's
/// stdin; on our turn, the child's own `S`/`K` choice (read from its
/// stdout) is forwarded verbatim to the server.
pub async fn run_shell(driver: &mut Driver, shell: &mut ShellBot) -> GameResult<()> {
    let you = driver.you().to_string();
    loop {
        let Some(msg) = driver.read_message().await? else {
            return Ok(());
        };
        // Re-encoding rather than forwarding the raw line keeps the mirror
        // consistent with however `Driver::apply` just normalized state.
        if let Ok(line) = msg.encode() {
            if let Err(e) = shell.write_line(&line).await {
                warn!("failed to mirror line to bot child: {e}");
            }
        }

        if let ServerMessage::Finish { .. } = msg {
            return Ok(());
        }

        if let ServerMessage::Turn { name } = &msg {
            if name == &you {
                let Some(choice) = shell.read_line().await? else {
                    return Err(GameError::PermanentIo("bot child closed stdout mid-game".to_string()));
                };
                let reply = ClientMessage::decode(&choice)?;
                driver.send(&reply).await?;
            }
        }
    }
}

/// Runs the driver for a human at the keyboard: prints every server event
/// and parses simple line commands (`shoot <target> <x> <y>`, `skip`,
/// `taunt hit|miss <text>`, `msg <to> <text>`, `quit`).
pub async fn run_human(driver: &mut Driver, stdin: &mut BufReader<Stdin>) -> GameResult<()> {
    let you = driver.you().to_string();
    loop {
        let mut line = String::new();
        tokio::select! {
            msg = driver.read_message() => {
                let Some(msg) = msg? else { return Ok(()) };
                describe(&you, &msg);
                if matches!(msg, ServerMessage::Finish { .. }) {
                    return Ok(());
                }
            }
            n = stdin.read_line(&mut line) => {
                let n = n.map_err(GameError::from)?;
                if n == 0 {
                    continue;
                }
                if let Some(cmd) = parse_command(line.trim(), &you) {
                    driver.send(&cmd).await?;
                }
            }
        }
    }
}

fn parse_command(line: &str, you: &str) -> Option<ClientMessage> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "shoot" => {
            let target = parts.next()?.to_string();
            let x: u32 = parts.next()?.parse().ok()?;
            let y: u32 = parts.next()?.parse().ok()?;
            Some(ClientMessage::Shoot { target, x, y })
        }
        "skip" => Some(ClientMessage::Skip { name: you.to_string() }),
        "taunt" => {
            let which = parts.next()?;
            let on_hit = which == "hit";
            let text = parts.collect::<Vec<_>>().join(" ");
            Some(ClientMessage::Taunt { on_hit, text })
        }
        "msg" => {
            let to = parts.next()?.to_string();
            let text = parts.collect::<Vec<_>>().join(" ");
            Some(ClientMessage::Message { to, text })
        }
        "quit" => None,
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_shoot_command() {
        let cmd = parse_command("shoot alice 3 4", "bob").unwrap();
        assert_eq!(cmd, ClientMessage::Shoot { target: "alice".to_string(), x: 3, y: 4 });
    }

    #[test]
    fn parses_skip_using_the_caller_name() {
        let cmd = parse_command("skip", "bob").unwrap();
        assert_eq!(cmd, ClientMessage::Skip { name: "bob".to_string() });
    }

    #[test]
    fn unknown_command_is_ignored() {
        assert!(parse_command("dance", "bob").is_none());
    }
}
