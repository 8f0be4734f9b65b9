//! The authoritative server: a single-task event loop that owns every open
//! [`Session`] and the one [`Game`] in play.
//!
//! There is no `tokio::spawn` anywhere in this module. Every accept and
//! every session read is polled from the same `tokio::select!`, rebuilt
//! fresh each time around the outer loop, so ownership of `sessions` never
//! has to be shared across tasks.

use std::collections::HashMap;
use std::time::Duration;

use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use shared::database::FileSysDatabase;
use shared::error::{GameError, GameResult};
use shared::geometry::Coordinate;
use shared::message::{ClientMessage, ServerMessage};
use shared::{Board, Configuration};
use tokio::net::TcpListener;

use crate::game::Game;
use crate::session::{Handle, Session};

const SERVER_VERSION: &str = "1";

pub struct Server {
    listener: TcpListener,
    sessions: HashMap<Handle, Session>,
    game: Game,
    db: FileSysDatabase,
    blacklist: Vec<String>,
    auto_start: bool,
    repeat: bool,
    turn_timeout: Duration,
    idle_timeout: Duration,
    next_handle: Handle,
}

impl Server {
    /// Binds the listening socket and constructs an empty lobby `Game`.
    ///
    /// # Example
    /// ```rust
    /// # use shared::configuration::ConfigurationBuilder;
    /// # use shared::ship::Ship;
    /// # use shared::database::FileSysDatabase;
    /// # tokio_test::block_on(async {
    /// let config = ConfigurationBuilder::new("demo")
    ///     .min_players(2)
    ///     .max_players(2)
    ///     .board_size(10, 10)
    ///     .add_ship(Ship::new(b'A', 2).unwrap())
    ///     .build()
    ///     .unwrap();
    /// let db = FileSysDatabase::new(std::env::temp_dir().join("server-bind-doctest")).unwrap();
    /// let server = server::network::Server::bind(
    ///     "127.0.0.1", 0, config, "demo".to_string(), db, vec![], false, false,
    /// ).await.unwrap();
    /// assert!(server.local_addr().is_ok());
    /// # });
    /// ```
    pub async fn bind(
        bind_address: &str,
        port: u16,
        config: Configuration,
        title: String,
        db: FileSysDatabase,
        blacklist: Vec<String>,
        auto_start: bool,
        repeat: bool,
    ) -> GameResult<Server> {
        let addr = format!("{bind_address}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| GameError::Config(format!("failed to bind {addr}: {e}")))?;
        info!("listening on {addr}");
        Ok(Server {
            listener,
            sessions: HashMap::new(),
            game: Game::new(config, title),
            db,
            blacklist,
            auto_start,
            repeat,
            turn_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(30),
            next_handle: 0,
        })
    }

    pub fn with_timeouts(mut self, turn_timeout: Duration, idle_timeout: Duration) -> Self {
        self.turn_timeout = turn_timeout;
        self.idle_timeout = idle_timeout;
        self
    }

    /// The bound socket address, including the OS-assigned port when bound
    /// to port 0. Exists mainly so tests can connect back to a server bound
    /// to an ephemeral port.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs matches until a shutdown signal arrives, or (when `repeat` is
    /// off) until the single configured match finishes.
    pub async fn run(&mut self) -> GameResult<()> {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        #[cfg(unix)]
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|e| GameError::PermanentIo(e.to_string()))?;

        loop {
            let listener = &self.listener;
            let sessions = &mut self.sessions;
            let mut reads = FuturesUnordered::new();
            for (&handle, session) in sessions.iter_mut() {
                reads.push(async move {
                    let line = session.read_line().await;
                    (handle, line)
                });
            }

            let mut shutdown = false;
            tokio::select! {
                accepted = listener.accept() => {
                    drop(reads);
                    match accepted {
                        Ok((stream, addr)) => self.accept(stream, addr).await,
                        Err(e) => warn!("accept failed: {e}"),
                    }
                }
                Some((handle, line)) = reads.next(), if !reads.is_empty() => {
                    drop(reads);
                    self.on_read(handle, line).await;
                }
                _ = tick.tick() => {
                    drop(reads);
                    self.on_tick().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    drop(reads);
                    info!("received ctrl-c, shutting down");
                    shutdown = true;
                }
                #[cfg(unix)]
                _ = terminate.recv() => {
                    drop(reads);
                    info!("received SIGTERM, shutting down");
                    shutdown = true;
                }
            }
            if shutdown {
                break;
            }

            if self.game.is_finished() && !self.repeat {
                break;
            }
        }
        Ok(())
    }

    async fn accept(&mut self, stream: tokio::net::TcpStream, addr: std::net::SocketAddr) {
        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        let handle = self.next_handle;
        self.next_handle += 1;
        let mut session = Session::new(handle, read_half, write_half);
        debug!("accepted connection {handle} from {addr}");

        let info = self.game_info();
        if let Err(e) = session.write_line(&info.encode().unwrap()).await {
            warn!("failed to greet {handle}: {e}");
            return;
        }
        self.sessions.insert(handle, session);
    }

    fn game_info(&self) -> ServerMessage {
        let config = self.game.config();
        ServerMessage::GameInfo {
            version: SERVER_VERSION.to_string(),
            title: self.game.title().to_string(),
            min_players: config.min_players(),
            max_players: config.max_players(),
            joined: self.game.player_count() as u32,
            point_goal: config.point_goal(),
            width: config.ship_area().width(),
            height: config.ship_area().height(),
            boats: config.ships().iter().map(|s| s.to_display_string()).collect(),
            started: !self.game.is_lobby(),
        }
    }

    async fn on_read(&mut self, handle: Handle, line: GameResult<Option<String>>) {
        match line {
            Ok(Some(text)) => {
                if let Err(e) = self.dispatch(handle, &text).await {
                    self.reply_error(handle, &e.to_string()).await;
                }
            }
            Ok(None) => self.drop_session(handle, "connection closed").await,
            Err(e) => self.drop_session(handle, &e.to_string()).await,
        }
    }

    async fn dispatch(&mut self, handle: Handle, line: &str) -> GameResult<()> {
        debug!("<- [{handle}] {line}");
        let msg = ClientMessage::decode(line)?;
        match msg {
            ClientMessage::Join { name, descriptor } => self.handle_join(handle, name, descriptor).await,
            ClientMessage::Shoot { target, x, y } => self.handle_shoot(handle, target, x, y).await,
            ClientMessage::Skip { name } => self.handle_skip(handle, name).await,
            ClientMessage::Taunt { on_hit, text } => self.handle_taunt(handle, on_hit, text),
            ClientMessage::Message { to, text } => self.handle_message(handle, to, text).await,
            ClientMessage::Ping => {
                if let Some(session) = self.sessions.get_mut(&handle) {
                    session.touch();
                }
                Ok(())
            }
        }
    }

    fn session_board_name(&self, handle: Handle) -> Option<String> {
        self.sessions.get(&handle)?.player_name().map(str::to_string)
    }

    async fn handle_join(&mut self, handle: Handle, name: String, descriptor: Option<String>) -> GameResult<()> {
        if name.is_empty() || name.contains('|') {
            return Err(GameError::Validation("invalid player name".to_string()));
        }
        if self.blacklist.iter().any(|b| b == &name) {
            return Err(GameError::Validation("name is blacklisted".to_string()));
        }

        if !self.game.is_lobby() {
            let reconnect = self
                .game
                .board(&name)
                .map(|b| !b.is_connected())
                .unwrap_or(false);
            if !reconnect {
                return Err(GameError::Validation(format!("no disconnected player named {name}")));
            }
            let board = self.game.board_mut(&name).unwrap();
            board.set_handle(handle);
            board.set_status("connected");
            let private = board.descriptor();
            if let Some(session) = self.sessions.get_mut(&handle) {
                session.set_player_name(name.clone());
                session.write_line(&ServerMessage::YourBoard { descriptor: private }.encode()?).await?;
            }
            self.broadcast(&ServerMessage::Joined { name }).await;
            return Ok(());
        }

        let config = self.game.config().clone();
        let mut board = Board::new(handle, name.clone(), &config);
        match descriptor {
            Some(desc) => {
                if !board.update_descriptor(&desc) || !board.is_valid() {
                    return Err(GameError::Validation("invalid board descriptor".to_string()));
                }
            }
            None => board.add_random_ships(&config, 50)?,
        }
        let private = board.descriptor();
        self.game.add_board(board)?;

        if let Some(session) = self.sessions.get_mut(&handle) {
            session.set_player_name(name.clone());
            session.write_line(&ServerMessage::YourBoard { descriptor: private }.encode()?).await?;
            session.write_line(&ServerMessage::Joined { name: name.clone() }.encode()?).await?;
        }
        self.broadcast_except(handle, &ServerMessage::Joined { name }).await;

        if self.auto_start && self.game.player_count() as u32 == self.game.config().max_players() {
            self.start_game().await?;
        }
        Ok(())
    }

    async fn start_game(&mut self) -> GameResult<()> {
        self.game.start(true)?;
        let order = self.game.order();
        self.broadcast(&ServerMessage::Started { order: order.clone() }).await;
        if let Some(first) = order.first() {
            self.broadcast(&ServerMessage::Turn { name: first.clone() }).await;
        }
        Ok(())
    }

    async fn handle_shoot(&mut self, handle: Handle, target: String, x: u32, y: u32) -> GameResult<()> {
        let shooter = self
            .session_board_name(handle)
            .ok_or_else(|| GameError::Protocol("must join before shooting".to_string()))?;
        if !self.game.is_running() {
            return Err(GameError::InvalidState("game is not running".to_string()));
        }
        if self.game.board_to_move_name() != Some(shooter.as_str()) {
            return Err(GameError::InvalidState("not your turn".to_string()));
        }
        if target == shooter {
            return Err(GameError::Validation("cannot shoot your own board".to_string()));
        }
        let coord = Coordinate::new(x, y);
        let target_board = self
            .game
            .board(&target)
            .ok_or_else(|| GameError::Validation(format!("no such player: {target}")))?;
        if target_board.is_dead() {
            return Err(GameError::Validation("target is already dead".to_string()));
        }
        if !target_board.ship_area().contains(coord) {
            return Err(GameError::Validation("coordinate out of bounds".to_string()));
        }

        let (result, _previous) = self.game.board_mut(&target).unwrap().shoot(coord);
        use shared::board::ShootResult;
        match result {
            ShootResult::Illegal => return Err(GameError::Validation("already shot".to_string())),
            ShootResult::Hit(ship_id) => {
                let board = self.game.board_mut(&shooter).unwrap();
                board.inc_score(1);
                let _ = ship_id;
            }
            ShootResult::Miss => {}
        }
        self.game.board_mut(&shooter).unwrap().inc_turns(1);

        self.broadcast_board(&target).await;
        self.broadcast_board(&shooter).await;
        if matches!(result, ShootResult::Hit(_)) {
            self.broadcast(&ServerMessage::Hit {
                shooter: shooter.clone(),
                target: target.clone(),
                square: coord.to_display_string(),
            })
            .await;
            self.play_hit_taunt(&target, &shooter).await;
        }

        self.game.next_turn();
        if self.game.is_finished() {
            self.finish_match().await?;
        } else if let Some(next) = self.game.board_to_move_name().map(str::to_string) {
            self.broadcast(&ServerMessage::Turn { name: next }).await;
        }
        Ok(())
    }

    async fn handle_skip(&mut self, handle: Handle, name: String) -> GameResult<()> {
        let caller = self
            .session_board_name(handle)
            .ok_or_else(|| GameError::Protocol("must join before skipping".to_string()))?;
        if caller != name {
            return Err(GameError::Validation("can only skip for yourself".to_string()));
        }
        self.skip(&name, None).await
    }

    async fn skip(&mut self, name: &str, reason: Option<&str>) -> GameResult<()> {
        if self.game.board_to_move_name() != Some(name) {
            return Err(GameError::InvalidState("not your turn".to_string()));
        }
        if let Some(board) = self.game.board_mut(name) {
            board.inc_skips(1);
            board.inc_turns(1);
        }
        self.broadcast(&ServerMessage::Skipped {
            name: name.to_string(),
            reason: reason.map(str::to_string),
        })
        .await;
        self.game.next_turn();
        if self.game.is_finished() {
            self.finish_match().await?;
        } else if let Some(next) = self.game.board_to_move_name().map(str::to_string) {
            self.broadcast(&ServerMessage::Turn { name: next }).await;
        }
        Ok(())
    }

    fn handle_taunt(&mut self, handle: Handle, on_hit: bool, text: String) -> GameResult<()> {
        let name = self
            .session_board_name(handle)
            .ok_or_else(|| GameError::Protocol("must join before taunting".to_string()))?;
        let board = self
            .game
            .board_mut(&name)
            .ok_or_else(|| GameError::InvalidState("joined session has no board".to_string()))?;
        if on_hit {
            board.clear_hit_taunts();
            if !text.is_empty() {
                board.add_hit_taunt(text);
            }
        } else {
            board.clear_miss_taunts();
            if !text.is_empty() {
                board.add_miss_taunt(text);
            }
        }
        Ok(())
    }

    async fn play_hit_taunt(&mut self, target: &str, shooter: &str) {
        let taunt = self
            .game
            .board_mut(target)
            .and_then(|b| b.random_hit_taunt().map(str::to_string));
        if let Some(text) = taunt {
            if let Some(handle) = self.handle_for(shooter) {
                let msg = ServerMessage::Message {
                    from: target.to_string(),
                    text,
                    to: shooter.to_string(),
                };
                self.send_to(handle, &msg).await;
            }
        }
    }

    async fn handle_message(&mut self, handle: Handle, to: String, text: String) -> GameResult<()> {
        let from = self
            .session_board_name(handle)
            .ok_or_else(|| GameError::Protocol("must join before messaging".to_string()))?;
        let msg = ServerMessage::Message {
            from: from.clone(),
            text,
            to: to.clone(),
        };
        if to.is_empty() {
            self.broadcast_except(handle, &msg).await;
        } else if let Some(target_handle) = self.handle_for(&to) {
            self.send_to(target_handle, &msg).await;
        } else {
            return Err(GameError::Validation(format!("no such player: {to}")));
        }
        Ok(())
    }

    fn handle_for(&self, name: &str) -> Option<Handle> {
        self.game.board(name).map(|b| b.handle()).filter(|h| *h >= 0)
    }

    async fn on_tick(&mut self) {
        if self.game.is_running() {
            if let Some(name) = self.game.board_to_move_name().map(str::to_string) {
                // Two independent reasons a to-move player is auto-skipped:
                // their session dropped, or they're still connected but have
                // simply sat on their turn past `turn_timeout`.
                let disconnected = self
                    .game
                    .board(&name)
                    .map(|b| !b.is_connected())
                    .unwrap_or(false);
                let turn_expired = self.game.turn_elapsed() > self.turn_timeout;
                if disconnected || turn_expired {
                    if let Err(e) = self.skip(&name, Some("timeout")).await {
                        error!("auto-skip failed for {name}: {e}");
                    }
                }
            }
        }

        let overdue: Vec<Handle> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.idle_for() > self.idle_timeout && !s.pong_overdue(self.idle_timeout * 2))
            .map(|(h, _)| *h)
            .collect();
        for handle in overdue {
            if let Some(session) = self.sessions.get_mut(&handle) {
                session.mark_ping_sent();
                let _ = session.write_line("P\n").await;
            }
        }
        let dead: Vec<Handle> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.pong_overdue(self.idle_timeout * 2))
            .map(|(h, _)| *h)
            .collect();
        for handle in dead {
            self.drop_session(handle, "idle timeout").await;
        }
    }

    async fn drop_session(&mut self, handle: Handle, reason: &str) {
        if let Some(session) = self.sessions.remove(&handle) {
            debug!("dropping session {handle}: {reason}");
            if let Some(name) = session.player_name().map(str::to_string) {
                if let Some(left_name) = self.game.disconnect(handle) {
                    self.broadcast(&ServerMessage::Left { name: left_name }).await;
                } else {
                    self.broadcast(&ServerMessage::Left { name }).await;
                }
                if self.game.is_finished() {
                    if let Err(e) = self.finish_match().await {
                        error!("failed to finish match after disconnect: {e}");
                    }
                }
            }
        }
    }

    async fn finish_match(&mut self) -> GameResult<()> {
        let results = self.game.results();
        self.broadcast(&ServerMessage::Finish {
            status: "finished".to_string(),
            turns: self.game.turn_count(),
            players: results.len() as u32,
        })
        .await;
        for r in &results {
            self.broadcast(&ServerMessage::Result {
                name: r.name.clone(),
                score: r.score,
                skips: r.skips,
                turns: r.turns,
                status: if r.first_place { "winner".to_string() } else { "finished".to_string() },
            })
            .await;
        }
        if let Err(e) = self.game.save_results(&self.db) {
            error!("failed to persist results: {e}");
        }
        info!("match {} finished after {} turns", self.game.title(), self.game.turn_count());
        Ok(())
    }

    /// Sends a board update to every session. The owner's own socket gets
    /// the unmasked descriptor; everyone else gets the masked one, so a
    /// player always knows their own ship layout but never an opponent's.
    async fn broadcast_board(&mut self, name: &str) {
        let (owner_handle, owner_msg, others_msg) = {
            let board = match self.game.board(name) {
                Some(b) => b,
                None => return,
            };
            let status = board.status().to_string();
            let score = board.score();
            let skips = board.skips();
            let owner_msg = ServerMessage::Board {
                name: board.name().to_string(),
                status: status.clone(),
                descriptor: board.descriptor(),
                score,
                skips,
            };
            let others_msg = ServerMessage::Board {
                name: board.name().to_string(),
                status,
                descriptor: board.masked_descriptor(),
                score,
                skips,
            };
            (board.handle(), owner_msg, others_msg)
        };

        let Ok(others_line) = others_msg.encode() else { return };
        for (&handle, session) in self.sessions.iter_mut() {
            if handle == owner_handle {
                continue;
            }
            if let Err(e) = session.write_line(&others_line).await {
                warn!("broadcast write failed for {handle}: {e}");
            }
        }
        if owner_handle >= 0 {
            self.send_to(owner_handle, &owner_msg).await;
        }
    }

    async fn broadcast(&mut self, msg: &ServerMessage) {
        let Ok(line) = msg.encode() else { return };
        for session in self.sessions.values_mut() {
            if let Err(e) = session.write_line(&line).await {
                warn!("broadcast write failed for {}: {e}", session.handle());
            }
        }
    }

    async fn broadcast_except(&mut self, except: Handle, msg: &ServerMessage) {
        let Ok(line) = msg.encode() else { return };
        for (&handle, session) in self.sessions.iter_mut() {
            if handle == except {
                continue;
            }
            if let Err(e) = session.write_line(&line).await {
                warn!("broadcast write failed for {handle}: {e}");
            }
        }
    }

    async fn send_to(&mut self, handle: Handle, msg: &ServerMessage) {
        let Ok(line) = msg.encode() else { return };
        if let Some(session) = self.sessions.get_mut(&handle) {
            if let Err(e) = session.write_line(&line).await {
                warn!("write failed for {handle}: {e}");
            }
        }
    }

    async fn reply_error(&mut self, handle: Handle, text: &str) {
        self.send_to(handle, &ServerMessage::Error { text: text.to_string() }).await;
    }
}
