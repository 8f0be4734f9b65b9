//! Client-side copies of every board the server has described to us, built
//! from the same [`shared::Board`] the server itself uses. The driver never
//! computes anything the server didn't already tell it — it just applies
//! each incoming `ServerMessage` to this state.

use std::collections::HashMap;

use shared::{Board, Configuration};

#[derive(Debug, Clone)]
pub struct ClientState {
    config: Configuration,
    title: String,
    you: String,
    boards: HashMap<String, Board>,
    order: Vec<String>,
    to_move: Option<String>,
    started: bool,
    finished: bool,
}

impl ClientState {
    pub fn new(you: impl Into<String>, config: Configuration, title: impl Into<String>) -> Self {
        ClientState {
            config,
            title: title.into(),
            you: you.into(),
            boards: HashMap::new(),
            order: Vec::new(),
            to_move: None,
            started: false,
            finished: false,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn you(&self) -> &str {
        &self.you
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn to_move(&self) -> Option<&str> {
        self.to_move.as_deref()
    }

    pub fn is_your_turn(&self) -> bool {
        self.to_move.as_deref() == Some(self.you.as_str())
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn board(&self, name: &str) -> Option<&Board> {
        self.boards.get(name)
    }

    pub fn your_board(&self) -> Option<&Board> {
        self.boards.get(&self.you)
    }

    /// Every joined board other than your own, in join order.
    pub fn opponents(&self) -> impl Iterator<Item = &Board> {
        let you = self.you.clone();
        self.boards
            .values()
            .filter(move |b| b.name() != you)
    }

    /// Opponents still worth shooting at: connected and not already dead.
    pub fn live_opponents(&self) -> impl Iterator<Item = &Board> {
        self.opponents().filter(|b| !b.is_dead())
    }

    fn board_mut_or_new(&mut self, name: &str) -> &mut Board {
        self.boards
            .entry(name.to_string())
            .or_insert_with(|| Board::new(0, name.to_string(), &self.config))
    }

    /// Applies a `B|name|status|desc|score|skips` update. The descriptor is
    /// unmasked for your own board and masked for everyone else's, but this
    /// state doesn't need to know which: it just stores what it was sent.
    pub fn apply_board(&mut self, name: &str, status: &str, descriptor: &str, score: u32, skips: u32) {
        let board = self.board_mut_or_new(name);
        board.set_status(status);
        board.update_descriptor(descriptor);
        board.set_score(score);
        board.set_skips(skips);
    }

    /// Applies a `Y|desc` reply: your own authoritative board.
    pub fn apply_your_board(&mut self, descriptor: &str) {
        let you = self.you.clone();
        let board = self.board_mut_or_new(&you);
        board.update_descriptor(descriptor);
    }

    pub fn apply_joined(&mut self, name: &str) {
        self.board_mut_or_new(name);
    }

    pub fn apply_left(&mut self, name: &str) {
        if let Some(board) = self.boards.get_mut(name) {
            board.set_status("disconnected");
        }
    }

    pub fn apply_started(&mut self, order: Vec<String>) {
        self.started = true;
        self.order = order;
    }

    pub fn apply_turn(&mut self, name: &str) {
        self.to_move = Some(name.to_string());
    }

    pub fn apply_finish(&mut self) {
        self.finished = true;
        self.to_move = None;
    }
}
