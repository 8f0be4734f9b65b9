use shared::geometry::Coordinate;
use shared::{Board, Configuration};

use super::TargetingStrategy;

/// Never shoots; every turn is a pass. Useful as a baseline opponent and for
/// exercising the server's skip-turn bookkeeping without a real targeting
/// engine in the loop.
#[derive(Default, Clone)]
pub struct Skipper;

impl Skipper {
    pub fn new() -> Self {
        Skipper
    }
}

impl TargetingStrategy for Skipper {
    fn name(&self) -> &'static str {
        "skipper"
    }

    fn new_game(&mut self) {}

    fn target(&mut self, _board: &Board, _config: &Configuration) -> Option<Coordinate> {
        None
    }
}
