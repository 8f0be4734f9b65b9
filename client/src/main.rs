//! Client/bot application entry point (§6): connects to a server (or, with
//! `--bot`, speaks the protocol to a spawned child over its stdio instead),
//! places a board, and drives the match as a human at the keyboard, an
//! in-process engine bot, or a shell-bot proxy. `--test` bypasses the
//! network entirely and runs the in-process bot-tournament harness.

use clap::Parser;
use log::{error, info};
use tokio::io::{stdin, BufReader};

use client::bot::{Bot, EngineBot};
use client::driver::{self, Driver};
use client::shell_bot::ShellBot;
use client::targeting::{Heuristic, Parity, PlacementSearch, Random, Skipper};
use client::tester;
use client::transport::ServerTransport;
use shared::board::Board;
use shared::database::FileSysDatabase;
use shared::error::{GameError, GameResult};

/// Command-line arguments for the client/bot binary.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host. Omit to run as a shell-bot child speaking over stdio.
    #[arg(short = 'h', long)]
    host: Option<String>,

    /// Server port.
    #[arg(short = 'p', long, default_value_t = 7948)]
    port: u16,

    /// Player name.
    #[arg(short = 'u', long = "user", visible_short_alias = 'n', visible_alias = "name", default_value = "player")]
    name: String,

    /// Use the given board descriptor instead of a randomly placed fleet.
    #[arg(short = 's', long = "static-board")]
    static_board: Option<String>,

    /// Min-surface-area ratio (0..100) for random board placement.
    #[arg(long, default_value_t = 0)]
    msa: u32,

    /// Key=value file with `hit`/`miss` taunt lines.
    #[arg(short = 't', long = "taunt-file")]
    taunt_file: Option<String>,

    /// Targeting strategy to play as, or the command driving a shell-bot
    /// child when paired with `--bot`. One of: random, parity, heuristic,
    /// placement-search, skipper.
    #[arg(long, default_value = "heuristic")]
    strategy: String,

    /// Run a bot as a child process instead of in this one; the argument is
    /// the command line to spawn.
    #[arg(long)]
    bot: Option<String>,

    /// Run the in-process bot tournament harness instead of connecting to a
    /// server.
    #[arg(long, default_value_t = false)]
    test: bool,

    /// Number of self-play matches for `--test`.
    #[arg(short = 'c', long, default_value_t = 100)]
    count: u32,

    /// Board width for `--test`.
    #[arg(short = 'x', long, default_value_t = 10)]
    width: u32,

    /// Board height for `--test`.
    #[arg(short = 'y', long, default_value_t = 10)]
    height: u32,

    /// Database directory `--test` results are recorded under.
    #[arg(short = 'd', long = "test-db", default_value = "./db")]
    test_db: String,

    /// Print a running tally after every `--test` match.
    #[arg(short = 'w', long, default_value_t = false)]
    watch: bool,

    /// Log level passed through to `env_logger`'s filter, overriding RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Enable debug-level protocol logging regardless of `log_level`.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn read_taunts(path: &str) -> GameResult<(Vec<String>, Vec<String>)> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| GameError::Config(format!("failed to read taunt file {path}: {e}")))?;
    let mut hits = Vec::new();
    let mut misses = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else { continue };
        match key.trim() {
            "hit" => hits.push(value.trim().to_string()),
            "miss" => misses.push(value.trim().to_string()),
            _ => {}
        }
    }
    Ok((hits, misses))
}

/// Picks the starting board's descriptor: a caller-supplied static layout,
/// validated against `config`'s cell count, or a freshly randomized fleet.
fn place_board(config: &shared::Configuration, static_board: Option<&str>, msa: u32) -> GameResult<String> {
    if let Some(desc) = static_board {
        let mut board = Board::new(0, "you".to_string(), config);
        if !board.update_descriptor(desc) {
            return Err(GameError::Validation(format!(
                "static board descriptor does not match the {}x{} board",
                config.board_width(),
                config.board_height()
            )));
        }
        return Ok(board.descriptor());
    }
    let mut board = Board::new(0, "you".to_string(), config);
    board.add_random_ships(config, msa)?;
    Ok(board.descriptor())
}

async fn run_against_server(args: &Args) -> GameResult<()> {
    let mut transport = ServerTransport::connect(&format!(
        "{}:{}",
        args.host.as_deref().unwrap_or("127.0.0.1"),
        args.port
    ))
    .await?;

    let handshake = driver::read_game_info(&mut transport).await?;
    let descriptor = place_board(&handshake.config, args.static_board.as_deref(), args.msa)?;
    driver::join(&mut transport, &args.name, Some(descriptor)).await?;

    let config = handshake.config.clone();
    let title = handshake.title.clone();
    let started = handshake.started;
    let mut driver = Driver::new(transport, args.name.clone(), handshake.config, handshake.title);

    if let Some(cmd) = &args.bot {
        info!("spawning shell-bot child: {cmd}");
        let mut shell = ShellBot::spawn(cmd, &args.name, &config, &title, started).await?;
        driver::run_shell(&mut driver, &mut shell).await
    } else if args.strategy != "human" {
        run_engine_bot(&mut driver, &args.strategy).await
    } else {
        let mut stdin = BufReader::new(stdin());
        driver::run_human(&mut driver, &mut stdin).await
    }
}

/// Dispatches to the right `EngineBot<S>` monomorphization for the chosen
/// strategy name. Each arm is its own concrete type, so this can't be a
/// runtime-polymorphic single call; the match is the whole dispatch.
async fn run_engine_bot(driver: &mut Driver, strategy: &str) -> GameResult<()> {
    let you = driver.you().to_string();
    match strategy {
        "random" => {
            let mut bot = EngineBot::new(you, Random::new());
            driver::run_bot(driver, &mut bot as &mut dyn Bot).await
        }
        "parity" => {
            let mut bot = EngineBot::new(you, Parity::new());
            driver::run_bot(driver, &mut bot as &mut dyn Bot).await
        }
        "heuristic" => {
            let mut bot = EngineBot::new(you, Heuristic::new());
            driver::run_bot(driver, &mut bot as &mut dyn Bot).await
        }
        "placement-search" => {
            let mut bot = EngineBot::new(you, PlacementSearch::new());
            driver::run_bot(driver, &mut bot as &mut dyn Bot).await
        }
        "skipper" => {
            let mut bot = EngineBot::new(you, Skipper::new());
            driver::run_bot(driver, &mut bot as &mut dyn Bot).await
        }
        other => Err(GameError::Config(format!("unknown targeting strategy: {other}"))),
    }
}

/// Run as a shell-bot child: a parent process's [`ShellBot`] has us on the
/// other end of a pipe, speaking the same protocol a live connection would
/// but starting with an `I|name|version|player` identification line instead
/// of a raw socket handshake.
async fn run_shell_bot_child(args: &Args) -> GameResult<()> {
    let mut transport = ServerTransport::stdio();
    let identify = transport
        .read_line()
        .await?
        .ok_or_else(|| GameError::PermanentIo("parent closed before sending identification".to_string()))?;
    let mut fields = identify.split('|');
    if fields.next() != Some("I") {
        return Err(GameError::Protocol(format!("expected identification line, got {identify:?}")));
    }
    let name = fields.next().unwrap_or(&args.name).to_string();

    let handshake = driver::read_game_info(&mut transport).await?;
    let mut driver = Driver::new(transport, name, handshake.config, handshake.title);
    run_engine_bot(&mut driver, &args.strategy).await
}

fn run_test(args: &Args) -> GameResult<()> {
    let db = FileSysDatabase::new(&args.test_db)?;
    let watch = args.watch;
    let name = args.strategy.clone();

    macro_rules! run_with {
        ($template:expr) => {
            tester::run_self_play(
                &name,
                &$template,
                args.width,
                args.height,
                args.count,
                &db,
                |done, total, outcome| {
                    if watch {
                        println!(
                            "{done}/{total}: wins={} aborted={} avg_turns={:.1}",
                            outcome.wins, outcome.aborted, outcome.avg_turns
                        );
                    }
                },
            )
        };
    }

    let outcome = match args.strategy.as_str() {
        "random" => run_with!(Random::new()),
        "parity" => run_with!(Parity::new()),
        "heuristic" => run_with!(Heuristic::new()),
        "placement-search" => run_with!(PlacementSearch::new()),
        "skipper" => run_with!(Skipper::new()),
        other => return Err(GameError::Config(format!("unknown targeting strategy: {other}"))),
    }?;

    println!(
        "{} games, {} wins, {} aborted, avg {:.1} turns",
        outcome.games, outcome.wins, outcome.aborted, outcome.avg_turns
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    if let Some(level) = &args.log_level {
        std::env::set_var("RUST_LOG", level);
    } else if args.debug {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Some(path) = &args.taunt_file {
        match read_taunts(path) {
            Ok((hits, misses)) => info!("loaded {} hit taunts, {} miss taunts from {path}", hits.len(), misses.len()),
            Err(e) => error!("{e}"),
        }
    }

    let result = if args.test {
        run_test(&args)
    } else if args.host.is_none() && args.bot.is_none() {
        // No server host and no child to spawn: this process is itself the
        // shell-bot child, speaking the mirrored protocol over its own
        // stdin/stdout.
        run_shell_bot_child(&args).await
    } else {
        run_against_server(&args).await
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}
