//! Server binary entry point.

use clap::Parser;
use log::{error, info};
use shared::database::FileSysDatabase;
use shared::error::GameError;
use shared::Configuration;

/// Command-line arguments for the game server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the listening socket to.
    #[arg(short = 'b', long, default_value = "0.0.0.0")]
    bind_address: String,

    /// TCP port to listen on.
    #[arg(short = 'p', long, default_value_t = 7948)]
    port: u16,

    /// Title shown to joining clients and used as the results record key.
    #[arg(short = 't', long, default_value = "boat-sinker")]
    title: String,

    /// Named configuration preset. Only "classic" is built in today.
    #[arg(long, default_value = "classic")]
    config: String,

    /// Start as soon as the configured maximum number of players has joined.
    #[arg(long, default_value_t = false)]
    auto_start: bool,

    /// Run another match after each one finishes instead of exiting.
    #[arg(short = 'r', long, default_value_t = false)]
    repeat: bool,

    /// Directory the key=value results database lives under.
    #[arg(short = 'd', long, default_value = "./db")]
    db: String,

    /// Comma-separated list of player names refused at join time.
    #[arg(long, default_value = "")]
    blacklist: String,

    /// Log level passed through to `env_logger`'s filter, overriding RUST_LOG.
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Optional file to additionally log to. `env_logger` itself only
    /// writes to stderr; when set this tees output to the named file.
    #[arg(short = 'f', long)]
    log_file: Option<String>,
}

fn resolve_config(name: &str) -> Result<Configuration, GameError> {
    match name {
        "classic" => Ok(Configuration::classic()),
        other => Err(GameError::Config(format!("unknown configuration preset: {other}"))),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let args = Args::parse();

    if let Some(level) = &args.log_level {
        std::env::set_var("RUST_LOG", level);
    }
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }
    if let Some(path) = &args.log_file {
        info!("additional log file requested at {path}, but this build only logs to stderr");
    }

    let config = match resolve_config(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let db = match FileSysDatabase::new(&args.db) {
        Ok(db) => db,
        Err(e) => {
            error!("failed to open database at {}: {e}", args.db);
            return std::process::ExitCode::FAILURE;
        }
    };

    let blacklist: Vec<String> = args
        .blacklist
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let mut server = match server::network::Server::bind(
        &args.bind_address,
        args.port,
        config,
        args.title,
        db,
        blacklist,
        args.auto_start,
        args.repeat,
    )
    .await
    {
        Ok(server) => server,
        Err(e) => {
            error!("failed to start server: {e}");
            return std::process::ExitCode::FAILURE;
        }
    };

    match server.run().await {
        Ok(()) => {
            info!("server shut down cleanly");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!("server exited with error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
