//! Stdio Bot
//!
//! Chats over the terminal with the stock handlers registered:
//!
//! ```text
//! !hello                     Hello, world!
//! !addcom !sheep (count)...  moderators only (run with --admin)
//! !roulette 10               needs points in the database
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package stdio-bot -- --database impbot.db --admin
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use impbot::prelude::*;
use impbot::runtime::config::{LogLevel, LogOutput};
use impbot::runtime::logging;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file; defaults to searching for impbot.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database, overriding the config.
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Log level, overriding the config.
    #[arg(short, long)]
    log_level: Option<LogLevel>,

    /// Treat the console user as an admin.
    #[arg(long)]
    admin: bool,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let mut config = loader.load().context("failed to load configuration")?;
    if let Some(database) = args.database {
        config.bot.database = Some(database);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    // Replies go to stdout, so logs go elsewhere.
    if config.logging.output == LogOutput::Stdout {
        config.logging.output = LogOutput::Stderr;
    }
    logging::init_from_config(&config.logging);

    let stdio = &config.connections.stdio;
    let user = User::new("console", stdio.user.clone()).with_admin(stdio.admin || args.admin);
    let console = StdioConnection::stdio(user).retry(config.connections.retry.to_connection_retry());

    let bot = BotBuilder::from_config(&config.bot)
        .connection(console)
        .observer(LoggingObserver::new())
        .handler(Hello::handler()?)
        .handler(Roulette::new().handler()?)
        .handler(CustomCommands::new().handler()?)
        .handler(CustomRegex::new())
        .build()
        .context("failed to build bot")?;

    let handle = bot.handle();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, shutting down");
        handle.shutdown();
    })?;

    info!("Bot is running. Press Ctrl+C to stop.");
    match bot.main() {
        Ok(report) => {
            if !report.is_graceful() {
                error!(stalled = ?report.stalled, failed = ?report.failed, "Unclean shutdown");
            }
            Ok(report.exit_code())
        }
        Err(e) => {
            error!(error = %e, "Bot stopped on a fatal error");
            Ok(ExitCode::FAILURE)
        }
    }
}
