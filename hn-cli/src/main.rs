//! HN CLI - Command-line interface for Hacker News write actions

mod cli;
mod config;
mod error;

use clap::Parser;
use cli::{Args, Command};
use config::Config;
use hn_write_client::HnClient;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();
    init_telemetry(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        if let Some(hint) = e.hint() {
            eprintln!("Hint: {}", hint);
        }
        std::process::exit(1);
    }
}

/// Log to stderr, honouring `RUST_LOG` when set
fn init_telemetry(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info,hn_write_client=debug",
        _ => "debug,hn_write_client=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<(), error::CliError> {
    let config = Config::from_args(args)?;
    tracing::info!(session = %config.session, base_url = %config.base_url, "session loaded");

    if config.command == Command::Whoami {
        println!("{}", config.session.username().unwrap_or("(unknown)"));
        return Ok(());
    }

    let client = config.client()?;
    execute(&client, &config)
}

/// Run the requested write action and report it
fn execute(client: &HnClient, config: &Config) -> Result<(), error::CliError> {
    let session = &config.session;
    let done = match &config.command {
        Command::Vote { id } => client.vote(*id, session).map(|()| format!("Upvoted {}", id)),
        Command::Unvote { id } => client.unvote(*id, session).map(|()| format!("Removed vote on {}", id)),
        Command::Favorite { id } => client
            .favorite(*id, session)
            .map(|()| format!("Added {} to favorites", id)),
        Command::Unfavorite { id } => client
            .unfavorite(*id, session)
            .map(|()| format!("Removed {} from favorites", id)),
        Command::Comment { parent, text } => client
            .comment(*parent, text, session)
            .map(|()| format!("Replied to {}", parent)),
        Command::Whoami => Ok(session.username().unwrap_or("(unknown)").to_string()),
    }?;

    println!("{}", done);
    Ok(())
}
