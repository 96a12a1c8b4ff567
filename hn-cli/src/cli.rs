//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hacker News write actions from the command line
#[derive(Parser, Debug)]
#[command(name = "hn", about = "Vote, favorite and comment on Hacker News", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// File holding the session cookies as a `Cookie` header line
    #[arg(long, global = true)]
    pub cookie_file: Option<PathBuf>,

    /// Base URL of the Hacker News site
    #[arg(long, global = true, default_value = hn_write_client::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// User-Agent header sent with every request
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    pub timeout: u64,

    /// Log what the client is doing (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Action to perform
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upvote an item
    Vote { id: u64 },
    /// Remove an upvote
    Unvote { id: u64 },
    /// Add an item to your favorites
    Favorite { id: u64 },
    /// Remove an item from your favorites
    Unfavorite { id: u64 },
    /// Reply to an item or comment
    Comment {
        /// Item or comment to reply to
        parent: u64,
        /// Comment text
        text: String,
    },
    /// Show which account the session belongs to
    Whoami,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vote() {
        let args = Args::try_parse_from(["hn", "vote", "42"]).unwrap();
        assert_eq!(args.command, Command::Vote { id: 42 });
        assert_eq!(args.base_url, "https://news.ycombinator.com");
        assert_eq!(args.timeout, 30);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_parse_comment_with_global_options() {
        let args = Args::try_parse_from([
            "hn",
            "comment",
            "7",
            "Hello there",
            "--cookie-file",
            "~/hn.cookies",
            "-vv",
        ])
        .unwrap();
        assert_eq!(
            args.command,
            Command::Comment {
                parent: 7,
                text: "Hello there".to_string()
            }
        );
        assert_eq!(args.cookie_file, Some(PathBuf::from("~/hn.cookies")));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_rejects_non_numeric_id() {
        assert!(Args::try_parse_from(["hn", "favorite", "abc"]).is_err());
    }
}
