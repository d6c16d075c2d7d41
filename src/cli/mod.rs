// CLI module for gemguard
// Author: kelexine (https://github.com/kelexine)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// gemguard - Resilient Gemini client with caching, admission control and retries
#[derive(Parser, Debug)]
#[command(name = "gemguard", version, about, long_about = None)]
pub struct Args {
    /// Config file to load instead of ~/.gemguard/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a complete response for a prompt
    Generate {
        prompt: String,

        /// Override the configured model
        #[arg(long)]
        model: Option<String>,

        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,

        /// Print the raw JSON response instead of its text
        #[arg(long)]
        raw: bool,
    },

    /// Stream a response to stdout as it is generated
    Stream {
        prompt: String,

        #[arg(long)]
        model: Option<String>,
    },

    /// Print client statistics and Prometheus metrics
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let args = Args::parse_from(["gemguard", "--config", "/tmp/g.toml", "generate", "hi", "--no-cache"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/g.toml")));
        match args.command {
            Command::Generate { prompt, no_cache, raw, model } => {
                assert_eq!(prompt, "hi");
                assert!(no_cache);
                assert!(!raw);
                assert!(model.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_stats() {
        let args = Args::parse_from(["gemguard", "stats"]);
        assert!(matches!(args.command, Command::Stats));
    }
}
