//! Command-line interface for weibodcast
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Turn a Weibo account into a two-voice podcast
#[derive(Parser, Debug)]
#[command(
    name = "weibodcast",
    version,
    about = "Turn a Weibo account into a two-voice podcast"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress progress output and logs below errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug logs, -vv: trace logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the podcast server
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },
    /// Generate a podcast through a running server
    #[cfg(feature = "client")]
    Generate {
        /// Weibo user id
        user_id: String,
        /// Audio file with a sample of the guest's voice
        #[arg(long, short = 's', value_name = "FILE")]
        sample: PathBuf,
        /// Server base URL
        #[arg(long, value_name = "URL", default_value = "http://127.0.0.1:8000")]
        server: String,
        /// Where to write the podcast audio
        #[arg(long, short = 'o', value_name = "FILE", default_value = "podcast.mp3")]
        output: PathBuf,
    },
    /// Generate a podcast in this process, without a server
    Run {
        /// Weibo user id
        user_id: String,
        /// Audio file with a sample of the guest's voice
        #[arg(long, short = 's', value_name = "FILE")]
        sample: PathBuf,
        /// Where to write the podcast audio
        #[arg(long, short = 'o', value_name = "FILE", default_value = "podcast.mp3")]
        output: PathBuf,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Configuration inspection actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value by key (e.g., minimax.tts_model)
    Get {
        /// Dotted key path (e.g., llm.model, weibo.max_posts)
        key: String,
    },
    /// List current configuration values (optionally one section)
    List {
        /// Config section to show (e.g., server, weibo, llm, minimax)
        section: Option<String>,
    },
    /// Dump a commented configuration template
    Dump,
    /// Print the default configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["weibodcast", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Serve { bind: None }));
        assert!(!cli.quiet);
        assert_eq!(cli.verbose, 0);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_serve_bind() {
        let cli = Cli::try_parse_from(["weibodcast", "serve", "--bind", "127.0.0.1:9000"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.as_deref(), Some("127.0.0.1:9000")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_verbose_double() {
        let cli = Cli::try_parse_from(["weibodcast", "-vv", "serve"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["weibodcast", "serve", "-q", "--config", "/tmp/c.toml"]).unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[cfg(feature = "client")]
    #[test]
    fn test_parse_generate_defaults() {
        let cli = Cli::try_parse_from(["weibodcast", "generate", "1234567", "--sample", "me.mp3"])
            .unwrap();
        match cli.command {
            Commands::Generate {
                user_id,
                sample,
                server,
                output,
            } => {
                assert_eq!(user_id, "1234567");
                assert_eq!(sample, PathBuf::from("me.mp3"));
                assert_eq!(server, "http://127.0.0.1:8000");
                assert_eq!(output, PathBuf::from("podcast.mp3"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_run_requires_sample() {
        assert!(Cli::try_parse_from(["weibodcast", "run", "1234567"]).is_err());
        let cli =
            Cli::try_parse_from(["weibodcast", "run", "1234567", "-s", "me.wav", "-o", "out.mp3"])
                .unwrap();
        match cli.command {
            Commands::Run { output, .. } => assert_eq!(output, PathBuf::from("out.mp3")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_get() {
        let cli = Cli::try_parse_from(["weibodcast", "config", "get", "llm.model"]).unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Get { key },
            } => assert_eq!(key, "llm.model"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_completions() {
        let cli = Cli::try_parse_from(["weibodcast", "completions", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Completions { shell: Shell::Bash }
        ));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["weibodcast"]).is_err());
    }
}
