//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Filesystem events over WebSocket
#[derive(Parser, Debug)]
#[command(
    name = "argus",
    version = env!("CARGO_PKG_VERSION"),
    about = "Stream filesystem changes to WebSocket subscribers",
    long_about = "Watch directories under a root and stream their changes to WebSocket \
                  subscribers. Subscribers of the same directory share one watcher.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default .argus/settings.toml
    #[command(about = "Set up .argus directory with default configuration")]
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration settings
    #[command(about = "Display active settings")]
    Config,

    /// Start the WebSocket server
    #[command(
        about = "Start the WebSocket server",
        after_help = "Examples:\n  argus serve --root /srv/data\n  argus serve --bind 0.0.0.0:8888\n\nSubscribe:\n  ws://HOST/<path>?enable=CRfile&disable=all\n  ws://HOST/<path>?disable=MDfile&disable=MDdir\n\nTokens: CRfile CRdir MDfile MDdir MVfile MVdir DLfile DLdir (disable also takes 'all')"
    )]
    Serve {
        /// Directory all watched paths are confined to (overrides config)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Address to listen on (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["argus", "serve", "--root", "/srv", "--bind", "0.0.0.0:1"]);
        match cli.command {
            Commands::Serve { root, bind } => {
                assert_eq!(root, Some(PathBuf::from("/srv")));
                assert_eq!(bind.as_deref(), Some("0.0.0.0:1"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["argus", "config", "--config", "custom.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(cli.command, Commands::Config));
    }
}
