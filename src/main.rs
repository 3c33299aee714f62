use argus::Settings;
use argus::cli::commands::{init, serve};
use argus::cli::{Cli, Commands};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    argus::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Init { force } => init::run_init(force),
        Commands::Config => init::run_config(&config),
        Commands::Serve { root, bind } => {
            serve::run(serve::ServeArgs { root, bind }, config).await;
        }
    }
}
