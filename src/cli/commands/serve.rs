//! Serve command - run the WebSocket server.

use std::path::PathBuf;

use crate::config::Settings;

/// Arguments for the serve command.
pub struct ServeArgs {
    pub root: Option<PathBuf>,
    pub bind: Option<String>,
}

/// Apply CLI overrides on top of loaded settings.
pub fn apply_overrides(mut config: Settings, args: ServeArgs) -> Settings {
    if let Some(root) = args.root {
        config.root = root;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config
}

/// Run the serve command.
pub async fn run(args: ServeArgs, config: Settings) {
    let config = apply_overrides(config, args);

    if !config.root.is_dir() {
        eprintln!("Watch root is not a directory: {}", config.root.display());
        std::process::exit(1);
    }

    crate::debug_event!(
        "server",
        "settings",
        "keepalive every {}s, subscriber buffer {}",
        config.server.keepalive_secs,
        config.watch.subscriber_buffer
    );

    if let Err(e) = crate::server::serve_http(config).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
