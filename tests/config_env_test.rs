use argus::Settings;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_env_overrides_workspace_config() {
    // Run from a temp workspace so the real .argus directory is not picked up
    let temp_dir = TempDir::new().unwrap();
    let original_dir = env::current_dir().unwrap();
    env::set_current_dir(&temp_dir).unwrap();

    let config_dir = temp_dir.path().join(".argus");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("settings.toml"),
        r#"
root = "/from/file"

[server]
bind = "127.0.0.1:7000"
keepalive_secs = 30

[watch]
subscriber_buffer = 16
"#,
    )
    .unwrap();

    unsafe {
        // Double underscore separates nested levels
        env::set_var("ARGUS_SERVER__BIND", "0.0.0.0:9999");
        env::set_var("ARGUS_WATCH__RENAME_WINDOW_MS", "250");
    }

    let settings = Settings::load().unwrap();

    // Environment wins over the file
    assert_eq!(settings.server.bind, "0.0.0.0:9999");
    assert_eq!(settings.watch.rename_window_ms, 250);
    // File values remain where no env var is set
    assert_eq!(settings.root, std::path::PathBuf::from("/from/file"));
    assert_eq!(settings.server.keepalive_secs, 30);
    assert_eq!(settings.watch.subscriber_buffer, 16);
    // Defaults fill the rest
    assert_eq!(settings.watch.event_buffer, 100);

    unsafe {
        env::remove_var("ARGUS_SERVER__BIND");
        env::remove_var("ARGUS_WATCH__RENAME_WINDOW_MS");
    }
    env::set_current_dir(original_dir).unwrap();
}
