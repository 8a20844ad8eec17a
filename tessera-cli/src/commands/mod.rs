pub mod add_features;
pub mod create_layer;
pub mod delete_layer;
pub mod features;
pub mod import;
pub mod layers;
pub mod tasks;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use tessera::{Client, Config};

/// Build a client from the configuration sources, with command-line
/// overrides applied last.
pub fn connect(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config_file: Option<PathBuf>,
) -> Result<Client> {
    let mut config = match config_file {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(key_id) = key_id {
        config.key_id = key_id;
    }
    if let Some(secret_key) = secret_key {
        config.secret_key = secret_key;
    }
    if config.key_id.is_empty() || config.secret_key.is_empty() {
        bail!(
            "Missing API credentials. Use --key-id and --secret-key, set TESSERA_KEY_ID \
             and TESSERA_SECRET_KEY, or put them in a configuration file"
        );
    }
    Client::new(config).context("Failed to create client")
}

/// Spinner shown while waiting on the server.
pub fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
