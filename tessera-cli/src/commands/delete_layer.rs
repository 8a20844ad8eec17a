use anyhow::{Context, Result};
use std::path::PathBuf;

pub fn run(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config: Option<PathBuf>,
    uuid: Option<String>,
    all: bool,
) -> Result<()> {
    let client = super::connect(host, key_id, secret_key, config)?;

    if all {
        client.delete_layers().context("Failed to delete layers")?;
        println!("Deleted all layers");
    } else {
        let uuid = uuid.context("Give a layer uuid or use --all")?;
        client
            .delete_layer(&uuid)
            .with_context(|| format!("Failed to delete layer {}", uuid))?;
        println!("Deleted layer {}", uuid);
    }

    Ok(())
}
