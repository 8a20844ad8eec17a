//! List every layer on the account with its sizes.
//!
//! Run with: cargo run --example layers
//!
//! Credentials come from the usual configuration sources (`tessera.toml`,
//! `~/.tessera/config.toml` or `TESSERA_*` environment variables).

use tessera::{Client, Config, LayerQuery, TesseraError};

fn main() -> Result<(), TesseraError> {
    let client = Client::new(Config::load()?)?;

    let layers = client.get_layers(&LayerQuery::new())?;
    println!("{} layers:", layers.len());
    println!("{:-<70}", "");
    for layer in &layers {
        println!(
            "{}  {}  {} features, {} points, srid {}",
            layer.uuid, layer.name, layer.num_features, layer.num_points, layer.srid
        );
    }

    Ok(())
}
