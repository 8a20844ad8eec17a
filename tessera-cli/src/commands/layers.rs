use anyhow::{Context, Result};
use std::path::PathBuf;
use tessera::{FilterOp, LayerQuery};

pub fn run(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config: Option<PathBuf>,
    name: Option<String>,
    limit: Option<u64>,
    json: bool,
) -> Result<()> {
    let client = super::connect(host, key_id, secret_key, config)?;

    let mut query = LayerQuery::new();
    if let Some(name) = name {
        query = query.name(FilterOp::Exact, name);
    }
    if let Some(limit) = limit {
        query = query.slice(0, limit);
    }

    let layers = client.get_layers(&query).context("Failed to list layers")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&layers)?);
        return Ok(());
    }

    if layers.is_empty() {
        println!("No layers");
        return Ok(());
    }

    println!(
        "{:<38} {:<24} {:>10} {:>12} {:>6}",
        "UUID", "NAME", "FEATURES", "POINTS", "SRID"
    );
    println!("{}", "-".repeat(94));

    let mut total_features = 0u64;
    let mut total_points = 0u64;
    for layer in &layers {
        println!(
            "{:<38} {:<24} {:>10} {:>12} {:>6}",
            layer.uuid, layer.name, layer.num_features, layer.num_points, layer.srid
        );
        total_features += layer.num_features;
        total_points += layer.num_points;
    }

    println!();
    println!("Summary:");
    println!("  Total layers: {}", layers.len());
    println!("  Total features: {}", total_features);
    println!("  Total points: {}", total_points);

    Ok(())
}
