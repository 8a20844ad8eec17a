use anyhow::{Context, Result};
use geojson::FeatureCollection;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tessera::Feature;

pub fn run(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config: Option<PathBuf>,
    layer: String,
    input: PathBuf,
) -> Result<()> {
    let file =
        File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?;
    let collection: FeatureCollection =
        serde_json::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    let features: Vec<Feature> = collection
        .features
        .into_iter()
        .map(to_feature)
        .collect::<Result<_>>()?;

    let client = super::connect(host, key_id, secret_key, config)?;

    let pb = ProgressBar::new(features.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    // Upload one batch at a time so the bar tracks actual progress.
    let batch_size = client.config().upload_batch_size.max(1);
    let mut stored = 0usize;
    for chunk in features.chunks(batch_size) {
        stored += client
            .add_features(&layer, chunk)
            .with_context(|| format!("Failed to add features to layer {}", layer))?
            .len();
        pb.inc(chunk.len() as u64);
    }
    pb.finish_with_message("done");

    println!("Stored {} features in layer {}", stored, layer);
    Ok(())
}

/// Convert an input GeoJSON feature: the geometry is kept and every property
/// becomes a user field.
fn to_feature(input: geojson::Feature) -> Result<Feature> {
    let geometry = input.geometry.context("Feature without a geometry")?;
    let mut feature = Feature::new(geometry);
    if let Some(properties) = input.properties {
        feature = feature.with_fields(properties);
    }
    Ok(feature)
}
