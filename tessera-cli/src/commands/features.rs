use anyhow::{Context, Result};
use geojson::FeatureCollection;
use std::path::PathBuf;
use tessera::FeatureQuery;

pub fn run(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config: Option<PathBuf>,
    layer: String,
    limit: Option<u64>,
) -> Result<()> {
    let client = super::connect(host, key_id, secret_key, config)?;

    let mut query = FeatureQuery::new();
    if let Some(limit) = limit {
        query = query.slice(0, limit);
    }

    let features = client
        .get_features(&layer, &query)
        .with_context(|| format!("Failed to list features of layer {}", layer))?;

    let collection = FeatureCollection {
        bbox: None,
        features: features.iter().map(to_geojson).collect(),
        foreign_members: None,
    };
    println!("{}", serde_json::to_string_pretty(&collection)?);

    Ok(())
}

/// Render a stored feature as plain GeoJSON: user fields as properties,
/// uuid as the feature id.
fn to_geojson(feature: &tessera::Feature) -> geojson::Feature {
    let mut properties = geojson::JsonObject::new();
    for (name, value) in &feature.fields {
        properties.insert(name.clone(), value.clone());
    }
    geojson::Feature {
        bbox: None,
        geometry: feature.geometry.clone(),
        id: feature.uuid.clone().map(geojson::feature::Id::String),
        properties: Some(properties),
        foreign_members: None,
    }
}
