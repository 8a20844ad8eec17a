use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;
use tessera::ImportOptions;

#[allow(clippy::too_many_arguments)]
pub fn run(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config: Option<PathBuf>,
    path: PathBuf,
    srid: Option<u32>,
    dat_fields: Vec<String>,
    interval: u64,
) -> Result<()> {
    let client = super::connect(host, key_id, secret_key, config)?;

    let mut options = ImportOptions::new().with_poll_interval(Duration::from_secs(interval));
    if let Some(srid) = srid {
        options = options.with_srid(srid);
    }
    if !dat_fields.is_empty() {
        options = options.with_dat_fields(dat_fields);
    }

    let pb = super::spinner("Importing...");
    let report = client.import_geodata(&path, &options);
    pb.finish_and_clear();

    let report = report.with_context(|| format!("Failed to import {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
