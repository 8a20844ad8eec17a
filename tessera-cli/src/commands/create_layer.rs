use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tessera::{FieldDef, LayerSpec};

#[allow(clippy::too_many_arguments)]
pub fn run(
    host: Option<String>,
    key_id: Option<String>,
    secret_key: Option<String>,
    config: Option<PathBuf>,
    name: String,
    srid: Option<u32>,
    dims: Option<u8>,
    fields: Vec<String>,
) -> Result<()> {
    let field_defs = fields
        .iter()
        .map(|spec| parse_field(spec))
        .collect::<Result<Vec<_>>>()?;

    let mut spec = LayerSpec::new(name);
    if let Some(srid) = srid {
        spec = spec.with_srid(srid);
    }
    if let Some(dims) = dims {
        spec = spec.with_dims(dims);
    }
    if !field_defs.is_empty() {
        spec = spec.with_fields(field_defs);
    }

    let client = super::connect(host, key_id, secret_key, config)?;
    let layers = client
        .add_layers(&[spec])
        .context("Failed to create layer")?;
    let layer = layers.first().context("Server returned no layer record")?;
    println!("{}", layer.uuid);

    Ok(())
}

/// Parse a field description of the form `name:type` or `name:type:size`.
fn parse_field(spec: &str) -> Result<FieldDef> {
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [name, field_type] => Ok(FieldDef::new(*name, *field_type)),
        [name, field_type, size] => {
            let size: u32 = size
                .parse()
                .with_context(|| format!("Invalid field size in '{}'", spec))?;
            Ok(FieldDef::sized(*name, *field_type, size))
        }
        _ => bail!("Invalid field '{}'. Use name:type or name:type:size", spec),
    }
}
