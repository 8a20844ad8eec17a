//! Layer records and the sparse specs sent to create or update them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TesseraError};

/// Definition of one user field carried by a layer's features.
///
/// Field values travel as `field_<name>` keys in feature properties. The
/// `type` vocabulary (`string`, `integer`, `real`, `date`) is defined by the
/// server; `size` only applies to string fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            size: None,
        }
    }

    /// A field with an explicit maximum size, e.g. a bounded string.
    pub fn sized(name: impl Into<String>, field_type: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            size: Some(size),
        }
    }
}

/// A layer as reported by the server.
///
/// Timestamps are epoch milliseconds. `extent` is the bounding box of the
/// layer's features in SRID units, or `None` for an empty layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub uuid: String,
    pub uri: String,
    pub date_created: i64,
    pub date_modified: i64,
    pub num_features: u64,
    pub num_points: u64,
    pub fields: Vec<FieldDef>,
    pub srid: u32,
    pub dims: u8,
    pub extent: Option<Vec<f64>>,
}

/// Sparse layer description for create and update calls.
///
/// Only the fields that are set are serialized, so the same type covers
/// creating a layer and changing a subset of an existing one.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LayerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldDef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dims: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<Vec<f64>>,
}

impl LayerSpec {
    /// Spec for a new layer. The server requires a name on creation.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_srid(mut self, srid: u32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn with_dims(mut self, dims: u8) -> Self {
        self.dims = Some(dims);
        self
    }

    pub fn with_extent(mut self, extent: Vec<f64>) -> Self {
        self.extent = Some(extent);
        self
    }
}

/// Extract the layer records from one listing page.
pub(crate) fn parse_page(mut page: Value) -> Result<Vec<Layer>> {
    let layers = page
        .get_mut("layers")
        .map(Value::take)
        .ok_or_else(|| TesseraError::Response("layer page without a layers key".to_string()))?;
    serde_json::from_value(layers).map_err(Into::into)
}
