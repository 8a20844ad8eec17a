//! Geometric features and their GeoJSON wire format.
//!
//! On the wire a feature is a GeoJSON `Feature`: the server stores the
//! geometry plus user field values (`field_<name>` keys in `properties`) and
//! reports its own bookkeeping (`uri`, timestamps, the result of a spatial
//! operation) in the same properties object. Outbound features carry only the
//! geometry and the field values.

use geojson::feature::Id;
use geojson::{Feature as GeoJsonFeature, FeatureCollection, Geometry};
use serde_json::{Map, Value};

use crate::error::{Result, TesseraError};

/// A geometric feature stored in a layer.
///
/// Server-assigned attributes (`uuid`, `uri`, timestamps) are `None` until
/// the feature has been stored. `spatial` holds the geometry produced by a
/// server-side spatial operation when one was requested.
#[derive(Debug, Clone, Default)]
pub struct Feature {
    pub geometry: Option<Geometry>,
    /// User field values keyed by field name, without the wire prefix.
    pub fields: Map<String, Value>,
    pub uuid: Option<String>,
    pub uri: Option<String>,
    pub layer_uuid: Option<String>,
    pub date_created: Option<i64>,
    pub date_modified: Option<i64>,
    pub spatial: Option<Geometry>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry: Some(geometry),
            ..Default::default()
        }
    }

    /// Set one user field value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Replace all user field values.
    pub fn with_fields(mut self, fields: Map<String, Value>) -> Self {
        self.fields = fields;
        self
    }

    /// Look up a user field value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Render the outbound GeoJSON form: geometry plus `field_<name>`
    /// properties, nothing else.
    pub(crate) fn to_wire(&self) -> GeoJsonFeature {
        let mut properties = Map::new();
        for (name, value) in &self.fields {
            properties.insert(format!("field_{}", name), value.clone());
        }
        GeoJsonFeature {
            bbox: None,
            geometry: self.geometry.clone(),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }

    /// Build a [`Feature`] from a stored GeoJSON record.
    pub(crate) fn from_wire(feature: GeoJsonFeature) -> Result<Self> {
        let uuid = match feature.id {
            Some(Id::String(s)) => Some(s),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        };

        let mut parsed = Feature {
            geometry: feature.geometry,
            uuid,
            ..Default::default()
        };
        for (key, value) in feature.properties.unwrap_or_default() {
            if let Some(name) = key.strip_prefix("field_") {
                parsed.fields.insert(name.to_string(), value);
                continue;
            }
            match key.as_str() {
                "uri" => parsed.uri = value.as_str().map(str::to_owned),
                "date_created" => parsed.date_created = value.as_i64(),
                "date_modified" => parsed.date_modified = value.as_i64(),
                "spatial" if !value.is_null() => {
                    parsed.spatial = Some(Geometry::try_from(value)?);
                }
                _ => {}
            }
        }
        parsed.layer_uuid = parsed.uri.as_deref().and_then(layer_uuid_from_uri);
        Ok(parsed)
    }
}

/// Wrap outbound features in a GeoJSON `FeatureCollection`.
pub(crate) fn to_collection(features: &[Feature]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: features.iter().map(Feature::to_wire).collect(),
        foreign_members: None,
    }
}

/// Parse a bare `FeatureCollection` response, as returned by feature
/// creation.
pub(crate) fn parse_collection(value: Value) -> Result<Vec<Feature>> {
    let collection = FeatureCollection::try_from(value)?;
    collection
        .features
        .into_iter()
        .map(Feature::from_wire)
        .collect()
}

/// Extract the features from one listing page (`geo` key).
pub(crate) fn parse_page(mut page: Value) -> Result<Vec<Feature>> {
    let geo = page
        .get_mut("geo")
        .map(Value::take)
        .ok_or_else(|| TesseraError::Response("feature page without a geo key".to_string()))?;
    parse_collection(geo)
}

/// Layer UUID embedded in a feature URI
/// (`/geo/1/layers/<layer_uuid>/features/<uuid>`).
fn layer_uuid_from_uri(uri: &str) -> Option<String> {
    uri.split('/').nth(4).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::Value as GeoJsonValue;
    use serde_json::json;

    fn point(coordinates: Vec<f64>) -> Geometry {
        Geometry::new(GeoJsonValue::Point(coordinates))
    }

    fn stored_record() -> Value {
        json!({
            "type": "Feature",
            "id": "test_point_1",
            "geometry": {"type": "Point", "coordinates": [1.0, 2.0, 3.0]},
            "properties": {
                "uri": "/geo/1/layers/test_layer_1/features/test_point_1",
                "field_ts": 4,
                "field_tag": "test_tag_1",
                "date_created": 5,
                "date_modified": 6,
                "spatial": {"type": "Point", "coordinates": [4.0, 5.0, 6.0]}
            }
        })
    }

    #[test]
    fn test_outbound_wire_shape() {
        let feature = Feature::new(point(vec![1.0, 2.0, 3.0]))
            .with_field("ts", 4)
            .with_field("tag", "test_tag_1");

        let wire = serde_json::to_value(feature.to_wire()).unwrap();
        assert_eq!(
            wire,
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [1.0, 2.0, 3.0]},
                "properties": {"field_tag": "test_tag_1", "field_ts": 4}
            })
        );
    }

    #[test]
    fn test_collection_wraps_all_features() {
        let features = vec![
            Feature::new(point(vec![1.0, 2.0])),
            Feature::new(point(vec![3.0, 4.0])),
        ];
        let wire = serde_json::to_value(to_collection(&features)).unwrap();
        assert_eq!(wire["type"], "FeatureCollection");
        assert_eq!(wire["features"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_from_wire() {
        let wire = GeoJsonFeature::try_from(stored_record()).unwrap();
        let feature = Feature::from_wire(wire).unwrap();

        assert_eq!(feature.uuid.as_deref(), Some("test_point_1"));
        assert_eq!(
            feature.uri.as_deref(),
            Some("/geo/1/layers/test_layer_1/features/test_point_1")
        );
        assert_eq!(feature.layer_uuid.as_deref(), Some("test_layer_1"));
        assert_eq!(feature.date_created, Some(5));
        assert_eq!(feature.date_modified, Some(6));
        assert_eq!(feature.field("ts"), Some(&json!(4)));
        assert_eq!(feature.field("tag"), Some(&json!("test_tag_1")));
        assert!(feature.spatial.is_some());
        match feature.geometry.unwrap().value {
            GeoJsonValue::Point(coordinates) => {
                assert_eq!(coordinates, vec![1.0, 2.0, 3.0]);
            }
            other => panic!("expected a point, got {:?}", other),
        }
    }

    #[test]
    fn test_from_wire_null_geometry_and_spatial() {
        let mut record = stored_record();
        record["geometry"] = Value::Null;
        record["properties"]["spatial"] = Value::Null;

        let wire = GeoJsonFeature::try_from(record).unwrap();
        let feature = Feature::from_wire(wire).unwrap();
        assert!(feature.geometry.is_none());
        assert!(feature.spatial.is_none());
    }

    #[test]
    fn test_parse_page() {
        let page = json!({
            "next_page_uri": null,
            "total": 1,
            "geo": {
                "type": "FeatureCollection",
                "features": [stored_record()]
            }
        });
        let features = parse_page(page).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].uuid.as_deref(), Some("test_point_1"));
    }

    #[test]
    fn test_parse_page_without_geo_key() {
        let err = parse_page(json!({"total": 0})).unwrap_err();
        assert!(matches!(err, TesseraError::Response(_)));
    }

    #[test]
    fn test_layer_uuid_from_uri() {
        assert_eq!(
            layer_uuid_from_uri("/geo/1/layers/test_layer_1/features/test_point_1"),
            Some("test_layer_1".to_string())
        );
        assert_eq!(layer_uuid_from_uri("/geo/1/tasks"), None);
    }
}
