//! Typed query builders for listing and delete calls.
//!
//! The wire protocol filters with double-underscore parameter keys
//! (`name__exact`, `field_ts__gte`, `date_created__lte`), comma-joined
//! `order_by` lists with a `-` prefix for descending, and
//! `slice_start`/`slice_end` bounds. These builders produce that shape from
//! typed state; there is no reflective keyword translation, and a filter the
//! API does not document cannot be expressed.

use geojson::Geometry;
use serde_json::{json, Value};

use crate::error::Result;

/// Comparison operator for attribute and field filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Exact,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl FilterOp {
    fn as_str(self) -> &'static str {
        match self {
            FilterOp::Exact => "exact",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
        }
    }
}

/// One `order_by` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sort {
    Asc(String),
    Desc(String),
}

impl Sort {
    /// Ascending order on an attribute or `field_<name>` key.
    pub fn asc(attr: impl Into<String>) -> Self {
        Sort::Asc(attr.into())
    }

    /// Descending order on an attribute or `field_<name>` key.
    pub fn desc(attr: impl Into<String>) -> Self {
        Sort::Desc(attr.into())
    }

    fn to_param(&self) -> String {
        match self {
            Sort::Asc(attr) => attr.clone(),
            Sort::Desc(attr) => format!("-{}", attr),
        }
    }
}

/// Query over layers.
///
/// ```ignore
/// use tessera::{FilterOp, LayerQuery, Sort};
///
/// let query = LayerQuery::new()
///     .name(FilterOp::Exact, "waterways")
///     .order_by(Sort::desc("name"))
///     .slice(0, 20);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LayerQuery {
    filters: Vec<(String, FilterOp, Value)>,
    order_by: Vec<Sort>,
    slice: Option<(u64, u64)>,
}

impl LayerQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on the layer name.
    pub fn name(self, op: FilterOp, value: impl Into<String>) -> Self {
        self.attr("name", op, Value::String(value.into()))
    }

    /// Filter on any layer attribute.
    pub fn attr(mut self, attr: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push((attr.into(), op, value.into()));
        self
    }

    /// Append an `order_by` entry.
    pub fn order_by(mut self, sort: Sort) -> Self {
        self.order_by.push(sort);
        self
    }

    /// Restrict results to the half-open index range `[start, end)`.
    pub fn slice(mut self, start: u64, end: u64) -> Self {
        self.slice = Some((start, end));
        self
    }

    /// Render the query as wire parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        for (attr, op, value) in &self.filters {
            params.push((format!("{}__{}", attr, op.as_str()), param_value(value)));
        }
        append_common(&mut params, &self.order_by, self.slice);
        params
    }
}

/// Query over a layer's features.
///
/// Covers user field filters, attribute filters, a distance lookup around a
/// geometry, and a server-side spatial operation applied to the results.
#[derive(Debug, Clone, Default)]
pub struct FeatureQuery {
    field_filters: Vec<(String, FilterOp, Value)>,
    attr_filters: Vec<(String, FilterOp, Value)>,
    distance: Option<(Geometry, f64)>,
    spatial: Option<SpatialQuery>,
    order_by: Vec<Sort>,
    slice: Option<(u64, u64)>,
}

/// A server-side spatial operation applied to the matched features, e.g.
/// computing the intersection with a reference geometry.
#[derive(Debug, Clone)]
pub struct SpatialQuery {
    pub operation: String,
    pub geometry: Geometry,
    pub flag: bool,
}

impl FeatureQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on a user field (`field_<name>` on the wire).
    pub fn field(mut self, name: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.field_filters.push((name.into(), op, value.into()));
        self
    }

    /// Filter on a feature attribute such as `date_created`.
    pub fn attr(mut self, attr: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.attr_filters.push((attr.into(), op, value.into()));
        self
    }

    /// Only match features within `distance` of `center` (same units as the
    /// layer's spatial reference system).
    pub fn within_distance(mut self, center: Geometry, distance: f64) -> Self {
        self.distance = Some((center, distance));
        self
    }

    /// Ask the server to apply a spatial operation to the matched features.
    pub fn spatial(mut self, operation: impl Into<String>, geometry: Geometry, flag: bool) -> Self {
        self.spatial = Some(SpatialQuery {
            operation: operation.into(),
            geometry,
            flag,
        });
        self
    }

    /// Append an `order_by` entry.
    pub fn order_by(mut self, sort: Sort) -> Self {
        self.order_by.push(sort);
        self
    }

    /// Restrict results to the half-open index range `[start, end)`.
    pub fn slice(mut self, start: u64, end: u64) -> Self {
        self.slice = Some((start, end));
        self
    }

    /// Render the query as wire parameters.
    pub fn to_params(&self) -> Result<Vec<(String, String)>> {
        let mut params = Vec::new();
        for (name, op, value) in &self.field_filters {
            params.push((
                format!("field_{}__{}", name, op.as_str()),
                param_value(value),
            ));
        }
        for (attr, op, value) in &self.attr_filters {
            params.push((format!("{}__{}", attr, op.as_str()), param_value(value)));
        }
        if let Some((center, distance)) = &self.distance {
            let mut lookup = serde_json::to_value(center)?;
            if let Some(obj) = lookup.as_object_mut() {
                obj.insert("properties".to_string(), json!({ "distance": distance }));
            }
            params.push(("geometry__distance_lte".to_string(), lookup.to_string()));
        }
        if let Some(spatial) = &self.spatial {
            params.push((
                "spatial_operation".to_string(),
                spatial.operation.clone(),
            ));
            params.push((
                "spatial_geometry".to_string(),
                serde_json::to_value(&spatial.geometry)?.to_string(),
            ));
            params.push(("spatial_flag".to_string(), spatial.flag.to_string()));
        }
        append_common(&mut params, &self.order_by, self.slice);
        Ok(params)
    }
}

fn append_common(params: &mut Vec<(String, String)>, order_by: &[Sort], slice: Option<(u64, u64)>) {
    if !order_by.is_empty() {
        let joined = order_by
            .iter()
            .map(Sort::to_param)
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order_by".to_string(), joined));
    }
    if let Some((start, end)) = slice {
        params.push(("slice_start".to_string(), start.to_string()));
        params.push(("slice_end".to_string(), end.to_string()));
    }
}

/// Query parameter rendering: strings go bare, everything else as JSON.
fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(coordinates: Vec<f64>) -> Geometry {
        Geometry::new(geojson::Value::Point(coordinates))
    }

    fn find<'a>(params: &'a [(String, String)], key: &str) -> &'a str {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_else(|| panic!("missing param {}", key))
    }

    #[test]
    fn test_layer_query_params() {
        let params = LayerQuery::new()
            .name(FilterOp::Exact, "test_name")
            .order_by(Sort::desc("name"))
            .order_by(Sort::asc("date_created"))
            .slice(1, 20)
            .to_params();

        assert_eq!(find(&params, "name__exact"), "test_name");
        assert_eq!(find(&params, "order_by"), "-name,date_created");
        assert_eq!(find(&params, "slice_start"), "1");
        assert_eq!(find(&params, "slice_end"), "20");
    }

    #[test]
    fn test_empty_queries_have_no_params() {
        assert!(LayerQuery::new().to_params().is_empty());
        assert!(FeatureQuery::new().to_params().unwrap().is_empty());
    }

    #[test]
    fn test_feature_query_field_and_attr_filters() {
        let params = FeatureQuery::new()
            .field("ts", FilterOp::Gte, 1)
            .field("ts", FilterOp::Lte, 10)
            .attr("date_created", FilterOp::Lte, "2002-12-25 00:00:00-00:00")
            .to_params()
            .unwrap();

        assert_eq!(find(&params, "field_ts__gte"), "1");
        assert_eq!(find(&params, "field_ts__lte"), "10");
        assert_eq!(
            find(&params, "date_created__lte"),
            "2002-12-25 00:00:00-00:00"
        );
    }

    #[test]
    fn test_feature_query_distance_lookup() {
        let params = FeatureQuery::new()
            .within_distance(point(vec![1.0, 2.0, 3.0]), 4.0)
            .to_params()
            .unwrap();

        let lookup: Value = serde_json::from_str(find(&params, "geometry__distance_lte")).unwrap();
        assert_eq!(lookup["type"], "Point");
        assert_eq!(lookup["coordinates"], json!([1.0, 2.0, 3.0]));
        assert_eq!(lookup["properties"]["distance"], json!(4.0));
    }

    #[test]
    fn test_feature_query_spatial_operation() {
        let params = FeatureQuery::new()
            .spatial("intersection", point(vec![4.0, 5.0, 6.0]), true)
            .to_params()
            .unwrap();

        assert_eq!(find(&params, "spatial_operation"), "intersection");
        assert_eq!(find(&params, "spatial_flag"), "true");
        let geometry: Value = serde_json::from_str(find(&params, "spatial_geometry")).unwrap();
        assert_eq!(geometry["type"], "Point");
    }

    #[test]
    fn test_sort_rendering() {
        assert_eq!(Sort::asc("name").to_param(), "name");
        assert_eq!(Sort::desc("field_ts").to_param(), "-field_ts");
    }
}
