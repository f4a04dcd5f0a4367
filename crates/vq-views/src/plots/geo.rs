//! Geographic plot implementation
//!
//! A choropleth: values fetched per join key are matched onto the features
//! of a GeoJSON collection and colored with a quantized palette.

use async_trait::async_trait;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoValue};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use vq_core::options::lenient_string;
use vq_core::{QuerySpec, QueryState, ViewId};
use vq_data::dataset::value_text;
use vq_data::sources::{FeatureValue, GeoJsonProperty, MapDataRequest};
use vq_data::{DataError, MapPayload, MapStyleConfig};

use super::utils::{LegendEntry, QuantizeScale};
use crate::space_view::{merge_options, ViewConfig, ViewOutcome, VizView};
use crate::ViewerContext;

pub const MAP_INCOMPLETE: &str =
    "Please choose the map resource, the key fields and the value field!";
pub const MAP_FAILED: &str = "Map could not be created!";

/// Radius of point features without a value
const DEFAULT_POINT_RADIUS: f64 = 20.0;

/// Saved options of a map view
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Reference of the GeoJSON resource
    #[serde(deserialize_with = "lenient_string")]
    pub map_resource: String,

    /// Feature property holding the join key
    #[serde(deserialize_with = "lenient_string")]
    pub map_key_field: String,

    /// Data column holding the join key
    #[serde(deserialize_with = "lenient_string")]
    pub data_key_field: String,

    #[serde(deserialize_with = "lenient_string")]
    pub data_value_field: String,

    #[serde(deserialize_with = "lenient_string")]
    pub map_title: String,
}

impl MapOptions {
    pub fn is_complete(&self) -> bool {
        [
            &self.map_resource,
            &self.map_key_field,
            &self.data_key_field,
            &self.data_value_field,
        ]
        .iter()
        .all(|s| !s.trim().is_empty())
    }

    /// Request for the map data endpoint
    pub fn map_request(&self, state: &QueryState) -> MapDataRequest {
        let from_where_clause =
            QuerySpec::select_all(state.resource_id.clone(), state.where_fragment()).from_where();
        MapDataRequest {
            geojson_url: self.map_resource.clone(),
            map_key_field: self.map_key_field.clone(),
            data_key_field: self.data_key_field.clone(),
            data_value_field: self.data_value_field.clone(),
            from_where_clause,
        }
    }
}

/// Geographic extent of the rendered features
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    fn point(lon: f64, lat: f64) -> Self {
        Self {
            west: lon,
            south: lat,
            east: lon,
            north: lat,
        }
    }

    fn extend(&mut self, lon: f64, lat: f64) {
        self.west = self.west.min(lon);
        self.south = self.south.min(lat);
        self.east = self.east.max(lon);
        self.north = self.north.max(lat);
    }
}

/// Style of one feature, in collection order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStyle {
    /// Join key read from the feature's properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    pub fill_color: String,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
    pub dash_array: &'static str,
    pub fill_opacity: f64,

    /// Circle radius of point features
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// Finished map configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapConfig {
    pub geo_resource_ref: String,
    pub join_key_field: String,
    pub value_field: String,
    pub title: String,

    /// Values by join key as fetched
    pub feature_values: IndexMap<String, Option<f64>>,

    pub features: Vec<FeatureStyle>,
    pub legend: Vec<LegendEntry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
}

/// How feature values turn into colors
enum Coloring {
    /// No feature has a value
    Empty,

    /// Exactly one value: everything valued gets the top color
    Single(QuantizeScale),

    Scaled(QuantizeScale),
}

impl Coloring {
    fn new(values: &IndexMap<String, FeatureValue>, palette: &[String]) -> Self {
        let valued: Vec<f64> = values.values().filter_map(|v| v.value).collect();
        let scale = QuantizeScale::extent(valued.iter().copied())
            .and_then(|domain| QuantizeScale::new(domain, palette.to_vec()));

        match scale {
            None => Coloring::Empty,
            Some(scale) if values.len() == 1 => Coloring::Single(scale),
            Some(scale) => Coloring::Scaled(scale),
        }
    }

    fn color(&self, value: f64) -> Option<String> {
        match self {
            Coloring::Empty => None,
            Coloring::Single(scale) => scale.range().last().cloned(),
            Coloring::Scaled(scale) => Some(scale.color(value).to_string()),
        }
    }

    fn legend(&self, no_data_color: &str) -> Vec<LegendEntry> {
        match self {
            Coloring::Single(scale) | Coloring::Scaled(scale) => scale.legend(no_data_color),
            Coloring::Empty => vec![LegendEntry {
                color: no_data_color.to_string(),
                label: "No data".to_string(),
                from: None,
            }],
        }
    }
}

/// Build a map configuration from the fetched geometry and values
pub fn build_map_config(options: &MapOptions, payload: &MapPayload, style: &MapStyleConfig) -> MapConfig {
    let coloring = Coloring::new(&payload.values, &style.palette);
    let top_color = style
        .palette
        .last()
        .cloned()
        .unwrap_or_else(|| style.no_data_color.clone());

    let features = payload
        .collection
        .features
        .iter()
        .map(|feature| {
            let key = feature.property(&options.map_key_field).map(value_text);
            let value = key
                .as_ref()
                .and_then(|k| payload.values.get(k))
                .and_then(|v| v.value);

            let color = value
                .and_then(|v| coloring.color(v))
                .unwrap_or_else(|| {
                    if value.is_some() {
                        top_color.clone()
                    } else {
                        style.no_data_color.clone()
                    }
                });

            FeatureStyle {
                key,
                value,
                fill_color: color.clone(),
                color,
                weight: 1.0,
                opacity: 1.0,
                dash_array: "3",
                fill_opacity: 0.7,
                radius: is_point(feature).then(|| point_radius(value)),
            }
        })
        .collect::<Vec<_>>();

    let unmatched = features.iter().filter(|f| f.value.is_none()).count();
    if unmatched > 0 {
        debug!(
            "{} of {} features have no value for '{}'",
            unmatched,
            features.len(),
            options.map_key_field
        );
    }

    MapConfig {
        geo_resource_ref: options.map_resource.clone(),
        join_key_field: options.map_key_field.clone(),
        value_field: options.data_value_field.clone(),
        title: options.map_title.clone(),
        feature_values: payload
            .values
            .iter()
            .map(|(key, v)| (key.clone(), v.value))
            .collect(),
        features,
        legend: coloring.legend(&style.no_data_color),
        bounds: collection_bounds(&payload.collection),
    }
}

/// Area-proportional radius for valued points
fn point_radius(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v > 0.0 => (v / std::f64::consts::PI).sqrt(),
        _ => DEFAULT_POINT_RADIUS,
    }
}

fn is_point(feature: &Feature) -> bool {
    matches!(
        feature.geometry.as_ref().map(|g| &g.value),
        Some(GeoValue::Point(_)) | Some(GeoValue::MultiPoint(_))
    )
}

/// Bounding box of every position in the collection
pub fn collection_bounds(collection: &FeatureCollection) -> Option<Bounds> {
    let mut bounds: Option<Bounds> = None;
    for geometry in collection.features.iter().filter_map(|f| f.geometry.as_ref()) {
        visit_positions(geometry, &mut |position: &[f64]| {
            if let &[lon, lat, ..] = position {
                match bounds.as_mut() {
                    Some(b) => b.extend(lon, lat),
                    None => bounds = Some(Bounds::point(lon, lat)),
                }
            }
        });
    }
    bounds
}

fn visit_positions(geometry: &Geometry, visit: &mut dyn FnMut(&[f64])) {
    match &geometry.value {
        GeoValue::Point(p) => visit(&p[..]),
        GeoValue::MultiPoint(points) | GeoValue::LineString(points) => {
            points.iter().for_each(|p| visit(&p[..]))
        }
        GeoValue::MultiLineString(lines) | GeoValue::Polygon(lines) => lines
            .iter()
            .flatten()
            .for_each(|p| visit(&p[..])),
        GeoValue::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .for_each(|p| visit(&p[..])),
        GeoValue::GeometryCollection(geometries) => {
            for inner in geometries {
                visit_positions(inner, visit);
            }
        }
    }
}

/// A choropleth map on the dashboard
pub struct MapView {
    id: ViewId,
    options: RwLock<MapOptions>,
}

impl MapView {
    pub fn new(id: ViewId, options: MapOptions) -> Self {
        Self {
            id,
            options: RwLock::new(options),
        }
    }

    pub fn options(&self) -> MapOptions {
        self.options.read().clone()
    }

    /// Feature properties of the selected map resource, offered as join keys
    pub async fn join_key_options(&self, ctx: &ViewerContext) -> Result<Vec<GeoJsonProperty>, DataError> {
        let resource = self.options.read().map_resource.clone();
        if resource.is_empty() {
            return Ok(Vec::new());
        }
        ctx.fetcher.geojson_properties(&resource).await
    }
}

#[async_trait]
impl VizView for MapView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn view_type(&self) -> &'static str {
        "MapView"
    }

    fn title(&self) -> String {
        self.options.read().map_title.clone()
    }

    fn save_config(&self) -> Value {
        serde_json::to_value(&*self.options.read()).unwrap_or(Value::Null)
    }

    fn load_config(&self, config: Value) {
        let merged = merge_options(self.save_config(), config);
        match serde_json::from_value::<MapOptions>(merged) {
            Ok(options) => *self.options.write() = options,
            Err(e) => warn!("Ignoring map options for {}: {}", self.id, e),
        }
    }

    async fn refresh(&self, ctx: &ViewerContext, state: &QueryState) -> ViewOutcome {
        let options = self.options();
        if !options.is_complete() {
            return ViewOutcome::Placeholder(MAP_INCOMPLETE.to_string());
        }

        match ctx.fetcher.fetch_map(&options.map_request(state)).await {
            Ok(payload) => {
                ViewOutcome::Render(ViewConfig::Map(build_map_config(&options, &payload, &ctx.config.map)))
            }
            Err(e) => {
                error!("Map {} could not be refreshed: {}", self.id, e);
                ViewOutcome::KeepPrevious(MAP_FAILED.to_string())
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
