//! Capability surface of the map rendering engine.
//!
//! The configuration engine never draws anything itself. It creates, updates and removes sources
//! and layers of a [`MapEngine`], and reads back the features the engine rendered. An adapter
//! for a concrete renderer implements the trait; [`InMemoryEngine`] implements it without any
//! rendering and is used to validate configurations headless.

use std::fmt::{Display, Formatter};

use mapconf_types::{GeometryKind, StyleBag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

mod memory;

pub use memory::{style_layer, EngineCall, InMemoryEngine, StoredLayer};

/// Error returned by engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Source with the given id does not exist.
    #[error("source {0:?} does not exist")]
    UnknownSource(String),
    /// Layer with the given id does not exist.
    #[error("layer {0:?} does not exist")]
    UnknownLayer(String),
    /// Source with the given id already exists.
    #[error("source {0:?} already exists")]
    DuplicateSource(String),
    /// Layer with the given id already exists.
    #[error("layer {0:?} already exists")]
    DuplicateLayer(String),
    /// The source cannot be removed while a layer uses it.
    #[error("source {source_id:?} is used by layer {layer_id:?}")]
    SourceInUse {
        /// Source being removed.
        source_id: String,
        /// A layer still referencing it.
        layer_id: String,
    },
    /// The property is not valid for the layer.
    #[error("property {property:?} is not valid for layer {layer_id:?}")]
    InvalidProperty {
        /// Layer id.
        layer_id: String,
        /// Property name.
        property: String,
    },
    /// Any other rejection reported by the engine.
    #[error("{0}")]
    Rejected(String),
}

/// Position on the screen in pixels from the top-left corner of the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

impl ScreenPoint {
    /// Creates a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Tile addressing scheme of raster sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileScheme {
    /// Y axis points south.
    #[default]
    Xyz,
    /// Y axis points north.
    Tms,
}

/// Parameters of a source to be created in the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SourceSpec {
    /// Vector tile source.
    Vector {
        /// TileJSON url.
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Tile url templates.
        #[serde(skip_serializing_if = "Option::is_none")]
        tiles: Option<Vec<String>>,
        /// Feature property used as the feature id, per source layer.
        #[serde(skip_serializing_if = "Option::is_none")]
        promote_id: Option<Value>,
    },
    /// Raster tile source.
    Raster {
        /// Tile url templates.
        tiles: Vec<String>,
        /// Size of a tile in pixels.
        tile_size: u32,
        /// Tile addressing scheme.
        scheme: TileScheme,
    },
    /// GeoJSON source.
    Geojson {
        /// Url of the document or the document itself.
        data: Value,
        /// Feature property used as the feature id.
        #[serde(skip_serializing_if = "Option::is_none")]
        promote_id: Option<String>,
        /// Whether the engine should assign ids to features itself.
        generate_id: bool,
    },
    /// Single georeferenced image.
    Image {
        /// Image url.
        url: String,
        /// Image corners: top-left, top-right, bottom-right, bottom-left.
        coordinates: [[f64; 2]; 4],
    },
}

/// Parameters of a layer to be created in the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayerSpec {
    /// Layer id.
    pub id: String,
    /// Layer type.
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    /// Source id.
    pub source: String,
    /// Layer of a vector tile source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_layer: Option<String>,
    /// Paint properties.
    pub paint: StyleBag,
    /// Layout properties.
    pub layout: StyleBag,
    /// Filter expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Minimum zoom.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    /// Maximum zoom.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
}

/// Description of a layer that exists in the engine style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleLayerInfo {
    /// Layer id.
    pub id: String,
    /// Layer type.
    pub kind: GeometryKind,
    /// Source id.
    pub source: Option<String>,
    /// Layer of a vector tile source.
    pub source_layer: Option<String>,
}

/// Id of a feature as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    /// Numeric id.
    Number(u64),
    /// String id.
    String(String),
}

impl FeatureId {
    /// Converts a property value into a feature id. Only strings and non-negative integers can
    /// be ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_u64().map(FeatureId::Number),
            Value::String(string) if !string.is_empty() => Some(FeatureId::String(string.clone())),
            _ => None,
        }
    }
}

impl Display for FeatureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Number(v) => write!(f, "{v}"),
            FeatureId::String(v) => write!(f, "{v}"),
        }
    }
}

/// A feature rendered by an engine layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedFeature {
    /// Engine layer that rendered the feature.
    pub layer_id: String,
    /// Type of that layer.
    pub kind: GeometryKind,
    /// Source of the feature.
    pub source: String,
    /// Layer of a vector tile source.
    #[serde(default)]
    pub source_layer: Option<String>,
    /// Feature id, if the source provides one.
    #[serde(default)]
    pub id: Option<FeatureId>,
    /// Feature properties.
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    /// GeoJSON geometry of the feature.
    #[serde(default)]
    pub geometry: Option<Value>,
}

/// Address of a feature for feature state operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureStateTarget {
    /// Source id.
    pub source: String,
    /// Layer of a vector tile source.
    pub source_layer: Option<String>,
    /// Feature id.
    pub id: FeatureId,
}

/// Terrain elevation settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerrainSpec {
    /// Raster DEM source id.
    pub source: String,
    /// Elevation exaggeration.
    pub exaggeration: f64,
}

/// Operations of a map engine used by the configuration engine.
///
/// Every mutating operation returns an error instead of panicking when the engine rejects it.
/// Callers decide whether the failure is fatal for the operation they perform.
pub trait MapEngine {
    /// Adds a source.
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError>;
    /// Removes a source. Fails if a layer still uses it.
    fn remove_source(&mut self, id: &str) -> Result<(), EngineError>;
    /// Returns true if the source exists.
    fn has_source(&self, id: &str) -> bool;
    /// Replaces the data of a GeoJSON source.
    fn set_source_data(&mut self, id: &str, data: Value) -> Result<(), EngineError>;
    /// Points an image source to a new url.
    fn set_image_url(&mut self, id: &str, url: &str) -> Result<(), EngineError>;

    /// Adds a layer below the layer `before`, or on top of all layers if `before` is `None`.
    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), EngineError>;
    /// Removes a layer.
    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError>;
    /// Returns true if the layer exists.
    fn has_layer(&self, id: &str) -> bool;
    /// Sets a paint property of a layer.
    fn set_paint_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Value,
    ) -> Result<(), EngineError>;
    /// Sets a layout property of a layer.
    fn set_layout_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Value,
    ) -> Result<(), EngineError>;
    /// Sets or clears the filter of a layer.
    fn set_filter(&mut self, layer_id: &str, filter: Option<Value>) -> Result<(), EngineError>;

    /// Merges the given state into the state of a feature.
    fn set_feature_state(
        &mut self,
        target: &FeatureStateTarget,
        state: serde_json::Map<String, Value>,
    ) -> Result<(), EngineError>;
    /// Removes one key of a feature state, or the whole state if `key` is `None`.
    fn remove_feature_state(
        &mut self,
        target: &FeatureStateTarget,
        key: Option<&str>,
    ) -> Result<(), EngineError>;

    /// Returns the features rendered by the given layers at the screen point, topmost first.
    fn query_rendered_features(&self, point: ScreenPoint, layers: &[String])
        -> Vec<RenderedFeature>;
    /// Returns the features of a source, whether they are rendered or not.
    fn query_source_features(
        &self,
        source: &str,
        source_layer: Option<&str>,
    ) -> Vec<RenderedFeature>;

    /// Starts delivering pointer events of the layer to the application.
    fn subscribe_pointer_events(&mut self, layer_id: &str);
    /// Stops delivering pointer events of the layer.
    fn unsubscribe_pointer_events(&mut self, layer_id: &str);

    /// All layers of the current style, bottom first.
    fn style_layers(&self) -> Vec<StyleLayerInfo>;

    /// Enables terrain elevation, or disables it with `None`.
    fn set_terrain(&mut self, terrain: Option<TerrainSpec>) -> Result<(), EngineError>;
    /// Sets the fog, or removes it with `None`.
    fn set_fog(&mut self, fog: Option<Value>) -> Result<(), EngineError>;
}
