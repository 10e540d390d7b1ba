//! See [`LayerGroupDescriptor`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::geo::GeoBounds;

/// Flat bag of style properties as written in configuration documents. Paint and layout
/// properties are mixed, values may be engine expressions.
pub type StyleBag = Map<String, Value>;

/// One configured overlay.
///
/// ```
/// use mapconf_types::{GroupKind, LayerGroupDescriptor};
///
/// let descriptor: LayerGroupDescriptor = serde_json::from_str(r##"{
///     "id": "parks",
///     "type": "geojson",
///     "url": "parks.geojson",
///     "initiallyChecked": true,
///     "style": { "fill-color": "#2ca02c", "fill-opacity": 0.5 }
/// }"##).unwrap();
///
/// assert!(matches!(descriptor.kind, GroupKind::Geojson(_)));
/// assert!(descriptor.initially_checked);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerGroupDescriptor {
    /// Unique id of the group in the configuration.
    pub id: String,
    /// Human readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Type of the group with the type-specific source parameters.
    #[serde(flatten)]
    pub kind: GroupKind,
    /// Style properties applied to the layers of the group.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub style: StyleBag,
    /// Engine filter expression applied to every layer of the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    /// Popup metadata. If set, the layers of the group are interactive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspect: Option<Inspect>,
    /// Whether the group is visible when the map loads.
    #[serde(default)]
    pub initially_checked: bool,
    /// Minimum zoom level the layers are displayed at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    /// Maximum zoom level the layers are displayed at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
}

/// Type of a layer group together with the parameters specific to that type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GroupKind {
    /// Vector tiles.
    #[serde(rename = "vector")]
    Vector(VectorSource),
    /// Raster tiles addressed with the TMS scheme (y axis pointing north).
    #[serde(rename = "tms")]
    Tms(TileSource),
    /// Raster tiles addressed with the XYZ scheme.
    #[serde(rename = "raster")]
    Raster(TileSource),
    /// GeoJSON document.
    #[serde(rename = "geojson")]
    Geojson(GeoJsonSource),
    /// CSV document with a point per row.
    #[serde(rename = "csv")]
    Csv(CsvSource),
    /// Single georeferenced image.
    #[serde(rename = "img")]
    Image(ImageSource),
    /// Set of mutually exclusive child groups.
    #[serde(rename = "layer-group")]
    Choice(ChoiceGroup),
    /// Layers that already exist in the base map style.
    #[serde(rename = "style")]
    StylePassthrough(StyleReferences),
    /// Global terrain elevation.
    #[serde(rename = "terrain")]
    Terrain(TerrainSettings),
}

impl GroupKind {
    /// Name of the type as written in the `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            GroupKind::Vector(_) => "vector",
            GroupKind::Tms(_) => "tms",
            GroupKind::Raster(_) => "raster",
            GroupKind::Geojson(_) => "geojson",
            GroupKind::Csv(_) => "csv",
            GroupKind::Image(_) => "img",
            GroupKind::Choice(_) => "layer-group",
            GroupKind::StylePassthrough(_) => "style",
            GroupKind::Terrain(_) => "terrain",
        }
    }

    /// Returns false for the kinds that never create engine sources or layers.
    pub fn creates_engine_objects(&self) -> bool {
        !matches!(
            self,
            GroupKind::Choice(_) | GroupKind::StylePassthrough(_) | GroupKind::Terrain(_)
        )
    }

    /// Refresh interval in seconds, for the kinds that support periodic refresh.
    pub fn refresh_interval(&self) -> Option<f64> {
        match self {
            GroupKind::Csv(source) => source.refresh,
            GroupKind::Image(source) => source.refresh,
            _ => None,
        }
        .filter(|seconds| *seconds > 0.0)
    }
}

/// Vector tile source parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorSource {
    /// Either a TileJSON url or a tile url template containing `{z}`, `{x}` and `{y}`.
    pub url: String,
    /// Name of the layer inside the vector tiles.
    #[serde(default)]
    pub source_layer: Option<String>,
}

/// Raster tile source parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSource {
    /// Tile url template.
    pub url: String,
    /// Size of the tiles in pixels.
    #[serde(default)]
    pub tile_size: Option<u32>,
}

/// GeoJSON source parameters. Either `url` or `data` must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoJsonSource {
    /// Url of the document.
    #[serde(default)]
    pub url: Option<String>,
    /// Inline document.
    #[serde(default)]
    pub data: Option<Value>,
}

/// CSV source parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvSource {
    /// Url of the CSV document.
    pub url: String,
    /// Refresh interval in seconds.
    #[serde(default)]
    pub refresh: Option<f64>,
}

/// Image overlay parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    /// Url of the image.
    pub url: String,
    /// Geographic extent of the image.
    pub bbox: GeoBounds,
    /// Refresh interval in seconds.
    #[serde(default)]
    pub refresh: Option<f64>,
}

/// Radio-style set of child groups. Exactly one child is shown while the group is visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceGroup {
    /// Child groups. None of them can be a `layer-group` itself.
    pub groups: Vec<LayerGroupDescriptor>,
}

impl ChoiceGroup {
    /// The child shown when the group becomes visible: the first child marked as initially
    /// checked, or the first child.
    pub fn default_child(&self) -> Option<&LayerGroupDescriptor> {
        self.groups
            .iter()
            .find(|child| child.initially_checked)
            .or_else(|| self.groups.first())
    }
}

/// References to the layers of the base map style controlled by a `style` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleReferences {
    /// Referenced layers.
    #[serde(default)]
    pub layers: Vec<StyleLayerRef>,
}

/// Reference to base style layers, either by the layer id or by the source layer they draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleLayerRef {
    /// Id of the base style layer.
    #[serde(default)]
    pub id: Option<String>,
    /// Source layer; every base style layer drawing it is matched.
    #[serde(default)]
    pub source_layer: Option<String>,
    /// Title shown in the legend.
    #[serde(default)]
    pub title: Option<String>,
}

/// Terrain settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainSettings {
    /// Id of the raster DEM source in the base style.
    #[serde(default = "TerrainSettings::default_source")]
    pub source: String,
    /// Elevation exaggeration factor.
    #[serde(default = "TerrainSettings::default_exaggeration")]
    pub exaggeration: f64,
    /// Fog specification applied together with the terrain.
    #[serde(default)]
    pub fog: Option<Value>,
}

impl TerrainSettings {
    fn default_source() -> String {
        "terrain".into()
    }

    fn default_exaggeration() -> f64 {
        1.5
    }
}

/// Metadata used by popups. The engine only needs the feature id field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspect {
    /// Feature property that uniquely identifies a feature.
    #[serde(default)]
    pub id: Option<String>,
    /// Property used as the popup title.
    #[serde(default)]
    pub title: Option<String>,
    /// Property used as the popup label.
    #[serde(default)]
    pub label: Option<String>,
    /// Properties listed in the popup.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Titles of the listed properties.
    #[serde(default)]
    pub field_titles: Vec<String>,
}

impl LayerGroupDescriptor {
    /// Checks that the fields required by the group type are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(self.missing("id"));
        }

        match &self.kind {
            GroupKind::Vector(VectorSource { url, .. })
            | GroupKind::Tms(TileSource { url, .. })
            | GroupKind::Raster(TileSource { url, .. })
            | GroupKind::Csv(CsvSource { url, .. })
            | GroupKind::Image(ImageSource { url, .. })
                if url.trim().is_empty() =>
            {
                Err(self.missing("url"))
            }
            GroupKind::Geojson(source) if source.url.is_none() && source.data.is_none() => {
                Err(self.missing("url"))
            }
            GroupKind::Image(source) if !source.bbox.is_valid() => Err(self.missing("bbox")),
            GroupKind::Choice(choice) => {
                if choice.groups.is_empty() {
                    return Err(self.missing("groups"));
                }

                for child in &choice.groups {
                    if matches!(child.kind, GroupKind::Choice(_)) {
                        return Err(ConfigError::NestedChoice {
                            parent: self.id.clone(),
                            child: child.id.clone(),
                        });
                    }

                    child.validate()?;
                }

                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Returns true if the layers of the group react to pointer events.
    pub fn is_interactive(&self) -> bool {
        self.inspect.is_some()
    }

    /// Feature property configured as the feature id.
    pub fn id_field(&self) -> Option<&str> {
        self.inspect.as_ref().and_then(|inspect| inspect.id.as_deref())
    }

    /// Source layer of vector tile groups.
    pub fn source_layer(&self) -> Option<&str> {
        match &self.kind {
            GroupKind::Vector(source) => source.source_layer.as_deref(),
            _ => None,
        }
    }

    fn missing(&self, field: &'static str) -> ConfigError {
        ConfigError::MissingField {
            id: self.id.clone(),
            field,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use insta::assert_compact_debug_snapshot;

    use super::*;

    fn parse(json: &str) -> LayerGroupDescriptor {
        serde_json::from_str(json).expect("invalid test descriptor")
    }

    #[test]
    fn vector_descriptor() {
        let descriptor = parse(
            r#"{
                "id": "roads",
                "type": "vector",
                "url": "https://tiles.example.com/roads/{z}/{x}/{y}.pbf",
                "sourceLayer": "roads",
                "style": { "line-color": "red", "line-width": 2 },
                "inspect": { "id": "osm_id", "title": "Road", "label": "name" },
                "minzoom": 10
            }"#,
        );

        assert_matches!(&descriptor.kind, GroupKind::Vector(source) if source.source_layer.as_deref() == Some("roads"));
        assert_eq!(descriptor.id_field(), Some("osm_id"));
        assert_eq!(descriptor.minzoom, Some(10.0));
        assert!(!descriptor.initially_checked);
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn choice_group_children() {
        let descriptor = parse(
            r#"{
                "id": "basemaps",
                "type": "layer-group",
                "groups": [
                    { "id": "satellite", "type": "raster", "url": "https://a/{z}/{x}/{y}.png" },
                    { "id": "streets", "type": "style", "initiallyChecked": true,
                      "layers": [{ "sourceLayer": "roads" }] }
                ]
            }"#,
        );

        let GroupKind::Choice(choice) = &descriptor.kind else {
            panic!("not a choice group");
        };
        assert_eq!(
            choice.default_child().map(|child| child.id.as_str()),
            Some("streets")
        );
        assert!(!descriptor.kind.creates_engine_objects());
    }

    #[test]
    fn nested_choice_is_rejected() {
        let descriptor = parse(
            r#"{
                "id": "outer",
                "type": "layer-group",
                "groups": [
                    { "id": "inner", "type": "layer-group", "groups": [] }
                ]
            }"#,
        );

        assert_compact_debug_snapshot!(descriptor.validate(), @r#"Err(NestedChoice { parent: "outer", child: "inner" })"#);
    }

    #[test]
    fn geojson_requires_url_or_data() {
        let descriptor = parse(r#"{ "id": "empty", "type": "geojson" }"#);
        assert_compact_debug_snapshot!(descriptor.validate(), @r#"Err(MissingField { id: "empty", field: "url" })"#);
    }

    #[test]
    fn image_with_refresh() {
        let descriptor = parse(
            r#"{
                "id": "radar",
                "type": "img",
                "url": "https://example.com/radar.png",
                "bbox": [73.0, 14.0, 75.0, 16.0],
                "refresh": 60
            }"#,
        );

        assert_eq!(descriptor.kind.refresh_interval(), Some(60.0));
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn zero_refresh_is_disabled() {
        let descriptor = parse(r#"{ "id": "pts", "type": "csv", "url": "a.csv", "refresh": 0 }"#);
        assert_eq!(descriptor.kind.refresh_interval(), None);
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let result = serde_json::from_str::<LayerGroupDescriptor>(r#"{ "id": "x", "type": "kml" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn terrain_defaults() {
        let descriptor = parse(r#"{ "id": "terrain", "type": "terrain" }"#);
        assert_matches!(descriptor.kind, GroupKind::Terrain(TerrainSettings { exaggeration, .. }) if exaggeration == 1.5);
    }
}
