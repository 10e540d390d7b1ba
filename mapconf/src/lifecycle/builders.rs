//! Translation of descriptors into engine sources and layers.

use mapconf_types::{GeometryKind, GroupKind, LayerGroupDescriptor, StyleBag};
use serde_json::{json, Value};

use crate::engine::{LayerSpec, SourceSpec, TileScheme};
use crate::style::{classify, has_properties_of, ClassifiedStyle, KindDefaults, VISIBILITY};

const DEFAULT_TILE_SIZE: u32 = 256;
const TEXT_FIELD: &str = "text-field";

/// Feature collection without features. CSV sources start with it until the CSV document is
/// loaded.
pub fn empty_collection() -> Value {
    json!({ "type": "FeatureCollection", "features": [] })
}

fn is_tile_template(url: &str) -> bool {
    url.contains("{z}")
}

/// Engine source for a descriptor. Returns `None` for the kinds that do not create sources.
pub fn source_spec(descriptor: &LayerGroupDescriptor) -> Option<SourceSpec> {
    let id_field = descriptor.id_field();
    let spec = match &descriptor.kind {
        GroupKind::Vector(source) => {
            let promote_id = id_field.map(|field| match &source.source_layer {
                Some(layer) => {
                    let mut per_layer = serde_json::Map::new();
                    per_layer.insert(layer.clone(), json!(field));
                    Value::Object(per_layer)
                }
                None => json!(field),
            });

            if is_tile_template(&source.url) {
                SourceSpec::Vector {
                    url: None,
                    tiles: Some(vec![source.url.clone()]),
                    promote_id,
                }
            } else {
                SourceSpec::Vector {
                    url: Some(source.url.clone()),
                    tiles: None,
                    promote_id,
                }
            }
        }
        GroupKind::Raster(source) | GroupKind::Tms(source) => SourceSpec::Raster {
            tiles: vec![source.url.clone()],
            tile_size: source.tile_size.unwrap_or(DEFAULT_TILE_SIZE),
            scheme: match descriptor.kind {
                GroupKind::Tms(_) => TileScheme::Tms,
                _ => TileScheme::Xyz,
            },
        },
        GroupKind::Geojson(source) => SourceSpec::Geojson {
            data: match (&source.data, &source.url) {
                (Some(data), _) => data.clone(),
                (None, Some(url)) => Value::String(url.clone()),
                (None, None) => empty_collection(),
            },
            promote_id: id_field.map(str::to_string),
            generate_id: id_field.is_none(),
        },
        GroupKind::Csv(_) => SourceSpec::Geojson {
            data: empty_collection(),
            promote_id: id_field.map(str::to_string),
            generate_id: id_field.is_none(),
        },
        GroupKind::Image(source) => SourceSpec::Image {
            url: source.url.clone(),
            coordinates: source.bbox.corners(),
        },
        GroupKind::Choice(_) | GroupKind::StylePassthrough(_) | GroupKind::Terrain(_) => {
            return None
        }
    };

    Some(spec)
}

/// An engine layer to be created for a group, with its effective style.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLayer {
    /// Layer kind.
    pub kind: GeometryKind,
    /// Effective style split into paint and layout.
    pub style: ClassifiedStyle,
}

/// Layer families drawn for a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Families {
    /// Polygon fill.
    pub fill: bool,
    /// Outline.
    pub line: bool,
    /// Labels.
    pub text: bool,
    /// Point circles.
    pub circle: bool,
    /// Raster image.
    pub raster: bool,
}

impl Families {
    /// Decides which layers the group needs from its style and the defaults of its kind.
    pub fn detect(descriptor: &LayerGroupDescriptor, defaults: &KindDefaults) -> Self {
        let style = &descriptor.style;
        match &descriptor.kind {
            GroupKind::Raster(_) | GroupKind::Tms(_) | GroupKind::Image(_) => Self {
                raster: true,
                ..Default::default()
            },
            GroupKind::Vector(_) | GroupKind::Geojson(_) | GroupKind::Csv(_) => {
                let is_csv = matches!(descriptor.kind, GroupKind::Csv(_));
                let fill = has_properties_of(style, GeometryKind::Fill);
                let mut families = Self {
                    fill,
                    line: has_properties_of(style, GeometryKind::Line)
                        || (fill && !defaults.line.is_empty()),
                    text: style.contains_key(TEXT_FIELD),
                    circle: has_properties_of(style, GeometryKind::Circle) || is_csv,
                    raster: false,
                };

                let has_any = families.fill || families.line || families.circle || families.text;
                if !is_csv && !has_any {
                    families.fill = true;
                    families.line = !defaults.line.is_empty();
                }

                families
            }
            GroupKind::Choice(_) | GroupKind::StylePassthrough(_) | GroupKind::Terrain(_) => {
                Self::default()
            }
        }
    }

    /// Layer kinds in the order they are created, bottom first.
    pub fn kinds(&self) -> Vec<GeometryKind> {
        [
            (self.raster, GeometryKind::Raster),
            (self.fill, GeometryKind::Fill),
            (self.line, GeometryKind::Line),
            (self.circle, GeometryKind::Circle),
            (self.text, GeometryKind::Symbol),
        ]
        .into_iter()
        .filter_map(|(present, kind)| present.then_some(kind))
        .collect()
    }
}

/// Engine layers to create for a group, bottom first.
pub fn plan_layers(descriptor: &LayerGroupDescriptor, defaults: &KindDefaults) -> Vec<PlannedLayer> {
    Families::detect(descriptor, defaults)
        .kinds()
        .into_iter()
        .map(|kind| {
            let mut style = classify(&defaults.style_for(kind, &descriptor.style), kind);
            style.layout.remove(VISIBILITY);

            PlannedLayer { kind, style }
        })
        .collect()
}

/// Specification of a new layer. Only the visibility is set, paint and layout properties are set
/// one by one after the layer is added.
pub fn layer_spec(
    descriptor: &LayerGroupDescriptor,
    id: String,
    kind: GeometryKind,
    source: String,
) -> LayerSpec {
    let mut layout = StyleBag::new();
    layout.insert(VISIBILITY.into(), json!("visible"));

    let filter = match kind {
        GeometryKind::Raster => None,
        _ => descriptor.filter.clone(),
    };

    LayerSpec {
        id,
        kind,
        source,
        source_layer: descriptor.source_layer().map(str::to_string),
        paint: StyleBag::new(),
        layout,
        filter,
        minzoom: descriptor.minzoom,
        maxzoom: descriptor.maxzoom,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::style::StyleDefaults;

    fn descriptor(json: &str) -> LayerGroupDescriptor {
        serde_json::from_str(json).expect("invalid descriptor")
    }

    #[test]
    fn vector_template_and_promote_id() {
        let spec = source_spec(&descriptor(
            r#"{ "id": "roads", "type": "vector", "url": "https://t/{z}/{x}/{y}.pbf",
                 "sourceLayer": "roads", "inspect": { "id": "osm_id" } }"#,
        ));

        assert_matches!(
            spec,
            Some(SourceSpec::Vector { url: None, tiles: Some(tiles), promote_id: Some(promote) })
                if tiles.len() == 1 && promote == json!({ "roads": "osm_id" })
        );
    }

    #[test]
    fn tms_scheme() {
        let spec = source_spec(&descriptor(
            r#"{ "id": "old", "type": "tms", "url": "https://t/{z}/{x}/{y}.png", "tileSize": 512 }"#,
        ));

        assert_matches!(
            spec,
            Some(SourceSpec::Raster { tile_size: 512, scheme: TileScheme::Tms, .. })
        );
    }

    #[test]
    fn geojson_without_id_field_generates_ids() {
        let spec = source_spec(&descriptor(
            r#"{ "id": "parks", "type": "geojson", "url": "parks.geojson" }"#,
        ));

        assert_matches!(
            spec,
            Some(SourceSpec::Geojson { data: Value::String(url), generate_id: true, .. })
                if url == "parks.geojson"
        );
    }

    #[test]
    fn passthrough_has_no_source() {
        let spec = source_spec(&descriptor(
            r#"{ "id": "roads", "type": "style", "layers": [{ "id": "road-major" }] }"#,
        ));
        assert_eq!(spec, None);
    }

    #[test]
    fn fill_style_gets_default_outline() {
        let defaults = StyleDefaults::fallback();
        let descriptor = descriptor(
            r##"{ "id": "parks", "type": "geojson", "url": "parks.geojson",
                  "style": { "fill-color": "#2ca02c", "fill-opacity": 0.5 } }"##,
        );

        let layers = plan_layers(&descriptor, &defaults.geojson);
        let kinds: Vec<_> = layers.iter().map(|layer| layer.kind).collect();
        assert_eq!(kinds, vec![GeometryKind::Fill, GeometryKind::Line]);
        assert_eq!(layers[0].style.paint["fill-opacity"], json!(0.5));
        assert!(layers[1].style.paint.contains_key("line-width"));
    }

    #[test]
    fn text_field_adds_label_layer() {
        let defaults = StyleDefaults::fallback();
        let descriptor = descriptor(
            r#"{ "id": "wards", "type": "vector", "url": "wards.json", "sourceLayer": "wards",
                 "style": { "line-color": "red", "text-field": ["get", "name"] } }"#,
        );

        let layers = plan_layers(&descriptor, &defaults.vector);
        let kinds: Vec<_> = layers.iter().map(|layer| layer.kind).collect();
        assert_eq!(kinds, vec![GeometryKind::Line, GeometryKind::Symbol]);
        assert_eq!(layers[1].style.layout["text-field"], json!(["get", "name"]));
        assert!(!layers[0].style.paint.contains_key("text-field"));
    }

    #[test]
    fn unprefixed_properties_are_classified_per_layer() {
        let defaults = StyleDefaults::fallback();
        let descriptor = descriptor(
            r##"{ "id": "parks", "type": "geojson", "url": "parks.geojson",
                  "style": { "fill-color": "#2ca02c", "visibility": "none",
                             "emissive-strength": 1, "custom-sort-key": 2 } }"##,
        );

        let layers = plan_layers(&descriptor, &defaults.geojson);
        assert_eq!(layers.len(), 2);
        for layer in &layers {
            assert_eq!(layer.style.paint.get("emissive-strength"), Some(&json!(1)));
            assert_eq!(layer.style.layout.get("custom-sort-key"), Some(&json!(2)));
            assert!(!layer.style.layout.contains_key(VISIBILITY));
        }
    }

    #[test]
    fn csv_always_has_circles() {
        let defaults = StyleDefaults::fallback();
        let descriptor = descriptor(r#"{ "id": "stations", "type": "csv", "url": "s.csv" }"#);

        let kinds: Vec<_> = plan_layers(&descriptor, &defaults.csv)
            .into_iter()
            .map(|layer| layer.kind)
            .collect();
        assert_eq!(kinds, vec![GeometryKind::Circle]);
    }

    #[test]
    fn unstyled_vector_falls_back_to_polygons() {
        let families = Families::detect(
            &descriptor(r#"{ "id": "v", "type": "vector", "url": "v.json" }"#),
            &StyleDefaults::fallback().vector,
        );

        assert!(families.fill && families.line);
        assert!(!families.text && !families.circle);
    }

    #[test]
    fn raster_layer_has_no_filter() {
        let descriptor = descriptor(
            r#"{ "id": "sat", "type": "raster", "url": "https://s/{z}/{x}/{y}.png",
                 "filter": ["==", "a", 1], "minzoom": 3 }"#,
        );

        let spec = layer_spec(&descriptor, "sat-raster".into(), GeometryKind::Raster, "sat-source".into());
        assert_eq!(spec.filter, None);
        assert_eq!(spec.minzoom, Some(3.0));
        assert_eq!(spec.layout[VISIBILITY], json!("visible"));
    }
}
