//! Default styles of layer groups.
//!
//! The defaults come from three tiers, each overriding the previous one property by property:
//! 1. the fallback styles compiled into the crate ([`StyleDefaults::fallback`]),
//! 2. the defaults document loaded with the configuration,
//! 3. the `styles` section of the configuration document.
//!
//! Property values are never merged recursively: an expression from a higher tier replaces the
//! lower tier value as a whole. Merging of user values into default expressions is done later,
//! per group, by [`combine_with_default`](super::combine_with_default).

use mapconf_types::{GeometryKind, GroupKind, StyleBag};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::expression::combine_with_default;
use super::properties::prefix_owner;

/// Default styles for each source type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDefaults {
    /// Vector tile groups.
    pub vector: KindDefaults,
    /// GeoJSON groups.
    pub geojson: KindDefaults,
    /// CSV groups.
    pub csv: KindDefaults,
    /// Raster tile groups (both `raster` and `tms`).
    pub raster: KindDefaults,
    /// Image groups.
    pub img: KindDefaults,
}

/// Default style of one source type, one bag per layer family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindDefaults {
    /// Fill layer properties.
    #[serde(default)]
    pub fill: StyleBag,
    /// Outline layer properties.
    #[serde(default)]
    pub line: StyleBag,
    /// Label layer properties.
    #[serde(default)]
    pub text: StyleBag,
    /// Circle layer properties.
    #[serde(default)]
    pub circle: StyleBag,
    /// Raster layer properties.
    #[serde(default)]
    pub raster: StyleBag,
}

/// Overrides of [`StyleDefaults`]. Absent fields keep the lower tier values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDefaultsPartial {
    /// Vector tile groups.
    #[serde(default)]
    pub vector: Option<KindDefaultsPartial>,
    /// GeoJSON groups.
    #[serde(default)]
    pub geojson: Option<KindDefaultsPartial>,
    /// CSV groups.
    #[serde(default)]
    pub csv: Option<KindDefaultsPartial>,
    /// Raster tile groups.
    #[serde(default)]
    pub raster: Option<KindDefaultsPartial>,
    /// Image groups.
    #[serde(default)]
    pub img: Option<KindDefaultsPartial>,
}

/// Overrides of [`KindDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KindDefaultsPartial {
    /// Fill layer properties.
    #[serde(default)]
    pub fill: Option<StyleBag>,
    /// Outline layer properties.
    #[serde(default)]
    pub line: Option<StyleBag>,
    /// Label layer properties.
    #[serde(default)]
    pub text: Option<StyleBag>,
    /// Circle layer properties.
    #[serde(default)]
    pub circle: Option<StyleBag>,
    /// Raster layer properties.
    #[serde(default)]
    pub raster: Option<StyleBag>,
}

impl StyleDefaultsPartial {
    /// Reads overrides from a JSON document. Returns `None` and logs a warning if the document
    /// has an unexpected structure.
    pub fn from_value(value: &Value) -> Option<Self> {
        match serde_json::from_value(value.clone()) {
            Ok(partial) => Some(partial),
            Err(err) => {
                log::warn!("Ignoring invalid style defaults: {err}");
                None
            }
        }
    }
}

fn hover_selected_case(selected: Value, hover: Value, fallback: Value) -> Value {
    json!([
        "case",
        ["boolean", ["feature-state", "selected"], false],
        selected,
        ["boolean", ["feature-state", "hover"], false],
        hover,
        fallback
    ])
}

fn bag(value: Value) -> StyleBag {
    match value {
        Value::Object(map) => map,
        _ => StyleBag::new(),
    }
}

impl StyleDefaults {
    /// Styles used when neither the defaults document nor the configuration define a property.
    pub fn fallback() -> Self {
        let polygons = KindDefaults {
            fill: bag(json!({
                "fill-color": hover_selected_case(json!("#ffff00"), json!("#abcdef"), json!("#ff0000")),
                "fill-opacity": 0.5,
            })),
            line: bag(json!({
                "line-color": [
                    "interpolate", ["linear"], ["zoom"],
                    6, hover_selected_case(json!("#ffff00"), json!("#ffffff"), json!("#000000")),
                    16, hover_selected_case(json!("#ffff00"), json!("#ffffff"), json!("#333333")),
                ],
                "line-width": [
                    "interpolate", ["linear"], ["zoom"],
                    6, ["case", ["boolean", ["feature-state", "selected"], false], 2, 0.5],
                    16, ["case", ["boolean", ["feature-state", "selected"], false], 4, 1.5],
                ],
                "line-opacity": 1.0,
            })),
            text: bag(json!({
                "text-font": ["Open Sans Regular"],
                "text-size": 12,
                "text-color": "#000000",
                "text-halo-color": "#ffffff",
                "text-halo-width": 1,
            })),
            circle: StyleBag::new(),
            raster: StyleBag::new(),
        };

        let points = KindDefaults {
            circle: bag(json!({
                "circle-radius": ["interpolate", ["linear"], ["zoom"], 6, 3, 16, 8],
                "circle-color": hover_selected_case(json!("#ffff00"), json!("#abcdef"), json!("#1f77b4")),
                "circle-opacity": 0.9,
                "circle-stroke-width": 1,
                "circle-stroke-color": "#ffffff",
            })),
            text: polygons.text.clone(),
            ..Default::default()
        };

        let images = KindDefaults {
            raster: bag(json!({ "raster-opacity": 1.0 })),
            ..Default::default()
        };

        Self {
            vector: polygons.clone(),
            geojson: KindDefaults {
                circle: points.circle.clone(),
                ..polygons
            },
            csv: points,
            raster: images.clone(),
            img: images,
        }
    }

    /// Applies overrides field by field.
    pub fn merge(&mut self, partial: &StyleDefaultsPartial) {
        let pairs = [
            (&mut self.vector, &partial.vector),
            (&mut self.geojson, &partial.geojson),
            (&mut self.csv, &partial.csv),
            (&mut self.raster, &partial.raster),
            (&mut self.img, &partial.img),
        ];

        for (defaults, overrides) in pairs {
            if let Some(overrides) = overrides {
                defaults.merge(overrides);
            }
        }
    }

    /// Returns the defaults with the overrides applied.
    pub fn merged(mut self, partial: Option<&StyleDefaultsPartial>) -> Self {
        if let Some(partial) = partial {
            self.merge(partial);
        }

        self
    }

    /// Defaults for the given group kind. Kinds that do not create styled layers have no
    /// defaults.
    pub fn for_kind(&self, kind: &GroupKind) -> Option<&KindDefaults> {
        match kind {
            GroupKind::Vector(_) => Some(&self.vector),
            GroupKind::Geojson(_) => Some(&self.geojson),
            GroupKind::Csv(_) => Some(&self.csv),
            GroupKind::Raster(_) | GroupKind::Tms(_) => Some(&self.raster),
            GroupKind::Image(_) => Some(&self.img),
            GroupKind::Choice(_) | GroupKind::StylePassthrough(_) | GroupKind::Terrain(_) => None,
        }
    }
}

impl KindDefaults {
    /// Default properties of the layer family drawn by layers of the given kind.
    pub fn family(&self, kind: GeometryKind) -> Option<&StyleBag> {
        match kind {
            GeometryKind::Fill => Some(&self.fill),
            GeometryKind::Line => Some(&self.line),
            GeometryKind::Symbol => Some(&self.text),
            GeometryKind::Circle => Some(&self.circle),
            GeometryKind::Raster => Some(&self.raster),
            _ => None,
        }
    }

    fn merge(&mut self, partial: &KindDefaultsPartial) {
        let pairs = [
            (&mut self.fill, &partial.fill),
            (&mut self.line, &partial.line),
            (&mut self.text, &partial.text),
            (&mut self.circle, &partial.circle),
            (&mut self.raster, &partial.raster),
        ];

        for (defaults, overrides) in pairs {
            if let Some(overrides) = overrides {
                for (name, value) in overrides {
                    defaults.insert(name.clone(), value.clone());
                }
            }
        }
    }

    /// Effective style of a layer family: the defaults of the family overlaid with the user
    /// properties. User properties with the prefix of another layer kind are left out, the ones
    /// without a known prefix are passed to every family. Colors are merged into the default
    /// expressions.
    pub fn style_for(&self, kind: GeometryKind, user: &StyleBag) -> StyleBag {
        let mut style = self.family(kind).cloned().unwrap_or_default();
        for (name, value) in user {
            if prefix_owner(name).is_some_and(|owner| owner != kind) {
                continue;
            }

            let merged = match style.get(name) {
                Some(default) if name.ends_with("-color") => combine_with_default(value, default),
                _ => value.clone(),
            };
            style.insert(name.clone(), merged);
        }

        style
    }
}

/// Resolves the defaults of a session from the defaults document and the `styles` section of the
/// configuration. Invalid overrides are logged and ignored.
pub fn resolve_defaults(document: Option<&Value>, config_styles: Option<&Value>) -> StyleDefaults {
    let document = document.and_then(StyleDefaultsPartial::from_value);
    let config = config_styles.and_then(StyleDefaultsPartial::from_value);

    StyleDefaults::fallback()
        .merged(document.as_ref())
        .merged(config.as_ref())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn document_overrides_fallback_per_property() {
        let document = json!({ "geojson": { "fill": { "fill-opacity": 0.2 } } });
        let defaults = resolve_defaults(Some(&document), None);

        assert_eq!(defaults.geojson.fill["fill-opacity"], json!(0.2));
        assert_eq!(
            defaults.geojson.fill["fill-color"],
            StyleDefaults::fallback().geojson.fill["fill-color"]
        );
    }

    #[test]
    fn config_overrides_document() {
        let document = json!({ "vector": { "line": { "line-width": 3, "line-opacity": 0.7 } } });
        let config = json!({ "vector": { "line": { "line-width": 1 } } });
        let defaults = resolve_defaults(Some(&document), Some(&config));

        assert_eq!(defaults.vector.line["line-width"], json!(1));
        assert_eq!(defaults.vector.line["line-opacity"], json!(0.7));
    }

    #[test]
    fn expressions_are_replaced_not_merged() {
        let config = json!({ "csv": { "circle": { "circle-radius": ["get", "size"] } } });
        let defaults = resolve_defaults(None, Some(&config));

        assert_eq!(defaults.csv.circle["circle-radius"], json!(["get", "size"]));
    }

    #[test]
    fn invalid_document_is_ignored() {
        let document = json!({ "vector": { "fill": 5 } });
        assert_eq!(resolve_defaults(Some(&document), None), StyleDefaults::fallback());
    }

    #[test]
    fn effective_style_merges_user_color() {
        let defaults = StyleDefaults::fallback();
        let user = bag(json!({ "fill-color": "#2ca02c", "fill-opacity": 0.3, "line-width": 5 }));
        let style = defaults.geojson.style_for(GeometryKind::Fill, &user);

        assert_eq!(style["fill-opacity"], json!(0.3));
        assert!(!style.contains_key("line-width"));
        assert_eq!(
            style["fill-color"],
            hover_selected_case(json!("#ffff00"), json!("#abcdef"), json!("#2ca02c"))
        );
    }

    #[test]
    fn unprefixed_properties_reach_every_family() {
        let defaults = KindDefaults::default();
        let user = bag(json!({ "visibility": "none", "emissive-strength": 1, "line-width": 2 }));

        let fill = defaults.style_for(GeometryKind::Fill, &user);
        assert_eq!(fill.get("visibility"), Some(&json!("none")));
        assert_eq!(fill.get("emissive-strength"), Some(&json!(1)));
        assert!(!fill.contains_key("line-width"));

        let line = defaults.style_for(GeometryKind::Line, &user);
        assert_eq!(line.len(), 3);
    }

    #[test]
    fn fill_family_excludes_extrusion() {
        let defaults = KindDefaults::default();
        let user = bag(json!({ "fill-extrusion-height": 10, "fill-color": "red" }));
        let style = defaults.style_for(GeometryKind::Fill, &user);

        assert_eq!(style.len(), 1);
    }
}
