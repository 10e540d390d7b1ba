//! Splitting flat style bags into paint and layout properties.

use lazy_static::lazy_static;
use mapconf_types::{GeometryKind, StyleBag};
use regex::Regex;

use super::properties::{prefix_owner, StylePropertyMap};

lazy_static! {
    static ref LAYOUT_NAME: Regex = Regex::new(
        r"^visibility$|-(sort-key|placement|anchor|field|font|size|image|cap|join)$"
    )
    .expect("invalid layout name pattern");
}

/// Style properties split into the two property families of the engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedStyle {
    /// Paint properties.
    pub paint: StyleBag,
    /// Layout properties.
    pub layout: StyleBag,
}

impl ClassifiedStyle {
    /// Returns true if neither family has properties.
    pub fn is_empty(&self) -> bool {
        self.paint.is_empty() && self.layout.is_empty()
    }
}

/// Splits the style bag into paint and layout properties for a layer of the given kind.
///
/// Properties known for the kind go to their family. Unknown properties with a prefix of another
/// layer kind (like `fill-color` for a symbol layer) are dropped. The rest of unknown properties
/// go to layout if their name looks like a layout property and to paint otherwise.
///
/// ```
/// use mapconf::style::classify;
/// use mapconf_types::GeometryKind;
/// use serde_json::json;
///
/// let style = json!({ "fill-color": "red", "text-field": ["get", "name"], "text-color": "black" });
/// let classified = classify(style.as_object().unwrap(), GeometryKind::Symbol);
///
/// assert!(classified.layout.contains_key("text-field"));
/// assert!(classified.paint.contains_key("text-color"));
/// assert!(!classified.paint.contains_key("fill-color"));
/// ```
pub fn classify(style: &StyleBag, kind: GeometryKind) -> ClassifiedStyle {
    let table = StylePropertyMap::for_kind(kind);
    let mut classified = ClassifiedStyle::default();

    for (name, value) in style {
        if table.is_layout(name) {
            classified.layout.insert(name.clone(), value.clone());
        } else if table.is_paint(name) {
            classified.paint.insert(name.clone(), value.clone());
        } else if prefix_owner(name).is_some_and(|owner| owner != kind) {
            log::trace!("Dropping property {name} not valid for {kind} layers");
        } else if LAYOUT_NAME.is_match(name) {
            classified.layout.insert(name.clone(), value.clone());
        } else {
            classified.paint.insert(name.clone(), value.clone());
        }
    }

    classified
}

/// Returns true if any property of the bag belongs to the given layer kind.
pub fn has_properties_of(style: &StyleBag, kind: GeometryKind) -> bool {
    style
        .keys()
        .any(|name| prefix_owner(name).is_some_and(|owner| owner == kind))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bag(value: serde_json::Value) -> StyleBag {
        value.as_object().cloned().expect("not an object")
    }

    #[test]
    fn every_table_property_lands_in_exactly_one_family() {
        for kind in GeometryKind::ALL {
            let table = StylePropertyMap::for_kind(kind);
            let style: StyleBag = table
                .layout
                .iter()
                .chain(table.paint)
                .map(|name| (name.to_string(), json!(1)))
                .collect();

            let classified = classify(&style, kind);

            assert_eq!(
                classified.paint.len() + classified.layout.len(),
                style.len(),
                "{kind}"
            );
            for name in style.keys() {
                assert!(
                    classified.paint.contains_key(name) != classified.layout.contains_key(name),
                    "{name} for {kind}"
                );
            }
        }
    }

    #[test]
    fn cross_kind_properties_are_dropped() {
        let classified = classify(
            &bag(json!({ "fill-color": "#ff0000", "text-color": "#000000" })),
            GeometryKind::Symbol,
        );

        assert!(!classified.paint.contains_key("fill-color"));
        assert!(!classified.layout.contains_key("fill-color"));
        assert!(classified.paint.contains_key("text-color"));
    }

    #[test]
    fn mixed_bag_for_fill() {
        let classified = classify(
            &bag(json!({
                "fill-color": "red",
                "fill-opacity": 0.5,
                "line-color": "black",
                "line-width": 2,
                "text-field": ["get", "name"],
                "visibility": "visible",
            })),
            GeometryKind::Fill,
        );

        assert_eq!(classified.paint.len(), 2);
        assert_eq!(classified.layout.len(), 1);
        assert_eq!(classified.layout["visibility"], json!("visible"));
    }

    #[test]
    fn unknown_properties_use_name_heuristics() {
        let classified = classify(
            &bag(json!({
                "line-future-anchor": "map",
                "line-glow": 3,
                "custom-sort-key": 1,
                "emissive-strength": 1,
            })),
            GeometryKind::Line,
        );

        assert!(classified.layout.contains_key("line-future-anchor"));
        assert!(classified.layout.contains_key("custom-sort-key"));
        assert!(classified.paint.contains_key("line-glow"));
        assert!(classified.paint.contains_key("emissive-strength"));
    }

    #[test]
    fn extrusion_properties_are_not_fill_properties() {
        let style = bag(json!({ "fill-extrusion-height": 10, "fill-color": "red" }));

        let extrusion = classify(&style, GeometryKind::FillExtrusion);
        assert!(extrusion.paint.contains_key("fill-extrusion-height"));
        assert!(!extrusion.paint.contains_key("fill-color"));

        let fill = classify(&style, GeometryKind::Fill);
        assert!(fill.paint.contains_key("fill-color"));
        assert!(!fill.paint.contains_key("fill-extrusion-height"));
    }

    #[test]
    fn layout_looking_property_of_other_kind_is_dropped() {
        let classified = classify(
            &bag(json!({ "fill-sort-key": 1, "text-font": ["Open Sans"] })),
            GeometryKind::Circle,
        );

        assert!(classified.is_empty());
    }

    #[test]
    fn family_detection() {
        let style = bag(json!({ "fill-color": "red", "text-field": "x" }));
        assert!(has_properties_of(&style, GeometryKind::Fill));
        assert!(has_properties_of(&style, GeometryKind::Symbol));
        assert!(!has_properties_of(&style, GeometryKind::Line));
    }
}
