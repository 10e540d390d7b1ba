//! Static table of the paint and layout properties each layer kind accepts.

use mapconf_types::GeometryKind;

/// Layout property every layer kind accepts.
pub const VISIBILITY: &str = "visibility";

/// Recognised property names of one layer kind, split into the layout and paint families.
#[derive(Debug, Copy, Clone)]
pub struct StylePropertyMap {
    /// Layout properties, not including [`VISIBILITY`].
    pub layout: &'static [&'static str],
    /// Paint properties.
    pub paint: &'static [&'static str],
}

impl StylePropertyMap {
    /// Property table of the given layer kind.
    pub fn for_kind(kind: GeometryKind) -> Self {
        match kind {
            GeometryKind::Fill => FILL,
            GeometryKind::Line => LINE,
            GeometryKind::Symbol => SYMBOL,
            GeometryKind::Circle => CIRCLE,
            GeometryKind::Raster => RASTER,
            GeometryKind::FillExtrusion => FILL_EXTRUSION,
            GeometryKind::Heatmap => HEATMAP,
            GeometryKind::Hillshade => HILLSHADE,
            GeometryKind::Background => BACKGROUND,
        }
    }

    /// Returns true if the property is a layout property of this kind.
    pub fn is_layout(&self, name: &str) -> bool {
        name == VISIBILITY || self.layout.contains(&name)
    }

    /// Returns true if the property is a paint property of this kind.
    pub fn is_paint(&self, name: &str) -> bool {
        self.paint.contains(&name)
    }
}

/// Property name prefixes and the layer kinds owning them. Longer prefixes go first, so
/// `fill-extrusion-` wins over `fill-`.
const PREFIX_OWNERS: &[(&str, GeometryKind)] = &[
    ("fill-extrusion-", GeometryKind::FillExtrusion),
    ("fill-", GeometryKind::Fill),
    ("line-", GeometryKind::Line),
    ("text-", GeometryKind::Symbol),
    ("icon-", GeometryKind::Symbol),
    ("symbol-", GeometryKind::Symbol),
    ("circle-", GeometryKind::Circle),
    ("raster-", GeometryKind::Raster),
    ("heatmap-", GeometryKind::Heatmap),
    ("hillshade-", GeometryKind::Hillshade),
    ("background-", GeometryKind::Background),
];

/// Layer kind a property name belongs to, judging by its prefix.
pub fn prefix_owner(name: &str) -> Option<GeometryKind> {
    PREFIX_OWNERS
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|(_, kind)| *kind)
}

const FILL: StylePropertyMap = StylePropertyMap {
    layout: &["fill-sort-key"],
    paint: &[
        "fill-antialias",
        "fill-opacity",
        "fill-color",
        "fill-outline-color",
        "fill-translate",
        "fill-translate-anchor",
        "fill-pattern",
    ],
};

const LINE: StylePropertyMap = StylePropertyMap {
    layout: &[
        "line-cap",
        "line-join",
        "line-miter-limit",
        "line-round-limit",
        "line-sort-key",
    ],
    paint: &[
        "line-opacity",
        "line-color",
        "line-translate",
        "line-translate-anchor",
        "line-width",
        "line-gap-width",
        "line-offset",
        "line-blur",
        "line-dasharray",
        "line-pattern",
        "line-gradient",
    ],
};

const SYMBOL: StylePropertyMap = StylePropertyMap {
    layout: &[
        "symbol-placement",
        "symbol-spacing",
        "symbol-avoid-edges",
        "symbol-sort-key",
        "symbol-z-order",
        "icon-allow-overlap",
        "icon-overlap",
        "icon-ignore-placement",
        "icon-optional",
        "icon-rotation-alignment",
        "icon-size",
        "icon-text-fit",
        "icon-text-fit-padding",
        "icon-image",
        "icon-rotate",
        "icon-padding",
        "icon-keep-upright",
        "icon-offset",
        "icon-anchor",
        "icon-pitch-alignment",
        "text-pitch-alignment",
        "text-rotation-alignment",
        "text-field",
        "text-font",
        "text-size",
        "text-max-width",
        "text-line-height",
        "text-letter-spacing",
        "text-justify",
        "text-radial-offset",
        "text-variable-anchor",
        "text-variable-anchor-offset",
        "text-anchor",
        "text-max-angle",
        "text-writing-mode",
        "text-rotate",
        "text-padding",
        "text-keep-upright",
        "text-transform",
        "text-offset",
        "text-allow-overlap",
        "text-overlap",
        "text-ignore-placement",
        "text-optional",
    ],
    paint: &[
        "icon-opacity",
        "icon-color",
        "icon-halo-color",
        "icon-halo-width",
        "icon-halo-blur",
        "icon-translate",
        "icon-translate-anchor",
        "text-opacity",
        "text-color",
        "text-halo-color",
        "text-halo-width",
        "text-halo-blur",
        "text-translate",
        "text-translate-anchor",
    ],
};

const CIRCLE: StylePropertyMap = StylePropertyMap {
    layout: &["circle-sort-key"],
    paint: &[
        "circle-radius",
        "circle-color",
        "circle-blur",
        "circle-opacity",
        "circle-translate",
        "circle-translate-anchor",
        "circle-pitch-scale",
        "circle-pitch-alignment",
        "circle-stroke-width",
        "circle-stroke-color",
        "circle-stroke-opacity",
    ],
};

const RASTER: StylePropertyMap = StylePropertyMap {
    layout: &[],
    paint: &[
        "raster-opacity",
        "raster-hue-rotate",
        "raster-brightness-min",
        "raster-brightness-max",
        "raster-saturation",
        "raster-contrast",
        "raster-resampling",
        "raster-fade-duration",
    ],
};

const FILL_EXTRUSION: StylePropertyMap = StylePropertyMap {
    layout: &[],
    paint: &[
        "fill-extrusion-opacity",
        "fill-extrusion-color",
        "fill-extrusion-translate",
        "fill-extrusion-translate-anchor",
        "fill-extrusion-pattern",
        "fill-extrusion-height",
        "fill-extrusion-base",
        "fill-extrusion-vertical-gradient",
    ],
};

const HEATMAP: StylePropertyMap = StylePropertyMap {
    layout: &[],
    paint: &[
        "heatmap-radius",
        "heatmap-weight",
        "heatmap-intensity",
        "heatmap-color",
        "heatmap-opacity",
    ],
};

const HILLSHADE: StylePropertyMap = StylePropertyMap {
    layout: &[],
    paint: &[
        "hillshade-illumination-direction",
        "hillshade-illumination-anchor",
        "hillshade-exaggeration",
        "hillshade-shadow-color",
        "hillshade-highlight-color",
        "hillshade-accent-color",
    ],
};

const BACKGROUND: StylePropertyMap = StylePropertyMap {
    layout: &[],
    paint: &["background-color", "background-pattern", "background-opacity"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_do_not_overlap() {
        for kind in GeometryKind::ALL {
            let table = StylePropertyMap::for_kind(kind);
            for name in table.layout {
                assert!(!table.is_paint(name), "{name} is both paint and layout");
            }
        }
    }

    #[test]
    fn table_properties_belong_to_their_kind() {
        for kind in GeometryKind::ALL {
            let table = StylePropertyMap::for_kind(kind);
            for name in table.layout.iter().chain(table.paint) {
                assert_eq!(prefix_owner(name), Some(kind), "{name}");
            }
        }
    }

    #[test]
    fn extrusion_prefix_is_not_fill() {
        assert_eq!(
            prefix_owner("fill-extrusion-height"),
            Some(GeometryKind::FillExtrusion)
        );
        assert_eq!(prefix_owner("fill-color"), Some(GeometryKind::Fill));
        assert_eq!(prefix_owner("visibility"), None);
    }
}
