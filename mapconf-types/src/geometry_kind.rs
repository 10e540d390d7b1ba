//! See [`GeometryKind`].

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a map engine layer. The kind defines which paint and layout properties the layer
/// accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeometryKind {
    /// Filled polygons.
    Fill,
    /// Lines and polygon outlines.
    Line,
    /// Text labels and icons.
    Symbol,
    /// Circles drawn at point positions.
    Circle,
    /// Raster images and raster tiles.
    Raster,
    /// Extruded polygons.
    FillExtrusion,
    /// Point density heatmap.
    Heatmap,
    /// Shaded relief from a DEM source.
    Hillshade,
    /// Solid background of the map.
    Background,
}

impl GeometryKind {
    /// All kinds known to the engine.
    pub const ALL: [GeometryKind; 9] = [
        GeometryKind::Fill,
        GeometryKind::Line,
        GeometryKind::Symbol,
        GeometryKind::Circle,
        GeometryKind::Raster,
        GeometryKind::FillExtrusion,
        GeometryKind::Heatmap,
        GeometryKind::Hillshade,
        GeometryKind::Background,
    ];

    /// Name of the kind as used by the map engine style documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryKind::Fill => "fill",
            GeometryKind::Line => "line",
            GeometryKind::Symbol => "symbol",
            GeometryKind::Circle => "circle",
            GeometryKind::Raster => "raster",
            GeometryKind::FillExtrusion => "fill-extrusion",
            GeometryKind::Heatmap => "heatmap",
            GeometryKind::Hillshade => "hillshade",
            GeometryKind::Background => "background",
        }
    }
}

impl Display for GeometryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeometryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeometryKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown layer type {s:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_round_trip_through_from_str() {
        for kind in GeometryKind::ALL {
            assert_eq!(kind.as_str().parse::<GeometryKind>(), Ok(kind));
        }

        assert!("polygon".parse::<GeometryKind>().is_err());
    }

    #[test]
    fn serde_uses_style_names() {
        let kind: GeometryKind = serde_json::from_str("\"fill-extrusion\"").unwrap();
        assert_eq!(kind, GeometryKind::FillExtrusion);
    }
}
