use mapconf_types::{GeometryKind, StyleBag};
use serde_json::Value;

/// Opacity multiplier applied by the first toggle.
pub const DIMMED_FACTOR: f64 = 0.4;
/// Opacity multiplier applied by the second toggle.
pub const RAISED_FACTOR: f64 = 0.9;

/// Paint property holding the opacity of a layer kind.
pub fn opacity_property(kind: GeometryKind) -> Option<&'static str> {
    match kind {
        GeometryKind::Fill => Some("fill-opacity"),
        GeometryKind::Line => Some("line-opacity"),
        GeometryKind::Symbol => Some("text-opacity"),
        GeometryKind::Circle => Some("circle-opacity"),
        GeometryKind::Raster => Some("raster-opacity"),
        GeometryKind::FillExtrusion => Some("fill-extrusion-opacity"),
        GeometryKind::Heatmap => Some("heatmap-opacity"),
        GeometryKind::Hillshade | GeometryKind::Background => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum OpacityLevel {
    #[default]
    Base,
    Dimmed,
    Raised,
}

impl OpacityLevel {
    fn factor(self) -> f64 {
        match self {
            OpacityLevel::Base => 1.0,
            OpacityLevel::Dimmed => DIMMED_FACTOR,
            OpacityLevel::Raised => RAISED_FACTOR,
        }
    }

    fn next(self) -> Self {
        match self {
            OpacityLevel::Base | OpacityLevel::Raised => OpacityLevel::Dimmed,
            OpacityLevel::Dimmed => OpacityLevel::Raised,
        }
    }
}

/// Base opacity of one layer, captured when the layer was created.
#[derive(Debug, Clone, PartialEq)]
pub struct OpacityBase {
    /// Engine layer id.
    pub layer_id: String,
    /// Opacity paint property.
    pub property: &'static str,
    /// Opacity the layer was created with.
    pub base: f64,
}

/// Opacity toggle state of one group.
///
/// The applied opacity is always computed from the cached base, so toggling never compounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpacityState {
    level: OpacityLevel,
    bases: Vec<OpacityBase>,
}

impl OpacityState {
    /// Remembers the base opacity of a new layer. Layers whose opacity is an expression are not
    /// toggled. A missing opacity counts as fully opaque.
    pub fn capture(&mut self, layer_id: &str, kind: GeometryKind, paint: &StyleBag) {
        let Some(property) = opacity_property(kind) else {
            return;
        };

        let base = match paint.get(property) {
            None => 1.0,
            Some(Value::Number(number)) => match number.as_f64() {
                Some(value) => value,
                None => return,
            },
            Some(_) => {
                log::debug!("Opacity of layer {layer_id} is an expression and will not be toggled");
                return;
            }
        };

        self.bases.push(OpacityBase {
            layer_id: layer_id.to_string(),
            property,
            base,
        });
    }

    /// Current multiplier.
    pub fn factor(&self) -> f64 {
        self.level.factor()
    }

    /// Switches to the next multiplier and returns it.
    pub fn toggle(&mut self) -> f64 {
        self.level = self.level.next();
        self.factor()
    }

    /// Opacity values to apply for the current multiplier.
    pub fn applied(&self) -> impl Iterator<Item = (&str, &'static str, f64)> + '_ {
        let factor = self.factor();
        self.bases
            .iter()
            .map(move |base| (base.layer_id.as_str(), base.property, base.base * factor))
    }

    /// Cached base opacities.
    pub fn bases(&self) -> &[OpacityBase] {
        &self.bases
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use serde_json::json;

    use super::*;

    fn paint(value: Value) -> StyleBag {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn toggling_reads_from_base() {
        let mut state = OpacityState::default();
        state.capture("parks-fill", GeometryKind::Fill, &paint(json!({ "fill-opacity": 0.5 })));

        assert_relative_eq!(state.toggle(), 0.4);
        let applied: Vec<_> = state.applied().collect();
        assert_relative_eq!(applied[0].2, 0.2);

        assert_relative_eq!(state.toggle(), 0.9);
        let applied: Vec<_> = state.applied().collect();
        assert_relative_eq!(applied[0].2, 0.45);

        assert_relative_eq!(state.toggle(), 0.4);
        let applied: Vec<_> = state.applied().collect();
        assert_relative_eq!(applied[0].2, 0.2);
    }

    #[test]
    fn missing_opacity_is_opaque() {
        let mut state = OpacityState::default();
        state.capture("sat-raster", GeometryKind::Raster, &StyleBag::new());
        state.toggle();

        let applied: Vec<_> = state.applied().collect();
        assert_eq!(applied[0].1, "raster-opacity");
        assert_relative_eq!(applied[0].2, 0.4);
    }

    #[test]
    fn expressions_are_not_toggled() {
        let mut state = OpacityState::default();
        state.capture(
            "roads-line",
            GeometryKind::Line,
            &paint(json!({ "line-opacity": ["interpolate", ["linear"], ["zoom"], 5, 0, 10, 1] })),
        );

        assert!(state.bases().is_empty());
    }
}
