use mapconf_types::LngLat;
use serde::Serialize;

use super::LogicalFeatureKey;
use crate::engine::RenderedFeature;

/// Feature reported in interaction events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractedFeature {
    /// Logical identity of the feature.
    pub key: LogicalFeatureKey,
    /// Engine layer the feature was taken from.
    pub layer_id: String,
    /// The feature as reported by the engine.
    pub feature: RenderedFeature,
    /// Pointer position of the interaction.
    pub lng_lat: Option<LngLat>,
}

/// State change of hovered and selected features, emitted for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "eventType",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum InteractionEvent {
    /// A single feature is under the pointer.
    FeatureHover {
        /// The hovered feature.
        feature: InteractedFeature,
    },
    /// Several features are under the pointer.
    FeaturesBatchHover {
        /// Hovered features, topmost first.
        features: Vec<InteractedFeature>,
    },
    /// No feature is hovered anymore.
    FeaturesHoverCleared,
    /// A single feature was selected by a click.
    FeatureClick {
        /// The selected feature.
        feature: InteractedFeature,
    },
    /// Several overlapping features were selected by a click.
    FeatureClickMultiple {
        /// Selected features, topmost first.
        features: Vec<InteractedFeature>,
    },
    /// All selections were cleared.
    SelectionsCleared,
    /// One feature was deselected.
    FeatureDeselected {
        /// The deselected feature.
        key: LogicalFeatureKey,
    },
    /// Features were deselected because their layers were removed.
    FeaturesBatchDeselected {
        /// The deselected features.
        keys: Vec<LogicalFeatureKey>,
    },
    /// An engine layer became interactive.
    LayerRegistered {
        /// Engine layer id.
        layer_id: String,
        /// Owning group id.
        group_id: String,
    },
    /// An engine layer stopped being interactive.
    LayerUnregistered {
        /// Engine layer id.
        layer_id: String,
        /// Owning group id.
        group_id: String,
    },
    /// All interaction state was dropped.
    Cleanup,
}

impl InteractionEvent {
    /// Name of the event as written in the `eventType` field.
    pub fn event_type(&self) -> &'static str {
        match self {
            InteractionEvent::FeatureHover { .. } => "feature-hover",
            InteractionEvent::FeaturesBatchHover { .. } => "features-batch-hover",
            InteractionEvent::FeaturesHoverCleared => "features-hover-cleared",
            InteractionEvent::FeatureClick { .. } => "feature-click",
            InteractionEvent::FeatureClickMultiple { .. } => "feature-click-multiple",
            InteractionEvent::SelectionsCleared => "selections-cleared",
            InteractionEvent::FeatureDeselected { .. } => "feature-deselected",
            InteractionEvent::FeaturesBatchDeselected { .. } => "features-batch-deselected",
            InteractionEvent::LayerRegistered { .. } => "layer-registered",
            InteractionEvent::LayerUnregistered { .. } => "layer-unregistered",
            InteractionEvent::Cleanup => "cleanup",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serialized_tag() {
        let event = InteractionEvent::LayerRegistered {
            layer_id: "parks-fill".into(),
            group_id: "parks".into(),
        };

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({ "eventType": "layer-registered", "layerId": "parks-fill", "groupId": "parks" })
        );
        assert_eq!(
            serde_json::to_value(InteractionEvent::FeaturesHoverCleared).unwrap(),
            json!({ "eventType": "features-hover-cleared" })
        );
        assert_eq!(event.event_type(), "layer-registered");
    }
}
