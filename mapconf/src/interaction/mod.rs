//! Hover and selection state of features across interactive engine layers.
//!
//! One logical feature is often drawn by several engine layers: the fill, the outline and the
//! label of a polygon. The engine reports it once per layer. [`FeatureInteractionManager`]
//! collapses these reports into one [`LogicalFeatureKey`] per feature, keeps the hover and
//! selection flags of every logical feature and mirrors them into the engine feature state, so
//! that `feature-state` expressions of the styles can highlight hovered and selected features.

use std::collections::{HashMap, HashSet};

use mapconf_types::{GeometryKind, LngLat};
use serde::Serialize;
use serde_json::{Map, Value};
use web_time::SystemTime;

use crate::engine::{FeatureStateTarget, MapEngine, RenderedFeature, ScreenPoint};

mod events;
mod identity;

pub use events::{InteractedFeature, InteractionEvent};
pub use identity::FeatureIdentity;

const HOVER_STATE: &str = "hover";
const SELECTED_STATE: &str = "selected";

/// Engine layer that reacts to pointer events.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractiveLayer {
    /// Engine layer id.
    pub layer_id: String,
    /// Group owning the layer.
    pub group_id: String,
    /// Engine source of the layer.
    pub source_id: String,
    /// Layer of a vector tile source.
    pub source_layer: Option<String>,
    /// Layer kind.
    pub kind: GeometryKind,
    /// Feature property configured as the feature id.
    pub id_field: Option<String>,
}

/// Identity of a logical feature. Reports of the same feature by different layers of one group
/// share the key. Features of different groups never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogicalFeatureKey {
    /// Engine source of the feature.
    pub source_id: String,
    /// Group the feature belongs to.
    pub group_id: String,
    /// Identity of the feature inside the source.
    pub identity: FeatureIdentity,
}

/// Interaction state of one logical feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStateRecord {
    /// Engine layer whose report represents the feature.
    pub layer_id: String,
    /// Last report of the feature.
    pub feature: RenderedFeature,
    /// The feature is under the pointer.
    pub is_hovered: bool,
    /// The feature is selected.
    pub is_selected: bool,
    /// Time of the last interaction.
    pub timestamp: SystemTime,
    /// Pointer position of the last interaction.
    pub lng_lat: Option<LngLat>,
}

/// Rank of the layer kinds when several layers report one logical feature. Lower wins.
fn preference_rank(kind: GeometryKind) -> u8 {
    match kind {
        GeometryKind::Fill => 0,
        GeometryKind::Circle => 1,
        GeometryKind::Symbol => 2,
        GeometryKind::Line => 3,
        _ => 4,
    }
}

type Consolidated = Vec<(LogicalFeatureKey, RenderedFeature)>;

/// Consolidated hover and selection state of all interactive layers.
#[derive(Debug, Default)]
pub struct FeatureInteractionManager {
    layers: Vec<InteractiveLayer>,
    suspended: Vec<InteractiveLayer>,
    records: HashMap<LogicalFeatureKey, FeatureStateRecord>,
    hover_order: Vec<LogicalFeatureKey>,
    hover_contributions: HashMap<String, Vec<LogicalFeatureKey>>,
}

impl FeatureInteractionManager {
    /// Creates a manager without interactive layers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered interactive layers.
    pub fn layers(&self) -> &[InteractiveLayer] {
        &self.layers
    }

    /// State of a logical feature.
    pub fn record(&self, key: &LogicalFeatureKey) -> Option<&FeatureStateRecord> {
        self.records.get(key)
    }

    /// Keys of the hovered features, topmost first.
    pub fn hovered(&self) -> Vec<&LogicalFeatureKey> {
        self.hover_order
            .iter()
            .filter(|key| self.records.get(*key).is_some_and(|record| record.is_hovered))
            .collect()
    }

    /// Keys of the selected features, sorted.
    pub fn selected(&self) -> Vec<&LogicalFeatureKey> {
        let mut keys: Vec<_> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_selected)
            .map(|(key, _)| key)
            .collect();
        keys.sort();
        keys
    }

    fn layer(&self, layer_id: &str) -> Option<&InteractiveLayer> {
        self.layers.iter().find(|layer| layer.layer_id == layer_id)
    }

    /// Makes the layer interactive.
    pub fn register(
        &mut self,
        engine: &mut impl MapEngine,
        layer: InteractiveLayer,
    ) -> Vec<InteractionEvent> {
        if self.layer(&layer.layer_id).is_some() {
            return vec![];
        }

        self.suspended.retain(|suspended| suspended.layer_id != layer.layer_id);

        log::debug!("Layer {} of {} is interactive", layer.layer_id, layer.group_id);
        engine.subscribe_pointer_events(&layer.layer_id);
        let event = InteractionEvent::LayerRegistered {
            layer_id: layer.layer_id.clone(),
            group_id: layer.group_id.clone(),
        };
        self.layers.push(layer);

        vec![event]
    }

    /// Stops pointer delivery for the layers of a hidden group. Hover and selection state of
    /// their features is kept until the layers are shown again or unregistered.
    pub fn suspend(
        &mut self,
        engine: &mut impl MapEngine,
        layer_ids: &[String],
    ) -> Vec<InteractionEvent> {
        let removed = self.detach(engine, layer_ids);
        let mut events = Vec::with_capacity(removed.len());
        for layer in removed {
            log::debug!("Layer {} of {} is suspended", layer.layer_id, layer.group_id);
            events.push(InteractionEvent::LayerUnregistered {
                layer_id: layer.layer_id.clone(),
                group_id: layer.group_id.clone(),
            });
            self.suspended.push(layer);
        }

        events
    }

    /// Stops tracking the layers. Features of groups left without interactive or suspended
    /// layers are forgotten; the selected ones are reported in one `features-batch-deselected`
    /// event before the `layer-unregistered` events.
    pub fn unregister(
        &mut self,
        engine: &mut impl MapEngine,
        layer_ids: &[String],
    ) -> Vec<InteractionEvent> {
        let removed = self.detach(engine, layer_ids);
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.suspended)
            .into_iter()
            .partition(|layer| layer_ids.contains(&layer.layer_id));
        self.suspended = kept;

        if removed.is_empty() && dropped.is_empty() {
            return vec![];
        }

        let orphaned: HashSet<(&str, &str)> = removed
            .iter()
            .chain(&dropped)
            .map(|layer| (layer.group_id.as_str(), layer.source_id.as_str()))
            .filter(|(group, source)| {
                !self
                    .layers
                    .iter()
                    .chain(&self.suspended)
                    .any(|layer| layer.group_id == *group && layer.source_id == *source)
            })
            .collect();

        let mut forgotten: Vec<LogicalFeatureKey> = self
            .records
            .keys()
            .filter(|key| orphaned.contains(&(key.group_id.as_str(), key.source_id.as_str())))
            .cloned()
            .collect();
        forgotten.sort();

        let mut events = vec![];
        let mut deselected = vec![];
        let mut lost_hover = false;
        for key in forgotten {
            if let Some(record) = self.records.remove(&key) {
                if record.is_hovered {
                    lost_hover = true;
                    Self::remove_state(engine, &key, &record.feature, HOVER_STATE);
                }
                if record.is_selected {
                    Self::remove_state(engine, &key, &record.feature, SELECTED_STATE);
                    deselected.push(key);
                }
            }
        }

        if lost_hover && self.hovered().is_empty() {
            events.push(InteractionEvent::FeaturesHoverCleared);
        }
        if !deselected.is_empty() {
            events.push(InteractionEvent::FeaturesBatchDeselected { keys: deselected });
        }

        for layer in removed {
            log::debug!("Layer {} of {} is not interactive anymore", layer.layer_id, layer.group_id);
            events.push(InteractionEvent::LayerUnregistered {
                layer_id: layer.layer_id,
                group_id: layer.group_id,
            });
        }

        events
    }

    fn detach(
        &mut self,
        engine: &mut impl MapEngine,
        layer_ids: &[String],
    ) -> Vec<InteractiveLayer> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.layers)
            .into_iter()
            .partition(|layer| layer_ids.contains(&layer.layer_id));
        self.layers = kept;

        for layer in &removed {
            engine.unsubscribe_pointer_events(&layer.layer_id);
            self.hover_contributions.remove(&layer.layer_id);
        }

        removed
    }

    /// Updates the hover state from the features under the pointer.
    pub fn pointer_moved(
        &mut self,
        engine: &mut impl MapEngine,
        point: ScreenPoint,
        lng_lat: Option<LngLat>,
    ) -> Vec<InteractionEvent> {
        let had_hover = !self.hovered().is_empty();
        let (hovered, contributions) = self.query(&*engine, point);

        let current: HashSet<&LogicalFeatureKey> = hovered.iter().map(|(key, _)| key).collect();
        let stale: Vec<LogicalFeatureKey> = self
            .records
            .iter()
            .filter(|(key, record)| record.is_hovered && !current.contains(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            self.set_hovered(engine, &key, false);
        }

        self.hover_contributions = contributions;
        self.hover_order = hovered.iter().map(|(key, _)| key.clone()).collect();

        let now = SystemTime::now();
        let mut features = vec![];
        for (key, feature) in hovered {
            let record = self
                .records
                .entry(key.clone())
                .or_insert_with(|| FeatureStateRecord {
                    layer_id: feature.layer_id.clone(),
                    feature: feature.clone(),
                    is_hovered: false,
                    is_selected: false,
                    timestamp: now,
                    lng_lat,
                });

            if !record.is_hovered {
                Self::write_state(engine, &key, &feature, HOVER_STATE);
            }

            record.layer_id = feature.layer_id.clone();
            record.feature = feature;
            record.is_hovered = true;
            record.timestamp = now;
            record.lng_lat = lng_lat;

            features.push(Self::interacted(&key, record));
        }

        match features.len() {
            0 if had_hover => vec![InteractionEvent::FeaturesHoverCleared],
            0 => vec![],
            1 => vec![InteractionEvent::FeatureHover {
                feature: features.remove(0),
            }],
            _ => vec![InteractionEvent::FeaturesBatchHover { features }],
        }
    }

    /// Removes the hover contribution of one layer after the pointer left it.
    pub fn pointer_left(
        &mut self,
        engine: &mut impl MapEngine,
        layer_id: &str,
    ) -> Vec<InteractionEvent> {
        let Some(keys) = self.hover_contributions.remove(layer_id) else {
            return vec![];
        };

        let mut changed = false;
        for key in keys {
            let reported_elsewhere = self
                .hover_contributions
                .values()
                .any(|keys| keys.contains(&key));
            let is_hovered = self.records.get(&key).is_some_and(|record| record.is_hovered);

            if is_hovered && !reported_elsewhere {
                self.set_hovered(engine, &key, false);
                changed = true;
            }
        }

        if !changed {
            return vec![];
        }

        let remaining: Vec<InteractedFeature> = self
            .hovered()
            .into_iter()
            .filter_map(|key| Some(Self::interacted(key, self.records.get(key)?)))
            .collect();

        if remaining.is_empty() {
            vec![InteractionEvent::FeaturesHoverCleared]
        } else {
            vec![InteractionEvent::FeaturesBatchHover {
                features: remaining,
            }]
        }
    }

    /// Selects the features under the pointer. Previous selections are always cleared; a click
    /// on empty space only clears them.
    pub fn clicked(
        &mut self,
        engine: &mut impl MapEngine,
        point: ScreenPoint,
        lng_lat: Option<LngLat>,
    ) -> Vec<InteractionEvent> {
        let (clicked, _) = self.query(&*engine, point);
        self.select(engine, clicked, lng_lat)
    }

    /// Selects a feature of the group by its identity, as if it was clicked. Used when the
    /// feature is picked outside of the map, for example from a list of features.
    pub fn select_by_identity(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        identity: &FeatureIdentity,
    ) -> Vec<InteractionEvent> {
        let Some(layer) = self
            .layers
            .iter()
            .filter(|layer| layer.group_id == group_id)
            .min_by_key(|layer| preference_rank(layer.kind))
            .cloned()
        else {
            log::warn!("Group {group_id} has no interactive layers");
            return vec![];
        };

        let found = engine
            .query_source_features(&layer.source_id, layer.source_layer.as_deref())
            .into_iter()
            .find(|feature| FeatureIdentity::of(feature, layer.id_field.as_deref()) == *identity);

        let Some(mut feature) = found else {
            log::debug!("Feature {identity} is not found in {group_id}");
            return vec![];
        };

        feature.layer_id = layer.layer_id.clone();
        let key = LogicalFeatureKey {
            source_id: layer.source_id,
            group_id: layer.group_id,
            identity: identity.clone(),
        };

        self.select(engine, vec![(key, feature)], None)
    }

    /// Deselects one feature.
    pub fn deselect(
        &mut self,
        engine: &mut impl MapEngine,
        key: &LogicalFeatureKey,
    ) -> Vec<InteractionEvent> {
        if !self.records.get(key).is_some_and(|record| record.is_selected) {
            return vec![];
        }

        self.set_selected(engine, key, false);
        vec![InteractionEvent::FeatureDeselected { key: key.clone() }]
    }

    /// Deselects all features.
    pub fn clear_selections(&mut self, engine: &mut impl MapEngine) -> Vec<InteractionEvent> {
        self.clear_selected(engine);
        vec![InteractionEvent::SelectionsCleared]
    }

    /// Drops all state and stops listening to all layers.
    pub fn cleanup(&mut self, engine: &mut impl MapEngine) -> Vec<InteractionEvent> {
        for (key, record) in std::mem::take(&mut self.records) {
            Self::clear_state(engine, &key, &record.feature);
        }

        for layer in std::mem::take(&mut self.layers) {
            engine.unsubscribe_pointer_events(&layer.layer_id);
        }

        self.suspended.clear();
        self.hover_order.clear();
        self.hover_contributions.clear();

        vec![InteractionEvent::Cleanup]
    }

    fn select(
        &mut self,
        engine: &mut impl MapEngine,
        selected: Consolidated,
        lng_lat: Option<LngLat>,
    ) -> Vec<InteractionEvent> {
        self.clear_selected(engine);
        if selected.is_empty() {
            return vec![InteractionEvent::SelectionsCleared];
        }

        let now = SystemTime::now();
        let mut features = vec![];
        for (key, feature) in selected {
            Self::write_state(engine, &key, &feature, SELECTED_STATE);

            let record = self
                .records
                .entry(key.clone())
                .or_insert_with(|| FeatureStateRecord {
                    layer_id: feature.layer_id.clone(),
                    feature: feature.clone(),
                    is_hovered: false,
                    is_selected: false,
                    timestamp: now,
                    lng_lat,
                });

            record.layer_id = feature.layer_id.clone();
            record.feature = feature;
            record.is_selected = true;
            record.timestamp = now;
            record.lng_lat = lng_lat;

            features.push(Self::interacted(&key, record));
        }

        if features.len() == 1 {
            vec![InteractionEvent::FeatureClick {
                feature: features.remove(0),
            }]
        } else {
            vec![InteractionEvent::FeatureClickMultiple { features }]
        }
    }

    fn clear_selected(&mut self, engine: &mut impl MapEngine) {
        let selected: Vec<LogicalFeatureKey> = self.selected().into_iter().cloned().collect();
        for key in selected {
            self.set_selected(engine, &key, false);
        }
    }

    /// Features under the pointer, one per logical feature, topmost first. Also returns the keys
    /// reported by every layer.
    fn query(
        &self,
        engine: &impl MapEngine,
        point: ScreenPoint,
    ) -> (Consolidated, HashMap<String, Vec<LogicalFeatureKey>>) {
        let mut consolidated: Consolidated = vec![];
        let mut contributions: HashMap<String, Vec<LogicalFeatureKey>> = HashMap::new();
        if self.layers.is_empty() {
            return (consolidated, contributions);
        }

        let layer_ids: Vec<String> = self.layers.iter().map(|l| l.layer_id.clone()).collect();
        for feature in engine.query_rendered_features(point, &layer_ids) {
            let Some(layer) = self.layer(&feature.layer_id) else {
                continue;
            };

            let key = LogicalFeatureKey {
                source_id: layer.source_id.clone(),
                group_id: layer.group_id.clone(),
                identity: FeatureIdentity::of(&feature, layer.id_field.as_deref()),
            };

            contributions
                .entry(feature.layer_id.clone())
                .or_default()
                .push(key.clone());

            match consolidated.iter_mut().find(|(existing, _)| *existing == key) {
                Some((_, current)) => {
                    if preference_rank(feature.kind) < preference_rank(current.kind) {
                        *current = feature;
                    }
                }
                None => consolidated.push((key, feature)),
            }
        }

        (consolidated, contributions)
    }

    fn set_hovered(&mut self, engine: &mut impl MapEngine, key: &LogicalFeatureKey, value: bool) {
        self.update_flag(engine, key, HOVER_STATE, value);
    }

    fn set_selected(&mut self, engine: &mut impl MapEngine, key: &LogicalFeatureKey, value: bool) {
        self.update_flag(engine, key, SELECTED_STATE, value);
    }

    fn update_flag(
        &mut self,
        engine: &mut impl MapEngine,
        key: &LogicalFeatureKey,
        state: &str,
        value: bool,
    ) {
        let Some(record) = self.records.get_mut(key) else {
            return;
        };

        match state {
            HOVER_STATE => record.is_hovered = value,
            _ => record.is_selected = value,
        }

        if value {
            Self::write_state(engine, key, &record.feature, state);
        } else {
            Self::remove_state(engine, key, &record.feature, state);
        }

        if !record.is_hovered && !record.is_selected {
            self.records.remove(key);
        }
    }

    fn target(key: &LogicalFeatureKey, feature: &RenderedFeature) -> Option<FeatureStateTarget> {
        Some(FeatureStateTarget {
            source: key.source_id.clone(),
            source_layer: feature.source_layer.clone(),
            id: feature.id.clone()?,
        })
    }

    fn write_state(
        engine: &mut impl MapEngine,
        key: &LogicalFeatureKey,
        feature: &RenderedFeature,
        state: &str,
    ) {
        let Some(target) = Self::target(key, feature) else {
            return;
        };

        let mut values = Map::new();
        values.insert(state.to_string(), Value::Bool(true));
        if let Err(err) = engine.set_feature_state(&target, values) {
            log::warn!("Failed to set {state} state of feature {}: {err}", key.identity);
        }
    }

    fn remove_state(
        engine: &mut impl MapEngine,
        key: &LogicalFeatureKey,
        feature: &RenderedFeature,
        state: &str,
    ) {
        let Some(target) = Self::target(key, feature) else {
            return;
        };

        if !engine.has_source(&target.source) {
            return;
        }

        if let Err(err) = engine.remove_feature_state(&target, Some(state)) {
            log::warn!("Failed to clear {state} state of feature {}: {err}", key.identity);
        }
    }

    fn clear_state(engine: &mut impl MapEngine, key: &LogicalFeatureKey, feature: &RenderedFeature) {
        let Some(target) = Self::target(key, feature) else {
            return;
        };

        if engine.has_source(&target.source) {
            if let Err(err) = engine.remove_feature_state(&target, None) {
                log::warn!("Failed to clear state of feature {}: {err}", key.identity);
            }
        }
    }

    fn interacted(key: &LogicalFeatureKey, record: &FeatureStateRecord) -> InteractedFeature {
        InteractedFeature {
            key: key.clone(),
            layer_id: record.layer_id.clone(),
            feature: record.feature.clone(),
            lng_lat: record.lng_lat,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::engine::{FeatureId, InMemoryEngine, LayerSpec, SourceSpec};
    use mapconf_types::StyleBag;

    fn add_group(engine: &mut InMemoryEngine, manager: &mut FeatureInteractionManager, group: &str) {
        let source = format!("{group}-source");
        engine
            .add_source(
                &source,
                SourceSpec::Geojson {
                    data: json!({ "type": "FeatureCollection", "features": [] }),
                    promote_id: None,
                    generate_id: true,
                },
            )
            .unwrap();

        for kind in [GeometryKind::Fill, GeometryKind::Line] {
            let layer_id = format!("{group}-{}", kind.as_str());
            engine
                .add_layer(
                    LayerSpec {
                        id: layer_id.clone(),
                        kind,
                        source: source.clone(),
                        source_layer: None,
                        paint: StyleBag::new(),
                        layout: StyleBag::new(),
                        filter: None,
                        minzoom: None,
                        maxzoom: None,
                    },
                    None,
                )
                .unwrap();

            manager.register(
                engine,
                InteractiveLayer {
                    layer_id,
                    group_id: group.into(),
                    source_id: source.clone(),
                    source_layer: None,
                    kind,
                    id_field: None,
                },
            );
        }
    }

    fn rendered(group: &str, kind: GeometryKind, id: Option<u64>, geometry: Value) -> RenderedFeature {
        RenderedFeature {
            layer_id: format!("{group}-{}", kind.as_str()),
            kind,
            source: format!("{group}-source"),
            source_layer: None,
            id: id.map(FeatureId::Number),
            properties: Map::new(),
            geometry: Some(geometry),
        }
    }

    fn point() -> Value {
        json!({ "type": "Point", "coordinates": [73.8, 15.5] })
    }

    fn key(group: &str, id: u64) -> LogicalFeatureKey {
        LogicalFeatureKey {
            source_id: format!("{group}-source"),
            group_id: group.into(),
            identity: FeatureIdentity::Id(FeatureId::Number(id)),
        }
    }

    fn target(group: &str, id: u64) -> FeatureStateTarget {
        FeatureStateTarget {
            source: format!("{group}-source"),
            source_layer: None,
            id: FeatureId::Number(id),
        }
    }

    fn setup() -> (InMemoryEngine, FeatureInteractionManager) {
        let mut engine = InMemoryEngine::new();
        let mut manager = FeatureInteractionManager::new();
        add_group(&mut engine, &mut manager, "parks");
        add_group(&mut engine, &mut manager, "wards");
        (engine, manager)
    }

    #[test]
    fn hover_prefers_fill_report() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![
            rendered("parks", GeometryKind::Line, Some(1), point()),
            rendered("parks", GeometryKind::Fill, Some(1), point()),
        ]);

        let events = manager.pointer_moved(&mut engine, ScreenPoint::new(5.0, 5.0), None);
        assert_eq!(events.len(), 1);
        assert_matches!(
            &events[0],
            InteractionEvent::FeatureHover { feature } if feature.layer_id == "parks-fill"
        );
        assert_eq!(
            engine.feature_state(&target("parks", 1)).and_then(|s| s.get("hover")),
            Some(&json!(true))
        );
    }

    #[test]
    fn hover_moves_between_features() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![rendered("parks", GeometryKind::Fill, Some(1), point())]);
        manager.pointer_moved(&mut engine, ScreenPoint::default(), None);

        engine.set_rendered_features(vec![rendered("parks", GeometryKind::Fill, Some(2), point())]);
        manager.pointer_moved(&mut engine, ScreenPoint::default(), None);

        assert_eq!(manager.hovered(), vec![&key("parks", 2)]);
        assert_eq!(manager.record(&key("parks", 1)), None);
        assert!(engine
            .feature_state(&target("parks", 1))
            .is_some_and(|state| !state.contains_key("hover")));

        engine.set_rendered_features(vec![]);
        let events = manager.pointer_moved(&mut engine, ScreenPoint::default(), None);
        assert_eq!(events, vec![InteractionEvent::FeaturesHoverCleared]);
    }

    #[test]
    fn features_of_different_groups_do_not_collapse() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![
            rendered("parks", GeometryKind::Fill, None, point()),
            rendered("wards", GeometryKind::Fill, None, point()),
            rendered("wards", GeometryKind::Line, None, point()),
        ]);

        let events = manager.pointer_moved(&mut engine, ScreenPoint::default(), None);
        assert_matches!(
            &events[0],
            InteractionEvent::FeaturesBatchHover { features } if features.len() == 2
        );
    }

    #[test]
    fn leaving_one_layer_keeps_other_hover() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![
            rendered("parks", GeometryKind::Fill, Some(1), point()),
            rendered("wards", GeometryKind::Fill, Some(9), point()),
        ]);
        manager.pointer_moved(&mut engine, ScreenPoint::default(), None);

        let events = manager.pointer_left(&mut engine, "parks-fill");
        assert_matches!(
            &events[0],
            InteractionEvent::FeaturesBatchHover { features }
                if features.len() == 1 && features[0].key == key("wards", 9)
        );

        assert!(manager.pointer_left(&mut engine, "parks-line").is_empty());
        let events = manager.pointer_left(&mut engine, "wards-fill");
        assert_eq!(events, vec![InteractionEvent::FeaturesHoverCleared]);
    }

    #[test]
    fn leaving_outline_keeps_fill_contribution() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![
            rendered("parks", GeometryKind::Line, Some(1), point()),
            rendered("parks", GeometryKind::Fill, Some(1), point()),
        ]);
        manager.pointer_moved(&mut engine, ScreenPoint::default(), None);

        assert!(manager.pointer_left(&mut engine, "parks-line").is_empty());
        assert_eq!(manager.hovered(), vec![&key("parks", 1)]);
    }

    #[test]
    fn click_selects_exclusively() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![rendered("parks", GeometryKind::Fill, Some(1), point())]);
        let events = manager.clicked(&mut engine, ScreenPoint::default(), None);
        assert_matches!(&events[0], InteractionEvent::FeatureClick { .. });

        engine.set_rendered_features(vec![
            rendered("wards", GeometryKind::Line, Some(2), point()),
            rendered("wards", GeometryKind::Fill, Some(2), point()),
        ]);
        manager.clicked(&mut engine, ScreenPoint::default(), None);

        assert_eq!(manager.selected(), vec![&key("wards", 2)]);
        assert_eq!(manager.record(&key("parks", 1)), None);
        assert!(engine
            .feature_state(&target("parks", 1))
            .is_some_and(|state| !state.contains_key("selected")));
        assert_eq!(
            engine.feature_state(&target("wards", 2)).and_then(|s| s.get("selected")),
            Some(&json!(true))
        );
    }

    #[test]
    fn click_on_empty_space_clears() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![rendered("parks", GeometryKind::Fill, Some(1), point())]);
        manager.clicked(&mut engine, ScreenPoint::default(), None);

        engine.set_rendered_features(vec![]);
        let events = manager.clicked(&mut engine, ScreenPoint::default(), None);
        assert_eq!(events, vec![InteractionEvent::SelectionsCleared]);
        assert!(manager.selected().is_empty());
    }

    #[test]
    fn overlapping_click_selects_all() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![
            rendered("parks", GeometryKind::Fill, Some(1), point()),
            rendered("wards", GeometryKind::Fill, Some(2), point()),
        ]);

        let events = manager.clicked(&mut engine, ScreenPoint::default(), None);
        assert_matches!(
            &events[0],
            InteractionEvent::FeatureClickMultiple { features } if features.len() == 2
        );
    }

    #[test]
    fn unregister_reports_deselection_first() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![rendered("parks", GeometryKind::Fill, Some(1), point())]);
        manager.clicked(&mut engine, ScreenPoint::default(), None);

        let events = manager.unregister(
            &mut engine,
            &["parks-fill".to_string(), "parks-line".to_string()],
        );

        let types: Vec<_> = events.iter().map(InteractionEvent::event_type).collect();
        assert_eq!(
            types,
            vec!["features-batch-deselected", "layer-unregistered", "layer-unregistered"]
        );
        assert!(!engine.is_subscribed("parks-fill"));
        assert!(manager.selected().is_empty());
        assert!(engine
            .feature_state(&target("parks", 1))
            .is_some_and(|state| state.is_empty()));
    }

    #[test]
    fn suspended_layers_keep_selection() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![rendered("parks", GeometryKind::Fill, Some(1), point())]);
        manager.clicked(&mut engine, ScreenPoint::default(), None);

        let layers = ["parks-fill".to_string(), "parks-line".to_string()];
        let events = manager.suspend(&mut engine, &layers);
        let types: Vec<_> = events.iter().map(InteractionEvent::event_type).collect();
        assert_eq!(types, vec!["layer-unregistered", "layer-unregistered"]);
        assert!(!engine.is_subscribed("parks-fill"));
        assert_eq!(manager.selected(), vec![&key("parks", 1)]);
        assert_eq!(
            engine
                .feature_state(&target("parks", 1))
                .and_then(|state| state.get(SELECTED_STATE)),
            Some(&json!(true))
        );

        let events = manager.unregister(&mut engine, &layers);
        let types: Vec<_> = events.iter().map(InteractionEvent::event_type).collect();
        assert_eq!(types, vec!["features-batch-deselected"]);
        assert!(manager.selected().is_empty());
        assert!(engine
            .feature_state(&target("parks", 1))
            .is_some_and(|state| state.is_empty()));
    }

    #[test]
    fn select_by_identity_uses_source_features() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![rendered("wards", GeometryKind::Line, Some(4), point())]);

        let identity = FeatureIdentity::Id(FeatureId::Number(4));
        let events = manager.select_by_identity(&mut engine, "wards", &identity);
        assert_matches!(
            &events[0],
            InteractionEvent::FeatureClick { feature } if feature.layer_id == "wards-fill"
        );
    }

    #[test]
    fn deselect_and_cleanup() {
        let (mut engine, mut manager) = setup();
        engine.set_rendered_features(vec![rendered("parks", GeometryKind::Fill, Some(1), point())]);
        manager.clicked(&mut engine, ScreenPoint::default(), None);

        let events = manager.deselect(&mut engine, &key("parks", 1));
        assert_matches!(&events[0], InteractionEvent::FeatureDeselected { key: k } if *k == key("parks", 1));
        assert!(manager.deselect(&mut engine, &key("parks", 1)).is_empty());

        assert_eq!(manager.cleanup(&mut engine), vec![InteractionEvent::Cleanup]);
        assert!(manager.layers().is_empty());
        assert!(!engine.is_subscribed("wards-line"));
    }
}
