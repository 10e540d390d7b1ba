use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use mapconf_types::{GeometryKind, StyleBag};
use serde_json::{Map, Value};

use super::{
    EngineError, FeatureStateTarget, LayerSpec, MapEngine, RenderedFeature, ScreenPoint,
    SourceSpec, StyleLayerInfo, TerrainSpec,
};
use crate::style::{StylePropertyMap, VISIBILITY};

/// A call made to [`InMemoryEngine`]. Only mutating calls are recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// [`MapEngine::add_source`]
    AddSource(String),
    /// [`MapEngine::remove_source`]
    RemoveSource(String),
    /// [`MapEngine::set_source_data`]
    SetSourceData(String),
    /// [`MapEngine::set_image_url`]
    SetImageUrl {
        /// Source id.
        source: String,
        /// New url.
        url: String,
    },
    /// [`MapEngine::add_layer`]
    AddLayer {
        /// Layer id.
        id: String,
        /// Layer the new layer was inserted below.
        before: Option<String>,
    },
    /// [`MapEngine::remove_layer`]
    RemoveLayer(String),
    /// [`MapEngine::set_paint_property`]
    SetPaint {
        /// Layer id.
        layer: String,
        /// Property name.
        name: String,
        /// New value.
        value: Value,
    },
    /// [`MapEngine::set_layout_property`]
    SetLayout {
        /// Layer id.
        layer: String,
        /// Property name.
        name: String,
        /// New value.
        value: Value,
    },
    /// [`MapEngine::set_filter`]
    SetFilter {
        /// Layer id.
        layer: String,
        /// New filter.
        filter: Option<Value>,
    },
    /// [`MapEngine::set_feature_state`]
    SetFeatureState {
        /// Feature address.
        target: FeatureStateTarget,
        /// State merged into the feature state.
        state: Map<String, Value>,
    },
    /// [`MapEngine::remove_feature_state`]
    RemoveFeatureState {
        /// Feature address.
        target: FeatureStateTarget,
        /// Removed key.
        key: Option<String>,
    },
    /// [`MapEngine::subscribe_pointer_events`]
    Subscribe(String),
    /// [`MapEngine::unsubscribe_pointer_events`]
    Unsubscribe(String),
    /// [`MapEngine::set_terrain`]
    SetTerrain(Option<TerrainSpec>),
    /// [`MapEngine::set_fog`]
    SetFog(Option<Value>),
}

/// State of a layer stored in [`InMemoryEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLayer {
    /// Id, kind and source of the layer.
    pub info: StyleLayerInfo,
    /// Current paint properties.
    pub paint: StyleBag,
    /// Current layout properties.
    pub layout: StyleBag,
    /// Current filter.
    pub filter: Option<Value>,
    /// Minimum zoom.
    pub minzoom: Option<f64>,
    /// Maximum zoom.
    pub maxzoom: Option<f64>,
}

impl StoredLayer {
    /// Returns false if the layout visibility of the layer is `none`.
    pub fn is_visible(&self) -> bool {
        self.layout.get(VISIBILITY).and_then(Value::as_str) != Some("none")
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StoredSource {
    spec: SourceSpec,
}

/// Map engine that keeps its sources and layers in memory and draws nothing.
///
/// The engine validates calls the same way a rendering engine does: layers need an existing
/// source, ids must be unique, a source cannot be removed while a layer uses it and properties
/// must be valid for the layer kind. Every mutating call is recorded and can be inspected with
/// [`InMemoryEngine::calls`].
///
/// There is no hit testing. Features returned by pointer queries are set with
/// [`InMemoryEngine::set_rendered_features`] and are reported for any screen point, as long as the
/// layer that rendered them exists and is visible.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    sources: HashMap<String, StoredSource>,
    layers: Vec<StoredLayer>,
    feature_states: HashMap<FeatureStateTarget, Map<String, Value>>,
    subscriptions: HashSet<String>,
    rendered: Vec<RenderedFeature>,
    terrain: Option<TerrainSpec>,
    fog: Option<Value>,
    calls: Vec<EngineCall>,
}

impl InMemoryEngine {
    /// Creates an engine with an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine whose base style contains the given layers, bottom first.
    pub fn with_style_layers(layers: impl IntoIterator<Item = StyleLayerInfo>) -> Self {
        let layers = layers
            .into_iter()
            .map(|info| StoredLayer {
                info,
                paint: StyleBag::new(),
                layout: StyleBag::new(),
                filter: None,
                minzoom: None,
                maxzoom: None,
            })
            .collect();

        Self {
            layers,
            ..Default::default()
        }
    }

    /// Sets the features reported by [`MapEngine::query_rendered_features`] and
    /// [`MapEngine::query_source_features`].
    pub fn set_rendered_features(&mut self, features: Vec<RenderedFeature>) {
        self.rendered = features;
    }

    /// Recorded calls, in call order.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Ids of all layers, bottom first.
    pub fn layer_ids(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.info.id.as_str()).collect()
    }

    /// Ids of all sources, sorted.
    pub fn source_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Returns the layer with the given id.
    pub fn layer(&self, id: &str) -> Option<&StoredLayer> {
        self.layers.iter().find(|layer| layer.info.id == id)
    }

    /// Returns the specification of the source with the given id.
    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id).map(|source| &source.spec)
    }

    /// Current value of a layout property.
    pub fn layout_property(&self, layer_id: &str, name: &str) -> Option<&Value> {
        self.layer(layer_id).and_then(|layer| layer.layout.get(name))
    }

    /// Current value of a paint property.
    pub fn paint_property(&self, layer_id: &str, name: &str) -> Option<&Value> {
        self.layer(layer_id).and_then(|layer| layer.paint.get(name))
    }

    /// State of a feature.
    pub fn feature_state(&self, target: &FeatureStateTarget) -> Option<&Map<String, Value>> {
        self.feature_states.get(target)
    }

    /// Returns true if pointer events of the layer are delivered.
    pub fn is_subscribed(&self, layer_id: &str) -> bool {
        self.subscriptions.contains(layer_id)
    }

    /// Current terrain settings.
    pub fn terrain(&self) -> Option<&TerrainSpec> {
        self.terrain.as_ref()
    }

    /// Current fog.
    pub fn fog(&self) -> Option<&Value> {
        self.fog.as_ref()
    }

    fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.info.id == id)
    }

    fn layer_mut(&mut self, id: &str) -> Result<&mut StoredLayer, EngineError> {
        self.layers
            .iter_mut()
            .find(|layer| layer.info.id == id)
            .ok_or_else(|| EngineError::UnknownLayer(id.into()))
    }

    fn source_mut(&mut self, id: &str) -> Result<&mut StoredSource, EngineError> {
        self.sources
            .get_mut(id)
            .ok_or_else(|| EngineError::UnknownSource(id.into()))
    }

    fn check_property(
        layer: &StoredLayer,
        name: &str,
        is_valid: impl Fn(&StylePropertyMap, &str) -> bool,
    ) -> Result<(), EngineError> {
        if is_valid(&StylePropertyMap::for_kind(layer.info.kind), name) {
            Ok(())
        } else {
            Err(EngineError::InvalidProperty {
                layer_id: layer.info.id.clone(),
                property: name.into(),
            })
        }
    }
}

impl MapEngine for InMemoryEngine {
    fn add_source(&mut self, id: &str, spec: SourceSpec) -> Result<(), EngineError> {
        if self.sources.contains_key(id) {
            return Err(EngineError::DuplicateSource(id.into()));
        }

        self.sources.insert(id.into(), StoredSource { spec });
        self.calls.push(EngineCall::AddSource(id.into()));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), EngineError> {
        if !self.sources.contains_key(id) {
            return Err(EngineError::UnknownSource(id.into()));
        }

        if let Some(layer) = self
            .layers
            .iter()
            .find(|layer| layer.info.source.as_deref() == Some(id))
        {
            return Err(EngineError::SourceInUse {
                source_id: id.into(),
                layer_id: layer.info.id.clone(),
            });
        }

        self.sources.remove(id);
        self.feature_states.retain(|target, _| target.source != id);
        self.calls.push(EngineCall::RemoveSource(id.into()));
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn set_source_data(&mut self, id: &str, data: Value) -> Result<(), EngineError> {
        let source = self.source_mut(id)?;
        let SourceSpec::Geojson { data: current, .. } = &mut source.spec else {
            return Err(EngineError::Rejected(format!(
                "source {id:?} is not a GeoJSON source"
            )));
        };

        *current = data;
        self.calls.push(EngineCall::SetSourceData(id.into()));
        Ok(())
    }

    fn set_image_url(&mut self, id: &str, url: &str) -> Result<(), EngineError> {
        let source = self.source_mut(id)?;
        let SourceSpec::Image { url: current, .. } = &mut source.spec else {
            return Err(EngineError::Rejected(format!(
                "source {id:?} is not an image source"
            )));
        };

        *current = url.into();
        self.calls.push(EngineCall::SetImageUrl {
            source: id.into(),
            url: url.into(),
        });
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec, before: Option<&str>) -> Result<(), EngineError> {
        if self.layer_index(&layer.id).is_some() {
            return Err(EngineError::DuplicateLayer(layer.id));
        }

        if !self.sources.contains_key(&layer.source) {
            return Err(EngineError::UnknownSource(layer.source));
        }

        let index = match before {
            Some(before) => self
                .layer_index(before)
                .ok_or_else(|| EngineError::UnknownLayer(before.into()))?,
            None => self.layers.len(),
        };

        let stored = StoredLayer {
            info: StyleLayerInfo {
                id: layer.id.clone(),
                kind: layer.kind,
                source: Some(layer.source),
                source_layer: layer.source_layer,
            },
            paint: StyleBag::new(),
            layout: StyleBag::new(),
            filter: layer.filter,
            minzoom: layer.minzoom,
            maxzoom: layer.maxzoom,
        };

        for name in layer.paint.keys() {
            Self::check_property(&stored, name, StylePropertyMap::is_paint)?;
        }
        for name in layer.layout.keys() {
            Self::check_property(&stored, name, StylePropertyMap::is_layout)?;
        }

        let stored = StoredLayer {
            paint: layer.paint,
            layout: layer.layout,
            ..stored
        };

        self.layers.insert(index, stored);
        self.calls.push(EngineCall::AddLayer {
            id: layer.id,
            before: before.map(str::to_string),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), EngineError> {
        let index = self
            .layer_index(id)
            .ok_or_else(|| EngineError::UnknownLayer(id.into()))?;

        self.layers.remove(index);
        self.subscriptions.remove(id);
        self.calls.push(EngineCall::RemoveLayer(id.into()));
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layer_index(id).is_some()
    }

    fn set_paint_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        let layer = self.layer_mut(layer_id)?;
        Self::check_property(layer, name, StylePropertyMap::is_paint)?;

        layer.paint.insert(name.into(), value.clone());
        self.calls.push(EngineCall::SetPaint {
            layer: layer_id.into(),
            name: name.into(),
            value,
        });
        Ok(())
    }

    fn set_layout_property(
        &mut self,
        layer_id: &str,
        name: &str,
        value: Value,
    ) -> Result<(), EngineError> {
        let layer = self.layer_mut(layer_id)?;
        Self::check_property(layer, name, StylePropertyMap::is_layout)?;

        layer.layout.insert(name.into(), value.clone());
        self.calls.push(EngineCall::SetLayout {
            layer: layer_id.into(),
            name: name.into(),
            value,
        });
        Ok(())
    }

    fn set_filter(&mut self, layer_id: &str, filter: Option<Value>) -> Result<(), EngineError> {
        let layer = self.layer_mut(layer_id)?;
        layer.filter = filter.clone();

        self.calls.push(EngineCall::SetFilter {
            layer: layer_id.into(),
            filter,
        });
        Ok(())
    }

    fn set_feature_state(
        &mut self,
        target: &FeatureStateTarget,
        state: Map<String, Value>,
    ) -> Result<(), EngineError> {
        if !self.sources.contains_key(&target.source) {
            return Err(EngineError::UnknownSource(target.source.clone()));
        }

        let current = self.feature_states.entry(target.clone()).or_default();
        for (key, value) in &state {
            current.insert(key.clone(), value.clone());
        }

        self.calls.push(EngineCall::SetFeatureState {
            target: target.clone(),
            state,
        });
        Ok(())
    }

    fn remove_feature_state(
        &mut self,
        target: &FeatureStateTarget,
        key: Option<&str>,
    ) -> Result<(), EngineError> {
        if !self.sources.contains_key(&target.source) {
            return Err(EngineError::UnknownSource(target.source.clone()));
        }

        match key {
            Some(key) => {
                if let Some(state) = self.feature_states.get_mut(target) {
                    state.remove(key);
                }
            }
            None => {
                self.feature_states.remove(target);
            }
        }

        self.calls.push(EngineCall::RemoveFeatureState {
            target: target.clone(),
            key: key.map(str::to_string),
        });
        Ok(())
    }

    fn query_rendered_features(
        &self,
        _point: ScreenPoint,
        layers: &[String],
    ) -> Vec<RenderedFeature> {
        let mut features: Vec<(usize, RenderedFeature)> = self
            .rendered
            .iter()
            .filter(|feature| layers.contains(&feature.layer_id))
            .filter_map(|feature| {
                let index = self.layer_index(&feature.layer_id)?;
                self.layers[index]
                    .is_visible()
                    .then(|| (index, feature.clone()))
            })
            .collect();

        features.sort_by_key(|(index, _)| Reverse(*index));
        features.into_iter().map(|(_, feature)| feature).collect()
    }

    fn query_source_features(
        &self,
        source: &str,
        source_layer: Option<&str>,
    ) -> Vec<RenderedFeature> {
        self.rendered
            .iter()
            .filter(|feature| {
                feature.source == source
                    && (source_layer.is_none() || feature.source_layer.as_deref() == source_layer)
            })
            .cloned()
            .collect()
    }

    fn subscribe_pointer_events(&mut self, layer_id: &str) {
        self.subscriptions.insert(layer_id.into());
        self.calls.push(EngineCall::Subscribe(layer_id.into()));
    }

    fn unsubscribe_pointer_events(&mut self, layer_id: &str) {
        self.subscriptions.remove(layer_id);
        self.calls.push(EngineCall::Unsubscribe(layer_id.into()));
    }

    fn style_layers(&self) -> Vec<StyleLayerInfo> {
        self.layers.iter().map(|layer| layer.info.clone()).collect()
    }

    fn set_terrain(&mut self, terrain: Option<TerrainSpec>) -> Result<(), EngineError> {
        if let Some(spec) = &terrain {
            if !self.sources.contains_key(&spec.source) {
                return Err(EngineError::UnknownSource(spec.source.clone()));
            }
        }

        self.terrain = terrain.clone();
        self.calls.push(EngineCall::SetTerrain(terrain));
        Ok(())
    }

    fn set_fog(&mut self, fog: Option<Value>) -> Result<(), EngineError> {
        self.fog = fog.clone();
        self.calls.push(EngineCall::SetFog(fog));
        Ok(())
    }
}

/// Convenience constructor of base style layer descriptions.
pub fn style_layer(
    id: &str,
    kind: GeometryKind,
    source: Option<&str>,
    source_layer: Option<&str>,
) -> StyleLayerInfo {
    StyleLayerInfo {
        id: id.into(),
        kind,
        source: source.map(str::to_string),
        source_layer: source_layer.map(str::to_string),
    }
}
