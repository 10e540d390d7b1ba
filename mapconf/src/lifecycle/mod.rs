//! Lifecycle of the engine sources and layers created for layer groups.
//!
//! Every group is in one of three states ([`GroupState`]). The first time a group becomes
//! visible its source and layers are created. Hiding and showing it again only switches the
//! layout visibility of the created layers. The engine objects are removed only when the group
//! is removed from the configuration or replaced by an edited descriptor.
//!
//! `layer-group`, `style` and `terrain` groups never create engine objects. A `layer-group`
//! shows exactly one of its children, a `style` group switches layers of the base map style and
//! a `terrain` group switches the global elevation of the map.

use std::collections::HashMap;

use mapconf_types::descriptor::{ChoiceGroup, StyleReferences, TerrainSettings};
use mapconf_types::{ConfigDocument, GeometryKind, GroupKind, LayerGroupDescriptor, LayerRequest};
use serde_json::{json, Value};

use crate::data::{cache_busted, csv_points, now_millis};
use crate::engine::{MapEngine, StyleLayerInfo, TerrainSpec};
use crate::error::MapConfError;
use crate::interaction::InteractiveLayer;
use crate::order::{InsertionContext, InsertionOrderResolver, StackOrderResolver};
use crate::style::{classify, resolve_defaults, ClassifiedStyle, StyleDefaults, VISIBILITY};

mod builders;
mod fetch;
mod layer_set;
mod opacity;
pub(crate) mod refresh;

pub use builders::{plan_layers, source_spec, Families, PlannedLayer};
pub use fetch::{FetchRequest, FetchTicket};
pub use layer_set::{is_group_layer, layer_id, source_id, EngineLayer, EngineLayerSet};
pub use opacity::{opacity_property, OpacityBase, OpacityState, DIMMED_FACTOR, RAISED_FACTOR};
pub use refresh::{NoTimers, RefreshTimers, TimerHandle, TimerService};

/// Lifecycle state of a layer group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GroupState {
    /// No engine objects exist for the group.
    #[default]
    Absent,
    /// The group is shown.
    Visible,
    /// The engine objects exist but are hidden.
    Hidden,
}

/// Side effects of a lifecycle operation the caller must carry out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionReport {
    /// Documents to load and hand back with [`LayerLifecycleManager::complete_fetch`].
    pub fetches: Vec<FetchRequest>,
    /// Layers that became interactive.
    pub registered: Vec<InteractiveLayer>,
    /// Layers that were hidden. They stop receiving pointer events, but the state of their
    /// features is kept.
    pub suspended: Vec<String>,
    /// Layers that were removed from the engine.
    pub unregistered: Vec<String>,
}

impl TransitionReport {
    /// Appends the effects of another operation.
    pub fn merge(&mut self, other: TransitionReport) {
        self.fetches.extend(other.fetches);
        self.registered.extend(other.registered);
        self.suspended.extend(other.suspended);
        self.unregistered.extend(other.unregistered);
    }

    /// Returns true if there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
            && self.registered.is_empty()
            && self.suspended.is_empty()
            && self.unregistered.is_empty()
    }
}

#[derive(Debug, Default)]
struct GroupEntry {
    state: GroupState,
    layers: EngineLayerSet,
    generation: u64,
    selected_child: Option<String>,
    opacity: OpacityState,
    loaded: bool,
}

/// A descriptor with its place in the configuration.
struct Located {
    descriptor: LayerGroupDescriptor,
    position: usize,
    parent: Option<String>,
}

/// Keeps the engine in sync with the visibility of the configured layer groups.
pub struct LayerLifecycleManager {
    config: ConfigDocument,
    defaults_document: Option<Value>,
    defaults: StyleDefaults,
    resolver: Box<dyn InsertionOrderResolver>,
    entries: HashMap<String, GroupEntry>,
    timers: RefreshTimers,
    generation: u64,
}

impl LayerLifecycleManager {
    /// Creates a manager for the configuration. `defaults_document` is the loaded default styles
    /// document, if there is one.
    pub fn new(config: ConfigDocument, defaults_document: Option<Value>) -> Self {
        let defaults = resolve_defaults(defaults_document.as_ref(), config.styles.as_ref());
        Self {
            config,
            defaults_document,
            defaults,
            resolver: Box::new(StackOrderResolver),
            entries: HashMap::new(),
            timers: RefreshTimers::new(Box::new(NoTimers)),
            generation: 0,
        }
    }

    /// Replaces the insertion order resolver.
    pub fn with_resolver(mut self, resolver: impl InsertionOrderResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replaces the service starting refresh timers.
    pub fn with_timers(mut self, service: impl TimerService + 'static) -> Self {
        self.timers = RefreshTimers::new(Box::new(service));
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &ConfigDocument {
        &self.config
    }

    /// Resolved default styles.
    pub fn defaults(&self) -> &StyleDefaults {
        &self.defaults
    }

    /// Lifecycle state of the group.
    pub fn state(&self, group_id: &str) -> GroupState {
        self.entries
            .get(group_id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    /// Engine objects owned by the group.
    pub fn layer_set(&self, group_id: &str) -> Option<&EngineLayerSet> {
        self.entries.get(group_id).map(|entry| &entry.layers)
    }

    /// Opacity toggle state of the group.
    pub fn opacity(&self, group_id: &str) -> Option<&OpacityState> {
        self.entries.get(group_id).map(|entry| &entry.opacity)
    }

    /// Child currently chosen in a `layer-group` group.
    pub fn selected_child(&self, group_id: &str) -> Option<&str> {
        self.entries
            .get(group_id)
            .and_then(|entry| entry.selected_child.as_deref())
    }

    /// Returns true if the group has a running refresh timer.
    pub fn is_refreshing(&self, group_id: &str) -> bool {
        self.timers.is_running(group_id)
    }

    /// Adds the inline groups of the `layers` query parameter to the configuration. Returns the
    /// ids of the requested groups that exist, in request order.
    pub fn apply_layer_requests(&mut self, requests: Vec<LayerRequest>) -> Vec<String> {
        self.config.apply_layer_requests(requests)
    }

    /// Shows the given groups. `style` groups not in the list are hidden, since their layers
    /// are part of the base style and are visible unless switched off.
    pub fn load(&mut self, engine: &mut impl MapEngine, visible: &[String]) -> TransitionReport {
        let mut report = TransitionReport::default();
        for group_id in visible {
            report.merge(self.set_visible(engine, group_id, true));
        }

        let passthrough: Vec<String> = self
            .config
            .groups
            .iter()
            .filter(|group| matches!(group.kind, GroupKind::StylePassthrough(_)))
            .filter(|group| !visible.contains(&group.id))
            .map(|group| group.id.clone())
            .collect();
        for group_id in passthrough {
            report.merge(self.set_visible(engine, &group_id, false));
        }

        report
    }

    /// Shows or hides a group. Unknown and invalid groups are logged and skipped.
    ///
    /// Showing a child of a `layer-group` selects it and shows its parent.
    pub fn set_visible(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        visible: bool,
    ) -> TransitionReport {
        let mut report = TransitionReport::default();
        let Some(located) = self.locate(group_id) else {
            log::warn!("Layer group {group_id} is not configured");
            return report;
        };

        if let Err(err) = located.descriptor.validate() {
            log::warn!("Skipping layer group {group_id}: {err}");
            return report;
        }

        if let (true, Some(parent)) = (visible, &located.parent) {
            self.entries.entry(parent.clone()).or_default().selected_child =
                Some(group_id.to_string());
            return self.set_visible(engine, parent, true);
        }

        self.apply_visibility(engine, &located, visible, &mut report);
        report
    }

    /// Removes the group from the configuration together with all its engine objects.
    pub fn remove_group(&mut self, engine: &mut impl MapEngine, group_id: &str) -> TransitionReport {
        let mut report = TransitionReport::default();
        let Some(located) = self.locate(group_id) else {
            log::warn!("Layer group {group_id} is not configured");
            return report;
        };

        self.teardown(engine, &located, &mut report);
        match &located.parent {
            None => self.config.groups.retain(|group| group.id != group_id),
            Some(parent) => {
                if let Some(choice) = self.choice_mut(parent) {
                    choice.groups.retain(|child| child.id != group_id);
                }
            }
        }

        log::info!("Removed layer group {group_id}");
        report
    }

    /// Replaces the descriptor of a configured group with an edited one. The engine objects of
    /// the old descriptor are removed before the new ones are created.
    pub fn replace_group(
        &mut self,
        engine: &mut impl MapEngine,
        descriptor: LayerGroupDescriptor,
    ) -> Result<TransitionReport, MapConfError> {
        descriptor.validate()?;
        let Some(located) = self.locate(&descriptor.id) else {
            return Err(MapConfError::NotFound);
        };

        let group_id = descriptor.id.clone();
        let was_visible = self.state(&group_id) == GroupState::Visible;

        let mut report = TransitionReport::default();
        self.teardown(engine, &located, &mut report);

        let slot = match &located.parent {
            None => self.config.groups.iter_mut().find(|group| group.id == group_id),
            Some(parent) => self
                .choice_mut(parent)
                .and_then(|choice| choice.groups.iter_mut().find(|child| child.id == group_id)),
        };
        if let Some(slot) = slot {
            *slot = descriptor;
        }

        if was_visible {
            report.merge(self.set_visible(engine, &group_id, true));
        }

        log::info!("Replaced layer group {group_id}");
        Ok(report)
    }

    /// Replaces the whole configuration. All groups are torn down and the initially checked
    /// groups of the new configuration are shown.
    pub fn replace_config(
        &mut self,
        engine: &mut impl MapEngine,
        config: ConfigDocument,
    ) -> Result<TransitionReport, MapConfError> {
        config.validate()?;

        let mut report = self.shutdown(engine);
        self.defaults = resolve_defaults(self.defaults_document.as_ref(), config.styles.as_ref());
        self.config = config;

        let visible = self.config.initially_checked();
        report.merge(self.load(engine, &visible));
        Ok(report)
    }

    /// Removes the engine objects of all groups. The configuration is kept.
    pub fn shutdown(&mut self, engine: &mut impl MapEngine) -> TransitionReport {
        let mut report = TransitionReport::default();
        let ids: Vec<String> = self.config.groups.iter().map(|g| g.id.clone()).collect();
        for group_id in ids {
            if let Some(located) = self.locate(&group_id) {
                self.teardown(engine, &located, &mut report);
            }
        }

        self.timers.stop_all();
        report
    }

    /// Switches the opacity of the group layers to the next level. Returns the new multiplier, or
    /// `None` if the group has no layers.
    pub fn toggle_opacity(&mut self, engine: &mut impl MapEngine, group_id: &str) -> Option<f64> {
        let entry = self.entries.get_mut(group_id)?;
        if let Some(child) = entry.selected_child.clone() {
            return self.toggle_opacity(engine, &child);
        }

        if entry.state == GroupState::Absent || entry.opacity.bases().is_empty() {
            log::debug!("Layer group {group_id} has no layers to change the opacity of");
            return None;
        }

        let factor = entry.opacity.toggle();
        for (layer_id, property, value) in entry.opacity.applied() {
            if let Err(err) = engine.set_paint_property(layer_id, property, json!(value)) {
                log::warn!("Failed to set {property} of {layer_id}: {err}");
            }
        }

        Some(factor)
    }

    /// Chooses the child shown by a `layer-group` group. If the group is visible, the child is
    /// shown and all its siblings are hidden.
    pub fn select_choice(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        child_id: &str,
    ) -> TransitionReport {
        let mut report = TransitionReport::default();
        let Some(located) = self.locate(group_id) else {
            log::warn!("Layer group {group_id} is not configured");
            return report;
        };

        let GroupKind::Choice(choice) = &located.descriptor.kind else {
            log::warn!("Layer group {group_id} is not a layer-group");
            return report;
        };

        if !choice.groups.iter().any(|child| child.id == child_id) {
            log::warn!("Layer group {group_id} has no child {child_id}");
            return report;
        }

        let entry = self.entries.entry(group_id.to_string()).or_default();
        entry.selected_child = Some(child_id.to_string());
        if entry.state == GroupState::Visible {
            self.show_choice_child(engine, &located, choice, child_id, &mut report);
        }

        report
    }

    /// Sets the filter of the group and of all its existing layers.
    pub fn set_filter(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        filter: Option<Value>,
    ) -> Result<(), MapConfError> {
        let Some(located) = self.locate(group_id) else {
            return Err(MapConfError::NotFound);
        };

        let descriptor = match &located.parent {
            None => self.config.groups.iter_mut().find(|group| group.id == group_id),
            Some(parent) => self
                .choice_mut(parent)
                .and_then(|choice| choice.groups.iter_mut().find(|child| child.id == group_id)),
        };
        if let Some(descriptor) = descriptor {
            descriptor.filter = filter.clone();
        }

        if let Some(entry) = self.entries.get(group_id) {
            for layer in entry.layers.layers.iter().filter(|l| l.kind != GeometryKind::Raster) {
                if let Err(err) = engine.set_filter(&layer.id, filter.clone()) {
                    log::warn!("Failed to set filter of {}: {err}", layer.id);
                }
            }
        }

        Ok(())
    }

    /// Applies a loaded document to the source of the group it was requested for. Returns false
    /// if the completion is stale (the group was removed, replaced or hidden, or its source is
    /// gone) or the document cannot be used.
    pub fn complete_fetch(
        &mut self,
        engine: &mut impl MapEngine,
        ticket: &FetchTicket,
        result: Result<String, MapConfError>,
    ) -> bool {
        let group_id = &ticket.group_id;
        let Some(entry) = self.entries.get_mut(group_id) else {
            log::debug!("Ignoring data of removed layer group {group_id}");
            return false;
        };

        if entry.generation != ticket.generation || entry.state != GroupState::Visible {
            log::debug!("Ignoring stale data of layer group {group_id}");
            return false;
        }

        let source = source_id(group_id);
        if !engine.has_source(&source) {
            log::debug!("Source of layer group {group_id} does not exist anymore");
            return false;
        }

        let text = match result {
            Ok(text) => text,
            Err(err) => {
                log::warn!("Failed to load data of layer group {group_id}: {err}");
                return false;
            }
        };

        let data = csv_points(&text)
            .and_then(|collection| serde_json::to_value(collection).map_err(MapConfError::from));
        let data = match data {
            Ok(data) => data,
            Err(err) => {
                log::warn!("Failed to read data of layer group {group_id}: {err}");
                return false;
            }
        };

        if let Err(err) = engine.set_source_data(&source, data) {
            log::warn!("Failed to update source of layer group {group_id}: {err}");
            return false;
        }

        entry.loaded = true;
        true
    }

    /// Handles a tick of the refresh timer of a group: CSV groups are loaded again and image
    /// groups are pointed to a fresh url.
    pub fn refresh_tick(&mut self, engine: &mut impl MapEngine, group_id: &str) -> TransitionReport {
        let mut report = TransitionReport::default();
        let generation = match self.entries.get(group_id) {
            Some(entry) if entry.state == GroupState::Visible => entry.generation,
            _ => {
                log::debug!("Skipping refresh of hidden layer group {group_id}");
                return report;
            }
        };

        let Some(located) = self.locate(group_id) else {
            return report;
        };

        match &located.descriptor.kind {
            GroupKind::Csv(source) => report.fetches.push(FetchRequest {
                ticket: FetchTicket {
                    group_id: group_id.to_string(),
                    generation,
                },
                url: cache_busted(&source.url, now_millis()),
            }),
            GroupKind::Image(source) => {
                let url = cache_busted(&source.url, now_millis());
                if let Err(err) = engine.set_image_url(&source_id(group_id), &url) {
                    log::warn!("Failed to refresh image of layer group {group_id}: {err}");
                }
            }
            kind => log::debug!("Layer groups of type {} are not refreshed", kind.type_name()),
        }

        report
    }

    fn locate(&self, group_id: &str) -> Option<Located> {
        for (position, group) in self.config.groups.iter().enumerate() {
            if group.id == group_id {
                return Some(Located {
                    descriptor: group.clone(),
                    position,
                    parent: None,
                });
            }

            if let GroupKind::Choice(choice) = &group.kind {
                if let Some(child) = choice.groups.iter().find(|child| child.id == group_id) {
                    return Some(Located {
                        descriptor: child.clone(),
                        position,
                        parent: Some(group.id.clone()),
                    });
                }
            }
        }

        None
    }

    /// Returns true if the engine layer was created by one of the managed groups.
    fn is_owned(&self, layer_id: &str) -> bool {
        self.entries
            .values()
            .any(|entry| entry.layers.layer_ids().any(|id| id == layer_id))
    }

    fn choice_mut(&mut self, group_id: &str) -> Option<&mut ChoiceGroup> {
        self.config
            .groups
            .iter_mut()
            .find(|group| group.id == group_id)
            .and_then(|group| match &mut group.kind {
                GroupKind::Choice(choice) => Some(choice),
                _ => None,
            })
    }

    fn apply_visibility(
        &mut self,
        engine: &mut impl MapEngine,
        located: &Located,
        visible: bool,
        report: &mut TransitionReport,
    ) {
        let descriptor = &located.descriptor;
        match &descriptor.kind {
            GroupKind::Choice(choice) => {
                self.set_choice_visible(engine, located, choice, visible, report)
            }
            GroupKind::StylePassthrough(references) => {
                self.set_passthrough_visible(engine, descriptor, references, visible)
            }
            GroupKind::Terrain(settings) => {
                self.set_terrain_visible(engine, &descriptor.id, settings, visible)
            }
            GroupKind::Vector(_)
            | GroupKind::Tms(_)
            | GroupKind::Raster(_)
            | GroupKind::Geojson(_)
            | GroupKind::Csv(_)
            | GroupKind::Image(_) => {
                if visible {
                    self.show(engine, located, report);
                } else {
                    self.hide(engine, descriptor, report);
                }
            }
        }
    }

    fn show(&mut self, engine: &mut impl MapEngine, located: &Located, report: &mut TransitionReport) {
        let descriptor = &located.descriptor;
        match self.state(&descriptor.id) {
            GroupState::Visible => {}
            GroupState::Absent => {
                if let Err(err) = self.materialize(engine, located, report) {
                    log::warn!("Failed to create layer group {}: {err}", descriptor.id);
                    return;
                }
            }
            GroupState::Hidden => {
                let Some(entry) = self.entries.get_mut(&descriptor.id) else {
                    return;
                };

                entry.state = GroupState::Visible;
                for layer_id in entry.layers.layer_ids() {
                    set_layer_visibility(engine, layer_id, true);
                }

                if let GroupKind::Csv(source) = &descriptor.kind {
                    if !entry.loaded {
                        report.fetches.push(FetchRequest {
                            ticket: FetchTicket {
                                group_id: descriptor.id.clone(),
                                generation: entry.generation,
                            },
                            url: source.url.clone(),
                        });
                    }
                }

                report
                    .registered
                    .extend(interactive_layers(descriptor, &entry.layers));
                log::debug!("Showing layer group {}", descriptor.id);
            }
        }

        if let Some(interval) = descriptor.kind.refresh_interval() {
            self.timers.ensure_running(&descriptor.id, interval);
        }
    }

    fn hide(
        &mut self,
        engine: &mut impl MapEngine,
        descriptor: &LayerGroupDescriptor,
        report: &mut TransitionReport,
    ) {
        self.timers.stop(&descriptor.id);

        let Some(entry) = self.entries.get_mut(&descriptor.id) else {
            return;
        };
        if entry.state != GroupState::Visible {
            return;
        }

        entry.state = GroupState::Hidden;
        for layer_id in entry.layers.layer_ids() {
            set_layer_visibility(engine, layer_id, false);
            report.suspended.push(layer_id.to_string());
        }

        log::debug!("Hiding layer group {}", descriptor.id);
    }

    /// Creates the source and layers of the group. Only a failure to create the source fails the
    /// operation; layers the engine rejects are skipped.
    fn materialize(
        &mut self,
        engine: &mut impl MapEngine,
        located: &Located,
        report: &mut TransitionReport,
    ) -> Result<(), MapConfError> {
        let descriptor = &located.descriptor;
        let Some(source) = source_spec(descriptor) else {
            return Err(MapConfError::Generic(format!(
                "layer groups of type {} have no source",
                descriptor.kind.type_name()
            )));
        };

        let source_id = source_id(&descriptor.id);
        engine.add_source(&source_id, source)?;

        self.generation += 1;
        let generation = self.generation;

        let kind_defaults = self
            .defaults
            .for_kind(&descriptor.kind)
            .cloned()
            .unwrap_or_default();
        let families = Families::detect(descriptor, &kind_defaults);

        let mut layers = EngineLayerSet {
            sources: vec![source_id.clone()],
            layers: vec![],
            has_fill_styles: families.fill,
            has_line_styles: families.line,
            has_text_styles: families.text,
            has_circle_styles: families.circle,
        };
        let mut opacity = OpacityState::default();

        for planned in plan_layers(descriptor, &kind_defaults) {
            let id = layer_id(&descriptor.id, planned.kind);
            let style_layers = engine.style_layers();
            let before = self.resolver.before_layer(&InsertionContext {
                group_kind: &descriptor.kind,
                geometry: planned.kind,
                group: descriptor,
                groups: &self.config.groups,
                position: located.position,
                style_layers: &style_layers,
            });

            let spec = builders::layer_spec(descriptor, id.clone(), planned.kind, source_id.clone());
            if let Err(err) = engine.add_layer(spec, before.as_deref()) {
                log::warn!("Failed to add layer {id}: {err}");
                continue;
            }

            apply_style(engine, &id, &planned.style);
            opacity.capture(&id, planned.kind, &planned.style.paint);
            layers.layers.push(EngineLayer {
                id,
                kind: planned.kind,
            });
        }

        let is_csv = matches!(descriptor.kind, GroupKind::Csv(_));
        if let GroupKind::Csv(source) = &descriptor.kind {
            report.fetches.push(FetchRequest {
                ticket: FetchTicket {
                    group_id: descriptor.id.clone(),
                    generation,
                },
                url: source.url.clone(),
            });
        }

        report
            .registered
            .extend(interactive_layers(descriptor, &layers));
        log::info!(
            "Created layer group {} with layers {:?}",
            descriptor.id,
            layers.layer_ids().collect::<Vec<_>>()
        );

        let entry = self.entries.entry(descriptor.id.clone()).or_default();
        entry.state = GroupState::Visible;
        entry.layers = layers;
        entry.generation = generation;
        entry.opacity = opacity;
        entry.loaded = !is_csv;

        Ok(())
    }

    /// Removes every engine object of the group, layers before sources, and forgets its state.
    fn teardown(
        &mut self,
        engine: &mut impl MapEngine,
        located: &Located,
        report: &mut TransitionReport,
    ) {
        let descriptor = &located.descriptor;
        self.timers.stop(&descriptor.id);

        match &descriptor.kind {
            GroupKind::Choice(choice) => {
                for child in &choice.groups {
                    let child = Located {
                        descriptor: child.clone(),
                        position: located.position,
                        parent: Some(descriptor.id.clone()),
                    };
                    self.teardown(engine, &child, report);
                }
            }
            GroupKind::StylePassthrough(references) => {
                if self.state(&descriptor.id) == GroupState::Visible {
                    self.set_passthrough_visible(engine, descriptor, references, false);
                }
            }
            GroupKind::Terrain(settings) => {
                if self.state(&descriptor.id) == GroupState::Visible {
                    self.set_terrain_visible(engine, &descriptor.id, settings, false);
                }
            }
            _ => {
                if let Some(entry) = self.entries.get(&descriptor.id) {
                    for layer_id in entry.layers.layer_ids() {
                        if let Err(err) = engine.remove_layer(layer_id) {
                            log::warn!("Failed to remove layer {layer_id}: {err}");
                        }
                        report.unregistered.push(layer_id.to_string());
                    }

                    for source in &entry.layers.sources {
                        if let Err(err) = engine.remove_source(source) {
                            log::warn!("Failed to remove source {source}: {err}");
                        }
                    }
                }
            }
        }

        if self.entries.remove(&descriptor.id).is_some() {
            log::debug!("Layer group {} is torn down", descriptor.id);
        }
    }

    fn set_choice_visible(
        &mut self,
        engine: &mut impl MapEngine,
        located: &Located,
        choice: &ChoiceGroup,
        visible: bool,
        report: &mut TransitionReport,
    ) {
        let entry = self.entries.entry(located.descriptor.id.clone()).or_default();
        if visible {
            let selected = entry
                .selected_child
                .take()
                .filter(|id| choice.groups.iter().any(|child| child.id == *id))
                .or_else(|| choice.default_child().map(|child| child.id.clone()));

            entry.state = GroupState::Visible;
            entry.selected_child = selected.clone();
            if let Some(selected) = selected {
                self.show_choice_child(engine, located, choice, &selected, report);
            }
        } else {
            if entry.state == GroupState::Absent {
                return;
            }

            entry.state = GroupState::Hidden;
            for child in &choice.groups {
                let child = Located {
                    descriptor: child.clone(),
                    position: located.position,
                    parent: Some(located.descriptor.id.clone()),
                };
                self.apply_visibility(engine, &child, false, report);
            }
        }
    }

    fn show_choice_child(
        &mut self,
        engine: &mut impl MapEngine,
        located: &Located,
        choice: &ChoiceGroup,
        selected: &str,
        report: &mut TransitionReport,
    ) {
        let children = choice.groups.iter().map(|child| Located {
            descriptor: child.clone(),
            position: located.position,
            parent: Some(located.descriptor.id.clone()),
        });

        let mut chosen = None;
        for child in children {
            if child.descriptor.id == selected {
                chosen = Some(child);
                continue;
            }

            self.apply_visibility(engine, &child, false, report);
            for layer in engine.style_layers() {
                if is_group_layer(&layer.id, &child.descriptor.id) && !self.is_owned(&layer.id) {
                    set_layer_visibility(engine, &layer.id, false);
                }
            }
        }

        let Some(chosen) = chosen else {
            return;
        };

        match chosen.descriptor.validate() {
            Ok(()) => self.apply_visibility(engine, &chosen, true, report),
            Err(err) => log::warn!("Skipping layer group {selected}: {err}"),
        }
    }

    fn set_passthrough_visible(
        &mut self,
        engine: &mut impl MapEngine,
        descriptor: &LayerGroupDescriptor,
        references: &StyleReferences,
        visible: bool,
    ) {
        let matched = referenced_layers(&*engine, references);
        if matched.is_empty() {
            log::warn!(
                "Layer group {} references no layers of the base style",
                descriptor.id
            );
        }

        let entry = self.entries.entry(descriptor.id.clone()).or_default();
        if visible && !entry.loaded {
            for layer in &matched {
                let mut style = classify(&descriptor.style, layer.kind);
                style.layout.remove(VISIBILITY);
                apply_style(engine, &layer.id, &style);
                entry.opacity.capture(&layer.id, layer.kind, &style.paint);
            }

            entry.loaded = true;
        }

        for layer in &matched {
            set_layer_visibility(engine, &layer.id, visible);
        }

        entry.state = if visible {
            GroupState::Visible
        } else {
            GroupState::Hidden
        };
    }

    fn set_terrain_visible(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        settings: &TerrainSettings,
        visible: bool,
    ) {
        let terrain = visible.then(|| TerrainSpec {
            source: settings.source.clone(),
            exaggeration: settings.exaggeration,
        });

        if let Err(err) = engine.set_terrain(terrain) {
            log::warn!("Failed to switch terrain of layer group {group_id}: {err}");
            return;
        }

        if settings.fog.is_some() {
            let fog = if visible { settings.fog.clone() } else { None };
            if let Err(err) = engine.set_fog(fog) {
                log::warn!("Failed to switch fog of layer group {group_id}: {err}");
            }
        }

        let entry = self.entries.entry(group_id.to_string()).or_default();
        entry.state = if visible {
            GroupState::Visible
        } else {
            GroupState::Hidden
        };
    }
}

/// Sets the properties of a layer one by one, so that a property the engine rejects does not
/// prevent the others from being set.
fn apply_style(engine: &mut impl MapEngine, layer_id: &str, style: &ClassifiedStyle) {
    for (name, value) in &style.layout {
        if let Err(err) = engine.set_layout_property(layer_id, name, value.clone()) {
            log::warn!("Failed to set layout property {name} of {layer_id}: {err}");
        }
    }

    for (name, value) in &style.paint {
        if let Err(err) = engine.set_paint_property(layer_id, name, value.clone()) {
            log::warn!("Failed to set paint property {name} of {layer_id}: {err}");
        }
    }
}

fn set_layer_visibility(engine: &mut impl MapEngine, layer_id: &str, visible: bool) {
    let value = if visible { "visible" } else { "none" };
    if let Err(err) = engine.set_layout_property(layer_id, VISIBILITY, json!(value)) {
        log::warn!("Failed to set visibility of {layer_id}: {err}");
    }
}

fn referenced_layers(engine: &impl MapEngine, references: &StyleReferences) -> Vec<StyleLayerInfo> {
    engine
        .style_layers()
        .into_iter()
        .filter(|layer| {
            references.layers.iter().any(|reference| {
                reference.id.as_deref() == Some(layer.id.as_str())
                    || (reference.source_layer.is_some()
                        && reference.source_layer == layer.source_layer)
            })
        })
        .collect()
}

fn interactive_layers(
    descriptor: &LayerGroupDescriptor,
    layers: &EngineLayerSet,
) -> Vec<InteractiveLayer> {
    let Some(source_id) = layers.sources.first() else {
        return vec![];
    };

    if !descriptor.is_interactive() {
        return vec![];
    }

    layers
        .layers
        .iter()
        .filter(|layer| layer.kind != GeometryKind::Raster)
        .map(|layer| InteractiveLayer {
            layer_id: layer.id.clone(),
            group_id: descriptor.id.clone(),
            source_id: source_id.clone(),
            source_layer: descriptor.source_layer().map(str::to_string),
            kind: layer.kind,
            id_field: descriptor.id_field().map(str::to_string),
        })
        .collect()
}
