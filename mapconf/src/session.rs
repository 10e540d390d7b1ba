//! Map session tying the layer lifecycle to feature interaction.

use mapconf_types::query::layers_from_query;
use mapconf_types::{ConfigDocument, LayerGroupDescriptor, LngLat};
use serde_json::Value;

use crate::engine::{MapEngine, ScreenPoint};
use crate::error::MapConfError;
use crate::interaction::{
    FeatureIdentity, FeatureInteractionManager, InteractionEvent, LogicalFeatureKey,
};
use crate::lifecycle::{FetchRequest, FetchTicket, LayerLifecycleManager, TransitionReport};

/// Effects of a session operation the host must carry out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    /// Documents to load and hand back with [`Session::complete_fetch`].
    pub fetches: Vec<FetchRequest>,
    /// Interaction events for the presentation layer, in emission order.
    pub events: Vec<InteractionEvent>,
}

impl SessionUpdate {
    fn events(events: Vec<InteractionEvent>) -> Self {
        Self {
            fetches: vec![],
            events,
        }
    }
}

/// State of one map: which groups are materialised and which features are hovered or
/// selected.
///
/// Every lifecycle change that adds or removes interactive layers is forwarded to the
/// interaction manager, so features of hidden or removed groups never stay hovered or selected.
pub struct Session {
    lifecycle: LayerLifecycleManager,
    interaction: FeatureInteractionManager,
}

impl Session {
    /// Creates a session. Nothing is shown until [`Session::start`] is called.
    pub fn new(lifecycle: LayerLifecycleManager) -> Self {
        Self {
            lifecycle,
            interaction: FeatureInteractionManager::new(),
        }
    }

    /// Layer lifecycle of the session.
    pub fn lifecycle(&self) -> &LayerLifecycleManager {
        &self.lifecycle
    }

    /// Hover and selection state of the session.
    pub fn interaction(&self) -> &FeatureInteractionManager {
        &self.interaction
    }

    /// Shows the initial groups. If the page query string has a `layers` parameter, exactly the
    /// listed groups are shown; otherwise the `initiallyChecked` groups of the configuration.
    pub fn start(&mut self, engine: &mut impl MapEngine, query: Option<&str>) -> SessionUpdate {
        let visible = match query.and_then(layers_from_query) {
            Some(requests) => self.lifecycle.apply_layer_requests(requests),
            None => self.lifecycle.config().initially_checked(),
        };

        log::info!("Starting map session with layers {visible:?}");
        let report = self.lifecycle.load(engine, &visible);
        self.apply(engine, report)
    }

    /// Shows or hides a group.
    pub fn set_visible(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        visible: bool,
    ) -> SessionUpdate {
        let report = self.lifecycle.set_visible(engine, group_id, visible);
        self.apply(engine, report)
    }

    /// Chooses the child shown by a `layer-group` group.
    pub fn select_choice(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        child_id: &str,
    ) -> SessionUpdate {
        let report = self.lifecycle.select_choice(engine, group_id, child_id);
        self.apply(engine, report)
    }

    /// Switches the opacity level of a group. Returns the new multiplier.
    pub fn toggle_opacity(&mut self, engine: &mut impl MapEngine, group_id: &str) -> Option<f64> {
        self.lifecycle.toggle_opacity(engine, group_id)
    }

    /// Sets the filter of a group.
    pub fn set_filter(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        filter: Option<Value>,
    ) -> Result<(), MapConfError> {
        self.lifecycle.set_filter(engine, group_id, filter)
    }

    /// Removes a group with all its engine objects.
    pub fn remove_group(&mut self, engine: &mut impl MapEngine, group_id: &str) -> SessionUpdate {
        let report = self.lifecycle.remove_group(engine, group_id);
        self.apply(engine, report)
    }

    /// Replaces the descriptor of a group with an edited one.
    pub fn replace_group(
        &mut self,
        engine: &mut impl MapEngine,
        descriptor: LayerGroupDescriptor,
    ) -> Result<SessionUpdate, MapConfError> {
        let report = self.lifecycle.replace_group(engine, descriptor)?;
        Ok(self.apply(engine, report))
    }

    /// Replaces the whole configuration.
    pub fn replace_config(
        &mut self,
        engine: &mut impl MapEngine,
        config: ConfigDocument,
    ) -> Result<SessionUpdate, MapConfError> {
        let report = self.lifecycle.replace_config(engine, config)?;
        Ok(self.apply(engine, report))
    }

    /// Applies a loaded document. Returns false if it was stale or unusable.
    pub fn complete_fetch(
        &mut self,
        engine: &mut impl MapEngine,
        ticket: &FetchTicket,
        result: Result<String, MapConfError>,
    ) -> bool {
        self.lifecycle.complete_fetch(engine, ticket, result)
    }

    /// Handles a tick of a refresh timer.
    pub fn refresh_tick(&mut self, engine: &mut impl MapEngine, group_id: &str) -> SessionUpdate {
        let report = self.lifecycle.refresh_tick(engine, group_id);
        self.apply(engine, report)
    }

    /// Pointer moved over the map.
    pub fn pointer_moved(
        &mut self,
        engine: &mut impl MapEngine,
        point: ScreenPoint,
        lng_lat: Option<LngLat>,
    ) -> SessionUpdate {
        SessionUpdate::events(self.interaction.pointer_moved(engine, point, lng_lat))
    }

    /// Pointer left an interactive layer.
    pub fn pointer_left(&mut self, engine: &mut impl MapEngine, layer_id: &str) -> SessionUpdate {
        SessionUpdate::events(self.interaction.pointer_left(engine, layer_id))
    }

    /// The map was clicked.
    pub fn clicked(
        &mut self,
        engine: &mut impl MapEngine,
        point: ScreenPoint,
        lng_lat: Option<LngLat>,
    ) -> SessionUpdate {
        SessionUpdate::events(self.interaction.clicked(engine, point, lng_lat))
    }

    /// Selects a feature of a group by its identity, e.g. from a search result.
    pub fn select_by_identity(
        &mut self,
        engine: &mut impl MapEngine,
        group_id: &str,
        identity: &FeatureIdentity,
    ) -> SessionUpdate {
        SessionUpdate::events(
            self.interaction
                .select_by_identity(engine, group_id, identity),
        )
    }

    /// Deselects one feature.
    pub fn deselect(
        &mut self,
        engine: &mut impl MapEngine,
        key: &LogicalFeatureKey,
    ) -> SessionUpdate {
        SessionUpdate::events(self.interaction.deselect(engine, key))
    }

    /// Deselects all features.
    pub fn clear_selections(&mut self, engine: &mut impl MapEngine) -> SessionUpdate {
        SessionUpdate::events(self.interaction.clear_selections(engine))
    }

    /// Drops all interaction state and removes the engine objects of all groups.
    pub fn shutdown(&mut self, engine: &mut impl MapEngine) -> SessionUpdate {
        let mut events = self.interaction.cleanup(engine);
        let report = self.lifecycle.shutdown(engine);
        let mut update = self.apply(engine, report);

        events.append(&mut update.events);
        update.events = events;
        update
    }

    fn apply(&mut self, engine: &mut impl MapEngine, report: TransitionReport) -> SessionUpdate {
        let mut events = vec![];
        if !report.unregistered.is_empty() {
            events.extend(self.interaction.unregister(engine, &report.unregistered));
        }
        if !report.suspended.is_empty() {
            events.extend(self.interaction.suspend(engine, &report.suspended));
        }

        for layer in report.registered {
            events.extend(self.interaction.register(engine, layer));
        }

        SessionUpdate {
            fetches: report.fetches,
            events,
        }
    }
}
