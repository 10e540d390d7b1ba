use tokio::sync::mpsc::UnboundedReceiver;

use crate::async_runtime;
use crate::control::{event_channel, EngineEvent, EventSender, InteractionListener};
use crate::engine::MapEngine;
use crate::lifecycle::FetchRequest;
use crate::messenger::{CoalescingMessenger, Messenger};
use crate::platform::{self, PlatformService};
use crate::session::{Session, SessionUpdate};

/// Loads documents requested by the session. The result must be sent back as
/// [`EngineEvent::FetchCompleted`].
pub trait Fetcher {
    /// Starts loading the document.
    fn fetch(&self, request: FetchRequest, events: EventSender);
}

impl<T: Fn(FetchRequest, EventSender)> Fetcher for T {
    fn fetch(&self, request: FetchRequest, events: EventSender) {
        self(request, events)
    }
}

/// Loads documents in background tasks with the [`PlatformService`] of the current platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformFetcher;

impl Fetcher for PlatformFetcher {
    fn fetch(&self, request: FetchRequest, events: EventSender) {
        async_runtime::spawn(async move {
            let result = platform::instance().load_text(&request.url).await;
            let completed = EngineEvent::FetchCompleted {
                ticket: request.ticket,
                result,
            };
            if events.send(completed).is_err() {
                log::debug!("Event processor is gone, dropping {}", request.url);
            }
        });
    }
}

/// Applies [`EngineEvent`]s to a session and its engine.
pub struct EventProcessor<E: MapEngine, M: Messenger> {
    engine: E,
    session: Session,
    messenger: CoalescingMessenger<M>,
    listeners: Vec<Box<dyn InteractionListener>>,
    fetcher: Box<dyn Fetcher>,
    sender: EventSender,
    receiver: UnboundedReceiver<EngineEvent>,
    running: bool,
}

impl<E: MapEngine, M: Messenger> EventProcessor<E, M> {
    /// Creates a processor with its own event channel.
    pub fn new(engine: E, session: Session, messenger: M) -> Self {
        let (sender, receiver) = event_channel();
        Self::with_channel(engine, session, messenger, sender, receiver)
    }

    /// Creates a processor reading a channel created with [`event_channel`].
    pub fn with_channel(
        engine: E,
        session: Session,
        messenger: M,
        sender: EventSender,
        receiver: UnboundedReceiver<EngineEvent>,
    ) -> Self {
        Self {
            engine,
            session,
            messenger: CoalescingMessenger::new(messenger),
            listeners: vec![],
            fetcher: Box::new(PlatformFetcher),
            sender,
            receiver,
            running: true,
        }
    }

    /// Replaces the way documents are loaded.
    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Adds a listener for interaction events.
    pub fn add_listener(&mut self, listener: impl InteractionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Sender for events of the engine adapter and the user interface.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// The engine the processor drives.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns false once [`EngineEvent::Shutdown`] was handled.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Must be called after the application drew a frame requested through the messenger.
    pub fn frame_rendered(&self) {
        self.messenger.frame_rendered();
    }

    /// Shows the initial groups. See [`Session::start`].
    pub fn start(&mut self, query: Option<&str>) {
        let update = self.session.start(&mut self.engine, query);
        self.dispatch(update, true);
    }

    /// Handles all events waiting in the channel. Returns the number of handled events.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle(event);
            handled += 1;
        }

        handled
    }

    /// Handles events as they arrive until the session is shut down.
    pub async fn run(&mut self) {
        while self.running {
            match self.receiver.recv().await {
                Some(event) => self.handle(event),
                None => break,
            }
        }
    }

    /// Applies one event.
    pub fn handle(&mut self, event: EngineEvent) {
        if !self.running {
            log::debug!("Ignoring {event:?} after shutdown");
            return;
        }

        let engine = &mut self.engine;
        let session = &mut self.session;
        let (update, changed) = match event {
            EngineEvent::PointerMoved { point, lng_lat } => {
                (session.pointer_moved(engine, point, lng_lat), false)
            }
            EngineEvent::Clicked { point, lng_lat } => {
                (session.clicked(engine, point, lng_lat), false)
            }
            EngineEvent::PointerLeft { layer_id } => (session.pointer_left(engine, &layer_id), false),
            EngineEvent::VisibilityToggled { group_id, visible } => {
                (session.set_visible(engine, &group_id, visible), true)
            }
            EngineEvent::ChoiceSelected { group_id, child_id } => {
                (session.select_choice(engine, &group_id, &child_id), true)
            }
            EngineEvent::OpacityToggled { group_id } => {
                let changed = session.toggle_opacity(engine, &group_id).is_some();
                (SessionUpdate::default(), changed)
            }
            EngineEvent::Deselected(key) => (session.deselect(engine, &key), false),
            EngineEvent::SelectionsCleared => (session.clear_selections(engine), false),
            EngineEvent::GroupReplaced(descriptor) => {
                let group_id = descriptor.id.clone();
                match session.replace_group(engine, *descriptor) {
                    Ok(update) => (update, true),
                    Err(err) => {
                        log::warn!("Failed to replace layer group {group_id}: {err}");
                        (SessionUpdate::default(), false)
                    }
                }
            }
            EngineEvent::GroupRemoved { group_id } => (session.remove_group(engine, &group_id), true),
            EngineEvent::ConfigReplaced(config) => match session.replace_config(engine, *config) {
                Ok(update) => (update, true),
                Err(err) => {
                    log::warn!("Failed to replace configuration: {err}");
                    (SessionUpdate::default(), false)
                }
            },
            EngineEvent::FetchCompleted { ticket, result } => {
                let applied = session.complete_fetch(engine, &ticket, result);
                (SessionUpdate::default(), applied)
            }
            EngineEvent::RefreshTick { group_id } => (session.refresh_tick(engine, &group_id), true),
            EngineEvent::Shutdown => {
                self.running = false;
                (session.shutdown(engine), true)
            }
        };

        self.dispatch(update, changed);
    }

    fn dispatch(&mut self, update: SessionUpdate, changed: bool) {
        for request in update.fetches {
            log::debug!("Loading {} for layer group {}", request.url, request.ticket.group_id);
            self.fetcher.fetch(request, self.sender.clone());
        }

        for event in &update.events {
            for listener in &self.listeners {
                listener.on_event(event);
            }
        }

        if changed || !update.events.is_empty() {
            self.messenger.request_render();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mapconf_types::{ConfigDocument, GeometryKind};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::engine::{FeatureId, InMemoryEngine, RenderedFeature, ScreenPoint, SourceSpec};
    use crate::interaction::InteractionEvent;
    use crate::lifecycle::{GroupState, LayerLifecycleManager};
    use crate::messenger::tests::CountingMessenger;

    const CONFIG: &str = r##"{ "groups": [
        { "id": "wells", "type": "csv", "url": "wells.csv", "initiallyChecked": true },
        { "id": "parks", "type": "geojson", "url": "parks.geojson",
          "inspect": { "title": "name" } }
    ] }"##;

    const WELLS: &str = "name,lat,lon\nSiolim,15.61,73.76\nAldona,15.59,73.87\n";

    fn processor(messenger: CountingMessenger) -> EventProcessor<InMemoryEngine, CountingMessenger> {
        let config = ConfigDocument::from_json(CONFIG).unwrap();
        let session = Session::new(LayerLifecycleManager::new(config, None));

        EventProcessor::new(InMemoryEngine::new(), session, messenger).with_fetcher(
            |request: FetchRequest, events: EventSender| {
                let _ = events.send(EngineEvent::FetchCompleted {
                    ticket: request.ticket,
                    result: Ok(WELLS.to_string()),
                });
            },
        )
    }

    fn feature_count(engine: &InMemoryEngine, source: &str) -> usize {
        match engine.source(source) {
            Some(SourceSpec::Geojson { data, .. }) => {
                data["features"].as_array().map(Vec::len).unwrap_or_default()
            }
            _ => 0,
        }
    }

    #[test]
    fn fetched_csv_fills_source() {
        let mut processor = processor(CountingMessenger::default());
        processor.start(None);
        assert_eq!(feature_count(processor.engine(), "wells-source"), 0);

        assert_eq!(processor.process_pending(), 1);
        assert_eq!(feature_count(processor.engine(), "wells-source"), 2);
    }

    #[test]
    fn listeners_receive_interaction_events() {
        let mut processor = processor(CountingMessenger::default());
        let received = Arc::new(Mutex::new(vec![]));
        let sink = received.clone();
        processor.add_listener(move |event: &InteractionEvent| {
            sink.lock().push(event.event_type());
        });

        processor.handle(EngineEvent::VisibilityToggled {
            group_id: "parks".into(),
            visible: true,
        });
        assert_eq!(
            *received.lock(),
            vec!["layer-registered", "layer-registered"]
        );

        processor.engine.set_rendered_features(vec![RenderedFeature {
            layer_id: "parks-fill".into(),
            kind: GeometryKind::Fill,
            source: "parks-source".into(),
            source_layer: None,
            id: Some(FeatureId::Number(1)),
            properties: Default::default(),
            geometry: Some(json!({ "type": "Point", "coordinates": [73.8, 15.5] })),
        }]);
        processor.handle(EngineEvent::PointerMoved {
            point: ScreenPoint::new(1.0, 1.0),
            lng_lat: None,
        });
        assert_eq!(received.lock().last(), Some(&"feature-hover"));
    }

    #[test]
    fn render_requests_are_coalesced() {
        let messenger = CountingMessenger::default();
        let mut processor = processor(messenger.clone());

        processor.start(None);
        processor.process_pending();
        processor.handle(EngineEvent::VisibilityToggled {
            group_id: "parks".into(),
            visible: true,
        });
        assert_eq!(messenger.count(), 1);

        processor.frame_rendered();
        processor.handle(EngineEvent::OpacityToggled {
            group_id: "parks".into(),
        });
        assert_eq!(messenger.count(), 2);
    }

    #[test]
    fn events_after_shutdown_are_ignored() {
        let mut processor = processor(CountingMessenger::default());
        processor.start(None);

        let sender = processor.sender();
        sender.send(EngineEvent::Shutdown).unwrap();
        sender
            .send(EngineEvent::VisibilityToggled {
                group_id: "parks".into(),
                visible: true,
            })
            .unwrap();

        tokio_test::block_on(processor.run());

        assert!(!processor.is_running());
        assert!(processor.engine().layer_ids().is_empty());
        assert_eq!(processor.session().lifecycle().state("parks"), GroupState::Absent);
    }
}
