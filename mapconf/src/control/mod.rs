//! Event driven control of a map session.
//!
//! Everything that changes a session arrives as an [`EngineEvent`]:
//! 1. The engine adapter sends pointer events of the interactive layers.
//! 2. The user interface sends toggles, choices and edits of the layer list.
//! 3. Background tasks send loaded documents and ticks of refresh timers.
//!
//! The [`EventProcessor`] applies the events one by one to the [`Session`](crate::session::Session),
//! starts the fetches the session asks for and hands the resulting [`InteractionEvent`]s to the
//! registered [`InteractionListener`]s.

use mapconf_types::{ConfigDocument, LayerGroupDescriptor, LngLat};
use maybe_sync::{MaybeSend, MaybeSync};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::engine::ScreenPoint;
use crate::error::MapConfError;
use crate::interaction::{InteractionEvent, LogicalFeatureKey};
use crate::lifecycle::FetchTicket;

mod event_processor;

pub use event_processor::{EventProcessor, Fetcher, PlatformFetcher};

/// Sending half of the event channel of an [`EventProcessor`].
pub type EventSender = UnboundedSender<EngineEvent>;

/// Receives interaction events of a session.
pub trait InteractionListener {
    /// Handle the event.
    fn on_event(&self, event: &InteractionEvent);
}

impl<T: Fn(&InteractionEvent)> InteractionListener for T
where
    T: MaybeSync + MaybeSend,
{
    fn on_event(&self, event: &InteractionEvent) {
        self(event)
    }
}

/// Input of the event processor.
#[derive(Debug)]
pub enum EngineEvent {
    /// Pointer moved over the map.
    PointerMoved {
        /// Screen position.
        point: ScreenPoint,
        /// Geographic position, if known.
        lng_lat: Option<LngLat>,
    },
    /// The map was clicked.
    Clicked {
        /// Screen position.
        point: ScreenPoint,
        /// Geographic position, if known.
        lng_lat: Option<LngLat>,
    },
    /// Pointer left an interactive layer.
    PointerLeft {
        /// Engine layer id.
        layer_id: String,
    },
    /// A group was checked or unchecked.
    VisibilityToggled {
        /// Group id.
        group_id: String,
        /// New visibility.
        visible: bool,
    },
    /// A child of a `layer-group` group was chosen.
    ChoiceSelected {
        /// Id of the `layer-group` group.
        group_id: String,
        /// Id of the chosen child.
        child_id: String,
    },
    /// The opacity button of a group was pressed.
    OpacityToggled {
        /// Group id.
        group_id: String,
    },
    /// A feature was deselected, e.g. by closing its popup.
    Deselected(LogicalFeatureKey),
    /// All selections were dismissed.
    SelectionsCleared,
    /// An edited descriptor replaces the configured one.
    GroupReplaced(Box<LayerGroupDescriptor>),
    /// A group was removed from the layer list.
    GroupRemoved {
        /// Group id.
        group_id: String,
    },
    /// A new configuration document replaces the current one.
    ConfigReplaced(Box<ConfigDocument>),
    /// A document requested by the session was loaded.
    FetchCompleted {
        /// Ticket of the request.
        ticket: FetchTicket,
        /// Text of the document.
        result: Result<String, MapConfError>,
    },
    /// A refresh timer of a group ticked.
    RefreshTick {
        /// Group id.
        group_id: String,
    },
    /// The map is going away. All engine objects are removed and processing stops.
    Shutdown,
}

/// Creates the channel an [`EventProcessor`] reads from.
///
/// The sender is needed before the processor exists, e.g. to create
/// [`IntervalTimers`](crate::platform::IntervalTimers) for the session.
pub fn event_channel() -> (EventSender, UnboundedReceiver<EngineEvent>) {
    mpsc::unbounded_channel()
}
