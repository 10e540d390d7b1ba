//! Mapconf is a layer configuration engine for web maps. The visual content of a map (vector
//! tiles, raster tiles, GeoJSON and CSV overlays, georeferenced images, base style switches and
//! terrain) is declared in a JSON [`ConfigDocument`](mapconf_types::ConfigDocument) instead of
//! being coded against a map library.
//!
//! # Main components
//!
//! * [`style`] splits the flat style bag of a layer group into paint and layout properties of
//!   every engine layer kind and merges it with the default styles.
//! * [`lifecycle`] creates, shows, hides and removes the engine sources and layers of the
//!   configured groups. Layers are inserted at positions chosen by an
//!   [`InsertionOrderResolver`](order::InsertionOrderResolver), so the stacking order does not
//!   depend on the order the user switched groups on.
//! * [`interaction`] merges the features reported by overlapping layers into logical features and
//!   keeps their hover and selection state.
//! * [`Session`] ties the two together, and the [`EventProcessor`](control::EventProcessor)
//!   feeds it with the events of the engine, the user interface and background tasks.
//!
//! The map renderer is reached only through the [`MapEngine`](engine::MapEngine) trait. The
//! [`InMemoryEngine`](engine::InMemoryEngine) implements it without rendering anything and can
//! be used to check a configuration headless:
//!
//! ```no_run
//! use mapconf::engine::InMemoryEngine;
//! use mapconf::lifecycle::LayerLifecycleManager;
//! use mapconf::mapconf_types::ConfigDocument;
//! use mapconf::Session;
//!
//! let config = ConfigDocument::from_json(r#"{ "groups": [] }"#).unwrap();
//! let mut engine = InMemoryEngine::new();
//! let mut session = Session::new(LayerLifecycleManager::new(config, None));
//! session.start(&mut engine, Some("layers=parks"));
//! println!("{:?}", engine.layer_ids());
//! ```

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

pub(crate) mod async_runtime;
pub mod control;
pub mod data;
pub mod engine;
pub mod error;
pub mod interaction;
pub mod lifecycle;
pub mod loader;
pub mod messenger;
pub mod order;
pub mod platform;
pub mod session;
pub mod style;

pub use control::{EngineEvent, EventProcessor};
pub use error::MapConfError;
pub use messenger::Messenger;
pub use session::{Session, SessionUpdate};

// Reexport mapconf_types
pub use mapconf_types;
