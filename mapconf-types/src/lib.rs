//! Data model of the `mapconf` layer configuration engine.
//!
//! A map configuration is a [`ConfigDocument`] with an ordered list of
//! [`LayerGroupDescriptor`]s. Each descriptor declares one overlay: where its data comes from
//! ([`GroupKind`]), how it is styled and whether it is visible when the map loads.
//!
//! This crate only describes configurations. Turning them into sources and layers of a map
//! engine is done by the `mapconf` crate.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod geo;
pub mod geometry_kind;
pub mod query;

pub use config::ConfigDocument;
pub use descriptor::{GroupKind, Inspect, LayerGroupDescriptor, StyleBag};
pub use geo::{GeoBounds, LngLat};
pub use geometry_kind::GeometryKind;
pub use query::LayerRequest;
