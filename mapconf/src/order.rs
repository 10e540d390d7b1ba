//! Placement of new engine layers in the layer stack.
//!
//! Groups listed earlier in the configuration are drawn above the groups listed after them, no
//! matter in which order they were made visible. Labels of every group stay above the geometry
//! layers, and raster overlays stay below the labels of the base map.

use mapconf_types::{GeometryKind, GroupKind, LayerGroupDescriptor};

use crate::engine::StyleLayerInfo;
use crate::lifecycle::{is_group_layer, layer_id};

/// Everything a resolver may need to place one new engine layer.
#[derive(Debug, Clone, Copy)]
pub struct InsertionContext<'a> {
    /// Kind of the group the layer belongs to.
    pub group_kind: &'a GroupKind,
    /// Kind of the new layer.
    pub geometry: GeometryKind,
    /// The group being materialised.
    pub group: &'a LayerGroupDescriptor,
    /// All groups of the configuration, in configuration order.
    pub groups: &'a [LayerGroupDescriptor],
    /// Index of the group (or of its parent choice group) in `groups`.
    pub position: usize,
    /// Layers currently present in the engine, bottom first.
    pub style_layers: &'a [StyleLayerInfo],
}

/// Decides where new engine layers are inserted.
pub trait InsertionOrderResolver {
    /// Id of the engine layer the new layer must be inserted below, or `None` to put the new
    /// layer on top of all layers.
    fn before_layer(&self, context: &InsertionContext<'_>) -> Option<String>;
}

impl<T: Fn(&InsertionContext<'_>) -> Option<String>> InsertionOrderResolver for T {
    fn before_layer(&self, context: &InsertionContext<'_>) -> Option<String> {
        self(context)
    }
}

/// Resolver keeping the configuration order of groups.
#[derive(Debug, Default, Clone, Copy)]
pub struct StackOrderResolver;

const GEOMETRY_ORDER: [GeometryKind; 4] = [
    GeometryKind::Raster,
    GeometryKind::Fill,
    GeometryKind::Line,
    GeometryKind::Circle,
];

impl StackOrderResolver {
    fn exists(context: &InsertionContext<'_>, id: &str) -> bool {
        context.style_layers.iter().any(|layer| layer.id == id)
    }

    fn owner_ids(group: &LayerGroupDescriptor) -> Vec<&str> {
        match &group.kind {
            GroupKind::Choice(choice) => choice.groups.iter().map(|child| child.id.as_str()).collect(),
            _ => vec![group.id.as_str()],
        }
    }

    /// Lowest existing layer of the given kinds among the groups listed above the current one,
    /// looking at the nearest group first.
    fn nearest_above(context: &InsertionContext<'_>, kinds: &[GeometryKind]) -> Option<String> {
        let above = &context.groups[..context.position.min(context.groups.len())];
        above.iter().rev().find_map(|group| {
            Self::owner_ids(group).into_iter().find_map(|owner| {
                kinds
                    .iter()
                    .map(|kind| layer_id(owner, *kind))
                    .find(|id| Self::exists(context, id))
            })
        })
    }

    fn is_managed(context: &InsertionContext<'_>, id: &str) -> bool {
        context.groups.iter().any(|group| {
            Self::owner_ids(group)
                .into_iter()
                .any(|owner| is_group_layer(id, owner))
        })
    }

    fn first_managed_label(context: &InsertionContext<'_>) -> Option<String> {
        context
            .style_layers
            .iter()
            .find(|layer| {
                layer.kind == GeometryKind::Symbol && Self::is_managed(context, &layer.id)
            })
            .map(|layer| layer.id.clone())
    }

    fn first_base_label(context: &InsertionContext<'_>) -> Option<String> {
        context
            .style_layers
            .iter()
            .find(|layer| {
                layer.kind == GeometryKind::Symbol && !Self::is_managed(context, &layer.id)
            })
            .map(|layer| layer.id.clone())
    }
}

impl InsertionOrderResolver for StackOrderResolver {
    fn before_layer(&self, context: &InsertionContext<'_>) -> Option<String> {
        match context.geometry {
            GeometryKind::Symbol => Self::nearest_above(context, &[GeometryKind::Symbol]),
            GeometryKind::Raster => Self::nearest_above(context, &GEOMETRY_ORDER)
                .or_else(|| Self::first_base_label(context))
                .or_else(|| Self::first_managed_label(context)),
            _ => Self::nearest_above(context, &GEOMETRY_ORDER)
                .or_else(|| Self::first_managed_label(context)),
        }
    }
}
