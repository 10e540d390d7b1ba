use mapconf_types::GeometryKind;

/// Id of the engine source created for a group.
pub fn source_id(group_id: &str) -> String {
    format!("{group_id}-source")
}

/// Id of the engine layer of the given kind created for a group.
pub fn layer_id(group_id: &str, kind: GeometryKind) -> String {
    format!("{group_id}-{}", layer_suffix(kind))
}

fn layer_suffix(kind: GeometryKind) -> &'static str {
    match kind {
        GeometryKind::Symbol => "text",
        kind => kind.as_str(),
    }
}

/// Returns true if the engine layer id is one of the ids [`layer_id`] gives for the group.
///
/// Only the exact kind suffixes match, so `topo-dark-raster` is not a layer of `topo`.
pub fn is_group_layer(layer_id: &str, group_id: &str) -> bool {
    layer_id
        .strip_prefix(group_id)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|suffix| {
            GeometryKind::ALL
                .iter()
                .any(|kind| layer_suffix(*kind) == suffix)
        })
}

/// An engine layer owned by a group.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineLayer {
    /// Engine layer id.
    pub id: String,
    /// Layer kind.
    pub kind: GeometryKind,
}

/// Engine sources and layers currently owned by one group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineLayerSet {
    /// Source ids.
    pub sources: Vec<String>,
    /// Layers, in creation order.
    pub layers: Vec<EngineLayer>,
    /// The group style has fill properties.
    pub has_fill_styles: bool,
    /// The group has an outline layer.
    pub has_line_styles: bool,
    /// The group style has a `text-field`.
    pub has_text_styles: bool,
    /// The group has a circle layer.
    pub has_circle_styles: bool,
}

impl EngineLayerSet {
    /// Returns true if the set owns no engine objects.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.layers.is_empty()
    }

    /// Ids of the owned layers in creation order.
    pub fn layer_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.layers.iter().map(|layer| layer.id.as_str())
    }

    /// The owned layer of the given kind.
    pub fn layer(&self, kind: GeometryKind) -> Option<&EngineLayer> {
        self.layers.iter().find(|layer| layer.kind == kind)
    }
}
