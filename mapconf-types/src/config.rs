//! See [`ConfigDocument`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::descriptor::{GroupKind, LayerGroupDescriptor};
use crate::error::ConfigError;
use crate::query::LayerRequest;

/// Top level configuration document of a map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Ordered list of layer groups. Groups listed first are drawn on top.
    #[serde(default)]
    pub groups: Vec<LayerGroupDescriptor>,
    /// Overrides of the default styles. Has the same structure as the defaults document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Value>,
    /// Popup action definitions. Only used by the presentation layer.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub source_layer_links: Map<String, Value>,
}

impl ConfigDocument {
    /// Parses and validates a configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: Self = serde_json::from_str(json)?;
        document.validate()?;

        Ok(document)
    }

    /// Checks that every group is valid and that group ids are unique, including the ids of the
    /// children of `layer-group` groups.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for group in &self.groups {
            group.validate()?;
            if !ids.insert(group.id.as_str()) {
                return Err(ConfigError::DuplicateId(group.id.clone()));
            }

            if let GroupKind::Choice(choice) = &group.kind {
                for child in &choice.groups {
                    if !ids.insert(child.id.as_str()) {
                        return Err(ConfigError::DuplicateId(child.id.clone()));
                    }
                }
            }
        }

        Ok(())
    }

    /// Returns the group with the given id.
    pub fn group(&self, id: &str) -> Option<&LayerGroupDescriptor> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// Returns the group or the `layer-group` child with the given id.
    pub fn find(&self, id: &str) -> Option<&LayerGroupDescriptor> {
        self.groups.iter().find_map(|group| {
            if group.id == id {
                return Some(group);
            }

            match &group.kind {
                GroupKind::Choice(choice) => choice.groups.iter().find(|child| child.id == id),
                _ => None,
            }
        })
    }

    /// Position of the group in the list.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.groups.iter().position(|group| group.id == id)
    }

    /// Applies the layer requests from a shared link.
    ///
    /// Inline descriptors are added to the document, replacing a top level group with the same
    /// id if there is one. An inline descriptor that would make the document invalid, for
    /// example by reusing the id of a `layer-group` child, is skipped. Returns the ids of the
    /// groups that must be visible initially, in request order. Requested ids that are not
    /// present in the document are skipped.
    pub fn apply_layer_requests(&mut self, requests: Vec<LayerRequest>) -> Vec<String> {
        let mut visible = vec![];
        for request in requests {
            match request {
                LayerRequest::Id(id) => {
                    if self.find(&id).is_some() {
                        visible.push(id);
                    } else {
                        log::warn!("Requested layer group {id:?} is not configured");
                    }
                }
                LayerRequest::Inline(descriptor) => {
                    let id = descriptor.id.clone();
                    let mut groups = self.groups.clone();
                    match self.position(&id) {
                        Some(index) => groups[index] = *descriptor,
                        None => groups.push(*descriptor),
                    }

                    let candidate = ConfigDocument {
                        groups,
                        ..Default::default()
                    };
                    if let Err(err) = candidate.validate() {
                        log::warn!("Skipping requested layer group {id:?}: {err}");
                        continue;
                    }

                    self.groups = candidate.groups;
                    visible.push(id);
                }
            }
        }

        let mut seen = HashSet::new();
        visible.retain(|id| seen.insert(id.clone()));
        visible
    }

    /// Ids of the groups marked as initially checked.
    pub fn initially_checked(&self) -> Vec<String> {
        self.groups
            .iter()
            .filter(|group| group.initially_checked)
            .map(|group| group.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const CONFIG: &str = r##"{
        "groups": [
            { "id": "parks", "type": "geojson", "url": "parks.geojson", "initiallyChecked": true,
              "style": { "fill-color": "#2ca02c", "fill-opacity": 0.5 } },
            { "id": "roads", "type": "vector", "url": "roads.json", "sourceLayer": "roads" },
            { "id": "wards", "type": "geojson", "url": "wards.geojson", "initiallyChecked": true }
        ],
        "styles": { "vector": { "fill": { "fill-color": "#ff0000" } } }
    }"##;

    #[test]
    fn parse_document() {
        let document = ConfigDocument::from_json(CONFIG).unwrap();
        assert_eq!(document.groups.len(), 3);
        assert_eq!(document.position("wards"), Some(2));
        assert!(document.styles.is_some());
        assert_eq!(document.initially_checked(), vec!["parks", "wards"]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = ConfigDocument::from_json(
            r#"{ "groups": [
                { "id": "a", "type": "raster", "url": "x" },
                { "id": "a", "type": "raster", "url": "y" }
            ] }"#,
        );

        assert_matches!(result, Err(ConfigError::DuplicateId(id)) if id == "a");
    }

    #[test]
    fn duplicate_child_ids_are_rejected() {
        let result = ConfigDocument::from_json(
            r#"{ "groups": [
                { "id": "a", "type": "raster", "url": "x" },
                { "id": "b", "type": "layer-group", "groups": [
                    { "id": "a", "type": "raster", "url": "y" }
                ] }
            ] }"#,
        );

        assert_matches!(result, Err(ConfigError::DuplicateId(id)) if id == "a");
    }

    #[test]
    fn layer_requests_select_and_inject_groups() {
        let mut document = ConfigDocument::from_json(CONFIG).unwrap();
        let inline: LayerGroupDescriptor =
            serde_json::from_str(r#"{ "id": "adhoc", "type": "raster", "url": "t/{z}/{x}/{y}" }"#)
                .unwrap();

        let visible = document.apply_layer_requests(vec![
            LayerRequest::Id("parks".into()),
            LayerRequest::Id("missing".into()),
            LayerRequest::Inline(Box::new(inline)),
        ]);

        assert_eq!(visible, vec!["parks", "adhoc"]);
        assert_eq!(document.groups.len(), 4);
        assert!(document.group("adhoc").is_some());
    }

    const BASEMAPS: &str = r#"{ "groups": [
        { "id": "parks", "type": "geojson", "url": "parks.geojson" },
        { "id": "basemaps", "type": "layer-group", "groups": [
            { "id": "sat", "type": "raster", "url": "s/{z}/{x}/{y}" },
            { "id": "topo", "type": "raster", "url": "t/{z}/{x}/{y}" }
        ] }
    ] }"#;

    #[test]
    fn layer_requests_accept_choice_children() {
        let mut document = ConfigDocument::from_json(BASEMAPS).unwrap();
        let visible = document.apply_layer_requests(vec![LayerRequest::Id("topo".into())]);

        assert_eq!(visible, vec!["topo"]);
        assert_eq!(document.find("topo").map(|g| g.id.as_str()), Some("topo"));
        assert!(document.group("topo").is_none());
    }

    #[test]
    fn colliding_inline_groups_are_skipped() {
        let mut document = ConfigDocument::from_json(BASEMAPS).unwrap();
        let same_as_child: LayerGroupDescriptor =
            serde_json::from_str(r#"{ "id": "sat", "type": "raster", "url": "x/{z}/{x}/{y}" }"#)
                .unwrap();
        let child_collides: LayerGroupDescriptor = serde_json::from_str(
            r#"{ "id": "extra", "type": "layer-group", "groups": [
                { "id": "parks", "type": "raster", "url": "p/{z}/{x}/{y}" }
            ] }"#,
        )
        .unwrap();
        let replacement: LayerGroupDescriptor =
            serde_json::from_str(r#"{ "id": "parks", "type": "raster", "url": "p/{z}/{x}/{y}" }"#)
                .unwrap();

        let visible = document.apply_layer_requests(vec![
            LayerRequest::Inline(Box::new(same_as_child)),
            LayerRequest::Inline(Box::new(child_collides)),
            LayerRequest::Inline(Box::new(replacement)),
        ]);

        assert_eq!(visible, vec!["parks"]);
        assert_eq!(document.groups.len(), 2);
        assert_matches!(document.group("parks").map(|g| &g.kind), Some(GroupKind::Raster(_)));
        assert!(document.validate().is_ok());
    }
}
