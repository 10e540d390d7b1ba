//! Reading the initial map state from the page query string.
//!
//! The `layers` parameter is a comma separated list. Each entry is either an id of a configured
//! group or a minified JSON descriptor of a group that is not part of the configuration:
//!
//! ```text
//! ?layers=parks,roads,{"id":"adhoc","type":"raster","url":"https://t/{z}/{x}/{y}.png"}
//! ```

use url::form_urlencoded;

use crate::descriptor::LayerGroupDescriptor;
use crate::error::ConfigError;

/// Name of the query parameter with the list of visible layers.
pub const LAYERS_PARAM: &str = "layers";
/// Name of the query parameter with the configuration url or inline document.
pub const CONFIG_PARAM: &str = "config";

/// One entry of the `layers` query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerRequest {
    /// Show a configured group.
    Id(String),
    /// Add a group that is not present in the configuration and show it.
    Inline(Box<LayerGroupDescriptor>),
}

/// Returns the value of a query parameter. The query may start with `?`.
pub fn query_param(query: &str, name: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Reads the `layers` parameter from the query string.
///
/// Returns `None` if the parameter is absent, so that the caller can fall back to the
/// `initiallyChecked` flags of the configuration.
pub fn layers_from_query(query: &str) -> Option<Vec<LayerRequest>> {
    query_param(query, LAYERS_PARAM).map(|value| parse_layers(&value))
}

/// Parses the value of the `layers` parameter. Invalid inline descriptors are logged and skipped.
pub fn parse_layers(value: &str) -> Vec<LayerRequest> {
    split_top_level(value)
        .into_iter()
        .filter_map(|entry| match parse_entry(entry) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("Skipping layer request {entry:?}: {err}");
                None
            }
        })
        .collect()
}

fn parse_entry(entry: &str) -> Result<Option<LayerRequest>, ConfigError> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Ok(None);
    }

    if !entry.starts_with('{') {
        return Ok(Some(LayerRequest::Id(entry.to_string())));
    }

    let descriptor: LayerGroupDescriptor = serde_json::from_str(entry)?;
    descriptor.validate()?;

    Ok(Some(LayerRequest::Inline(Box::new(descriptor))))
}

/// Splits on commas that are not inside JSON objects, arrays or strings.
fn split_top_level(value: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;

    for (index, ch) in value.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }

    parts.push(&value[start..]);
    parts
}
