//! Loading of the configuration and the default styles documents.

use mapconf_types::query::{query_param, CONFIG_PARAM};
use mapconf_types::ConfigDocument;
use serde_json::Value;

use crate::error::MapConfError;
use crate::platform::PlatformService;

/// Path of the configuration loaded when the page does not name one.
pub const DEFAULT_CONFIG_PATH: &str = "config/index.json";
/// Path of the default styles document.
pub const DEFAULTS_PATH: &str = "config/_defaults.json";

/// Where the configuration document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// [`DEFAULT_CONFIG_PATH`].
    Default,
    /// Url given by the operator.
    Url(String),
    /// Document embedded in the page url.
    Inline(String),
}

impl ConfigSource {
    /// Reads the `config` parameter of the page query string. A value starting with `{` is an
    /// inline document, any other non-empty value is a url.
    pub fn from_query(query: &str) -> Self {
        match query_param(query, CONFIG_PARAM) {
            Some(value) if value.trim_start().starts_with('{') => Self::Inline(value),
            Some(value) if !value.trim().is_empty() => Self::Url(value.trim().to_string()),
            _ => Self::Default,
        }
    }

    /// Url the document is loaded from, `None` for inline documents.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Default => Some(DEFAULT_CONFIG_PATH),
            Self::Url(url) => Some(url),
            Self::Inline(_) => None,
        }
    }
}

/// Loads and validates the configuration document.
pub async fn load_config(
    platform: &impl PlatformService,
    source: &ConfigSource,
) -> Result<ConfigDocument, MapConfError> {
    let text = match (source, source.url()) {
        (ConfigSource::Inline(json), _) => json.clone(),
        (_, Some(url)) => {
            log::info!("Loading configuration from {url}");
            platform.load_text(url).await?
        }
        (_, None) => return Err(MapConfError::NotFound),
    };

    Ok(ConfigDocument::from_json(&text)?)
}

/// Loads the default styles document. A missing or broken document is logged and the built-in
/// defaults are used instead.
pub async fn load_defaults(platform: &impl PlatformService) -> Option<Value> {
    let text = match platform.load_text(DEFAULTS_PATH).await {
        Ok(text) => text,
        Err(err) => {
            log::warn!("Default styles {DEFAULTS_PATH} not loaded, using built-in defaults: {err}");
            return None;
        }
    };

    match serde_json::from_str(&text) {
        Ok(document) => Some(document),
        Err(err) => {
            log::warn!("Default styles {DEFAULTS_PATH} are not valid JSON: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use bytes::Bytes;
    use insta::assert_compact_debug_snapshot;
    use mapconf_types::error::ConfigError;

    use super::*;

    #[derive(Default)]
    struct Files(HashMap<String, String>);

    impl Files {
        fn with(mut self, path: &str, text: &str) -> Self {
            self.0.insert(path.to_string(), text.to_string());
            self
        }
    }

    #[async_trait]
    impl PlatformService for Files {
        fn new() -> Self {
            Self::default()
        }

        async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, MapConfError> {
            self.0
                .get(url)
                .map(|text| Bytes::from(text.clone()))
                .ok_or(MapConfError::NotFound)
        }
    }

    const CONFIG: &str = r#"{ "groups": [{ "id": "parks", "type": "geojson", "url": "p.json" }] }"#;

    #[test]
    fn source_from_query() {
        assert_eq!(ConfigSource::from_query("?layers=a"), ConfigSource::Default);
        assert_eq!(ConfigSource::from_query("config="), ConfigSource::Default);
        assert_eq!(
            ConfigSource::from_query("?config=https%3A%2F%2Fx%2Fgoa.json"),
            ConfigSource::Url("https://x/goa.json".into())
        );
        assert_matches!(
            ConfigSource::from_query("config=%7B%22groups%22%3A%5B%5D%7D"),
            ConfigSource::Inline(json) if json == r#"{"groups":[]}"#
        );
    }

    #[test]
    fn config_from_default_path() {
        let files = Files::default().with(DEFAULT_CONFIG_PATH, CONFIG);
        let config = tokio_test::block_on(load_config(&files, &ConfigSource::Default)).unwrap();
        assert!(config.group("parks").is_some());
    }

    #[test]
    fn inline_config_is_not_fetched() {
        let source = ConfigSource::Inline(CONFIG.to_string());
        let config = tokio_test::block_on(load_config(&Files::default(), &source)).unwrap();
        assert_eq!(config.groups.len(), 1);
    }

    #[test]
    fn broken_config_is_an_error() {
        let files = Files::default().with("bad.json", r#"{ "groups": "#);
        let result = tokio_test::block_on(load_config(&files, &ConfigSource::Url("bad.json".into())));
        assert_matches!(result, Err(MapConfError::Configuration(ConfigError::Json(_))));

        let missing = tokio_test::block_on(load_config(&files, &ConfigSource::Default));
        assert_compact_debug_snapshot!(missing, @"Err(NotFound)");
    }

    #[test]
    fn defaults_degrade_to_none() {
        assert_eq!(tokio_test::block_on(load_defaults(&Files::default())), None);

        let files = Files::default().with(DEFAULTS_PATH, "not json");
        assert_eq!(tokio_test::block_on(load_defaults(&files)), None);

        let files = Files::default().with(DEFAULTS_PATH, r#"{ "vector": {} }"#);
        assert!(tokio_test::block_on(load_defaults(&files)).is_some());
    }
}
