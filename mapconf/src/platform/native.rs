//! Platform specific stuff for native targets.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use log::info;
use tokio::time::MissedTickBehavior;

use crate::control::{EngineEvent, EventSender};
use crate::error::MapConfError;
use crate::lifecycle::{TimerHandle, TimerService};
use crate::platform::PlatformService;

const USER_AGENT: &str = concat!("mapconf/", env!("CARGO_PKG_VERSION"));

/// Loads documents over HTTP, or from the file system for urls without a scheme.
#[derive(Debug, Clone)]
pub struct NativePlatformService {
    http_client: reqwest::Client,
}

#[async_trait]
impl PlatformService for NativePlatformService {
    fn new() -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                log::warn!("Failed to configure HTTP client, using defaults: {err}");
                reqwest::Client::new()
            });

        Self { http_client }
    }

    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, MapConfError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.load_from_web(url).await;
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        let bytes = std::fs::read(path).inspect_err(|err| info!("Failed to read {path}: {err}"))?;
        Ok(Bytes::from(bytes))
    }
}

impl NativePlatformService {
    async fn load_from_web(&self, url: &str) -> Result<Bytes, MapConfError> {
        let response = self.http_client.get(url).send().await?;
        if !response.status().is_success() {
            info!(
                "Failed to load {url}: {}, {:?}",
                response.status(),
                response.text().await
            );
            return Err(MapConfError::IO);
        }

        Ok(response.bytes().await?)
    }
}

/// Refresh timers running as tokio tasks. Every tick is sent to the event processor as
/// [`EngineEvent::RefreshTick`].
#[derive(Debug, Clone)]
pub struct TokioIntervalTimers {
    events: EventSender,
}

impl TokioIntervalTimers {
    /// Creates timers sending ticks through the given channel.
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl TimerService for TokioIntervalTimers {
    fn start(&self, group_id: &str, interval: Duration) -> TimerHandle {
        let events = self.events.clone();
        let group_id = group_id.to_string();

        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticks.tick().await;

            loop {
                ticks.tick().await;
                let tick = EngineEvent::RefreshTick {
                    group_id: group_id.clone(),
                };
                if events.send(tick).is_err() {
                    break;
                }
            }
        });

        TimerHandle::new(move || task.abort())
    }
}
