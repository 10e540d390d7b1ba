//! Platform specific stuff for WASM32 (web) targets.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use crate::control::{EngineEvent, EventSender};
use crate::error::MapConfError;
use crate::lifecycle::{TimerHandle, TimerService};
use crate::platform::PlatformService;

/// Platform service for Web target. Documents are loaded with the `fetch` API, relative urls
/// are resolved against the page.
pub struct WebPlatformService {}

#[async_trait(?Send)]
impl PlatformService for WebPlatformService {
    fn new() -> Self {
        Self {}
    }

    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, MapConfError> {
        let opts = RequestInit::new();
        opts.set_method("GET");
        opts.set_mode(RequestMode::Cors);

        let request = Request::new_with_str_and_init(url, &opts)?;

        let Some(window) = web_sys::window() else {
            return Err(MapConfError::Wasm(Some("Window object is not available".into())));
        };
        let resp_value = JsFuture::from(window.fetch_with_request(&request)).await?;
        let resp: Response = resp_value.dyn_into()?;
        if !resp.ok() {
            log::info!("Failed to load {url}: {} {}", resp.status(), resp.status_text());
            return Err(MapConfError::IO);
        }

        let bytes_val = JsFuture::from(resp.array_buffer()?).await?;
        let array = Uint8Array::new(&bytes_val);
        Ok(array.to_vec().into())
    }
}

/// Refresh timers based on `window.setInterval`. Every tick is sent to the event processor as
/// [`EngineEvent::RefreshTick`].
#[derive(Debug, Clone)]
pub struct WindowIntervalTimers {
    events: EventSender,
}

impl WindowIntervalTimers {
    /// Creates timers sending ticks through the given channel.
    pub fn new(events: EventSender) -> Self {
        Self { events }
    }
}

impl TimerService for WindowIntervalTimers {
    fn start(&self, group_id: &str, interval: Duration) -> TimerHandle {
        let Some(window) = web_sys::window() else {
            log::warn!("Cannot start refresh of {group_id}: no window object");
            return TimerHandle::detached();
        };

        let events = self.events.clone();
        let id = group_id.to_string();
        let callback = Closure::<dyn FnMut()>::new(move || {
            let _ = events.send(EngineEvent::RefreshTick {
                group_id: id.clone(),
            });
        });

        let timeout = i32::try_from(interval.as_millis()).unwrap_or(i32::MAX);
        let handle = match window.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            timeout,
        ) {
            Ok(handle) => handle,
            Err(err) => {
                log::warn!("Failed to start refresh of {group_id}: {err:?}");
                return TimerHandle::detached();
            }
        };

        TimerHandle::new(move || {
            if let Some(window) = web_sys::window() {
                window.clear_interval_with_handle(handle);
            }
            drop(callback);
        })
    }
}

/// Sends log records to the browser console and panic messages to `console.error`.
pub fn init_logging(level: log::Level) {
    console_error_panic_hook::set_once();
    if let Err(err) = console_log::init_with_level(level) {
        web_sys::console::warn_1(&format!("Logger is already set: {err}").into());
    }
}
