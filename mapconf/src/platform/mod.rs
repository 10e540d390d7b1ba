//! Provides platform specific logic and [`PlatformService`] to access it.

use std::sync::LazyLock;

use async_trait::async_trait;
use bytes::Bytes;
use maybe_sync::{MaybeSend, MaybeSync};

use crate::error::MapConfError;

/// Service loading documents in a way that works on the current platform.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PlatformService: MaybeSend + MaybeSync {
    /// Creates a new instance of the service. This method is a part of the trait to allow other
    /// types be agnostic of the specific type of the platform service they work with.
    fn new() -> Self;

    /// Loads a byte array from the given url.
    async fn load_bytes_from_url(&self, url: &str) -> Result<Bytes, MapConfError>;

    /// Loads a UTF-8 text document from the given url.
    async fn load_text(&self, url: &str) -> Result<String, MapConfError> {
        let bytes = self.load_bytes_from_url(url).await?;
        String::from_utf8(bytes.to_vec()).map_err(|err| MapConfError::Decoding(err.to_string()))
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub mod native;

/// Default implementation of the [`PlatformService`] for the current platform.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformServiceImpl = native::NativePlatformService;

/// Refresh timers of the current platform.
#[cfg(not(target_arch = "wasm32"))]
pub type IntervalTimers = native::TokioIntervalTimers;

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Default implementation of the [`PlatformService`] for the current platform.
#[cfg(target_arch = "wasm32")]
pub type PlatformServiceImpl = web::WebPlatformService;

/// Refresh timers of the current platform.
#[cfg(target_arch = "wasm32")]
pub type IntervalTimers = web::WindowIntervalTimers;

static SERVICE: LazyLock<PlatformServiceImpl> = LazyLock::new(PlatformServiceImpl::new);

/// Returns the shared instance of the platform service.
pub fn instance() -> &'static PlatformServiceImpl {
    &SERVICE
}
