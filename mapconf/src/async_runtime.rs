//! Spawning of background tasks on the runtime of the current platform.

use std::future::Future;

#[cfg(not(target_arch = "wasm32"))]
use maybe_sync::MaybeSend;

/// Runs the future in the background on the tokio runtime.
#[cfg(not(target_arch = "wasm32"))]
pub fn spawn<F>(task: F)
where
    F: Future + MaybeSend + 'static,
    F::Output: MaybeSend + 'static,
{
    tokio::spawn(task);
}

/// Runs the future in the background on the browser event loop.
#[cfg(target_arch = "wasm32")]
pub fn spawn<F>(task: F)
where
    F: Future + 'static,
    F::Output: 'static,
{
    wasm_bindgen_futures::spawn_local(async move {
        let _ = task.await;
    });
}
