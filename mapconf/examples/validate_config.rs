//! Loads a configuration and shows its groups on an in-memory engine, printing the engine
//! sources and layers that would be created.
//!
//! ```shell
//! cargo run --example validate_config -- ./config/index.json "layers=parks,roads"
//! ```

use anyhow::{anyhow, Result};
use mapconf::engine::InMemoryEngine;
use mapconf::lifecycle::LayerLifecycleManager;
use mapconf::loader::{load_config, load_defaults, ConfigSource};
use mapconf::platform::{self, PlatformService};
use mapconf::Session;

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow!("This example must be run with a path or url of a configuration"))?;
    let query = args.next();

    let platform = platform::instance();
    let config = load_config(platform, &ConfigSource::Url(path)).await?;
    let defaults = load_defaults(platform).await;
    let group_count = config.groups.len();

    let mut engine = InMemoryEngine::new();
    let mut session = Session::new(LayerLifecycleManager::new(config, defaults));
    let update = session.start(&mut engine, query.as_deref());

    for request in &update.fetches {
        let result = platform.load_text(&request.url).await;
        session.complete_fetch(&mut engine, &request.ticket, result);
    }

    println!("{group_count} groups configured");
    println!("sources: {:?}", engine.source_ids());
    println!("layers:  {:?}", engine.layer_ids());
    for event in &update.events {
        println!("{}", serde_json::to_string(event)?);
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}
