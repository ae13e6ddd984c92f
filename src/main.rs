use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing::{error, info, warn};

use rig_server::config::SiteConfig;
use rig_server::logging::init_logging;
use rig_server::net::start_websocket_server;
use rig_server::site::Site;
use rig_server::state::{ClientEvent, SharedSiteState};

const CONFIG_DIR: &str = "config";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SiteConfig::load_or_create(Path::new(CONFIG_DIR))?;
    init_logging(&config.debug);

    info!("🚀 Starting rig server...");

    let state = Arc::new(Mutex::new(SharedSiteState::new()));
    let mut site = Site::new(&config)?;

    // Start WebSocket server
    let server_state = Arc::clone(&state);
    let bind_address = config.server.bind_address.clone();
    tokio::spawn(async move {
        if let Err(e) = start_websocket_server(bind_address, server_state).await {
            error!("WebSocket server stopped: {}", e);
        }
    });

    // Fixed timestep
    let mut ticker = interval(Duration::from_secs_f32(config.server.dt()));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let mut shared = state.lock().await;

        for event in shared.drain_inbox() {
            match event {
                ClientEvent::Key { code, down } => site.handle_key(&code, down),
                ClientEvent::Focus(rig) => {
                    if let Err(e) = site.set_focus(rig) {
                        warn!("focus request rejected: {}", e);
                    }
                }
            }
        }

        site.tick();

        // Advance tick + broadcast snapshot
        shared.tick = site.tick_count();
        match serde_json::to_string(&site.snapshot()) {
            Ok(json) => shared.broadcast(&json),
            Err(e) => error!("snapshot serialization failed: {}", e),
        }
    }
}
