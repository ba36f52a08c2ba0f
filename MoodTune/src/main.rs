use moodaudius::AudiusServerExt;
use moodserver::ServerBuilder;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = moodconfig::get_config();
    let mut server = ServerBuilder::new_configured().build();
    server.init_logging().await;

    info!("Configuration directory: {}", config.dir());

    let info = server.info();
    server
        .add_route("/", move || {
            let info = info.clone();
            async move {
                serde_json::json!({
                    "name": "MoodTune",
                    "version": env!("CARGO_PKG_VERSION"),
                    "server": info,
                    "endpoints": {
                        "playlist": "POST /playlist",
                        "stream": "GET /audius/stream/{track_id}",
                        "logs": "GET /log-dump",
                        "log_setup": "GET|POST /api/log_setup",
                    },
                })
            }
        })
        .await;

    info!("Initializing Audius routes...");
    server.init_audius().await?;

    server.start().await?;
    info!("MoodTune ready, press Ctrl+C to stop");
    server.wait().await;

    Ok(())
}
