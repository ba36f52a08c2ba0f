//! Extension moodserver pour Audius
//!
//! `moodaudius` ajoute ses routes à `moodserver::Server` sans que le serveur
//! dépende de ce crate.
//!
//! ```rust,no_run
//! use moodaudius::AudiusServerExt;
//! use moodserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     server.init_audius().await?;
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

use crate::api_rest::{create_router, AudiusState};
use crate::client::AudiusClient;
use crate::config_ext::AudiusConfigExt;
use crate::search::SearchAggregator;
use crate::stream::StreamProxy;
use anyhow::Result;
use moodserver::Server;
use std::sync::Arc;
use tracing::info;

/// Trait pour étendre moodserver avec l'API Audius
///
/// # Routes enregistrées
///
/// - `POST /playlist` - Playlist pour un ressenti
/// - `GET /audius/stream/{track_id}` - Proxy du flux audio
pub trait AudiusServerExt {
    /// Crée le client depuis la configuration globale et enregistre les routes
    async fn init_audius(&mut self) -> Result<Arc<AudiusState>>;

    /// Enregistre les routes avec un client déjà construit
    async fn init_audius_with_client(&mut self, client: AudiusClient) -> Result<Arc<AudiusState>>;
}

impl AudiusServerExt for Server {
    async fn init_audius(&mut self) -> Result<Arc<AudiusState>> {
        info!("Initializing Audius API...");

        let client = moodconfig::get_config().audius_client()?;
        self.init_audius_with_client(client).await
    }

    async fn init_audius_with_client(&mut self, client: AudiusClient) -> Result<Arc<AudiusState>> {
        info!("Audius app name: {}", client.app_name());

        let state = AudiusState {
            aggregator: SearchAggregator::new(client.clone()),
            proxy: StreamProxy::new(client),
        };

        self.add_router("/", create_router(state.clone())).await;

        info!("Audius API initialized: POST /playlist, GET /audius/stream/{{track_id}}");
        Ok(Arc::new(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_routes_are_mounted() {
        let client = AudiusClient::builder()
            .directory_url("http://127.0.0.1:9")
            .build()
            .unwrap();

        let mut server = Server::new("Test", "localhost", 0);
        server.init_audius_with_client(client).await.unwrap();

        let response = server
            .router()
            .await
            .oneshot(Request::get("/playlist").body(Body::empty()).unwrap())
            .await
            .unwrap();

        // POST-only route
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
