//! # moodserver - Serveur web haut niveau basé sur Axum
//!
//! Thin wrapper over an Axum [`Router`](axum::Router) used by MoodTune:
//!
//! - [`server`] : route registration, start/wait, graceful shutdown on Ctrl+C
//! - [`logs`] : tracing initialisation with an in-memory ring buffer exposed over HTTP
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use moodserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "localhost", 8080).build();
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{BufferLayer, LogState, log_dump};
pub use server::{Server, ServerBuilder, ServerInfo};
