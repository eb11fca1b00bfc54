//! `livefetch` - Live-stream URL resolution
//!
//! Turns a platform id and a room id into playable media URLs.
//!
//! # Features
//!
//! - **Two-phase resolution**: metadata first, stream URLs only for live rooms
//! - **Script-evaluated signing**: platform JavaScript run in `QuickJS`
//! - **Anti-leech tokens**: deterministic md5 tokens from base64 templates
//! - **Retry with backoff**: bounded exponential backoff on every request
//! - **Backup CDNs**: alternates resolved concurrently, deduplicated and capped
//!
//! # Example
//!
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let result = livefetch::resolve("huya", "333003", Some("HD"), None).await?;
//!     if result.is_live {
//!         println!("{} -> {}", result.anchor_name, result.primary_url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod http_client;
pub mod js_engine;
pub mod model;
pub mod normalize;
pub mod platform;
pub mod quality;
pub mod resolve;
pub mod retry;
pub mod session;
pub mod signing;
pub mod transport;

pub use aggregate::BackupAggregator;
pub use config::Settings;
pub use error::{Error, Phase, ResolveError, Result};
pub use http_client::HttpClient;
pub use js_engine::{QuickJsEvaluator, ScriptEvaluator};
pub use model::{Protocol, RoomIdentity, RoomMetadata, StreamCandidate, StreamResult};
pub use platform::{Platform, PlatformResolver};
pub use quality::{Quality, QualityHint};
pub use resolve::{resolve, Resolver};
pub use retry::RetryPolicy;
pub use session::{Session, SessionBuilder};
pub use signing::SigningContext;
pub use transport::RetryingTransport;

/// Version of livefetch
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
