//! Top-level resolution entry points.

use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Phase, ResolveError};
use crate::model::{RoomIdentity, StreamResult};
use crate::platform::{Platform, PlatformResolver};
use crate::quality::QualityHint;
use crate::session::SessionBuilder;

/// Resolve one room with default settings.
///
/// `platform_id` is a registry id such as `"huya"`, `room` a room id or
/// full room URL, `quality` a tier label or index, `proxy` an optional
/// HTTP(S) proxy URL.
pub async fn resolve(
    platform_id: &str,
    room: &str,
    quality: Option<&str>,
    proxy: Option<&str>,
) -> Result<StreamResult, ResolveError> {
    Resolver::new(Settings::default())
        .resolve(platform_id, room, quality, proxy)
        .await
}

/// Resolution entry point carrying [`Settings`].
///
/// Holds no per-call state; every [`Resolver::resolve`] call builds its own
/// session, so one `Resolver` can serve concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    settings: Settings,
}

impl Resolver {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn resolve(
        &self,
        platform_id: &str,
        room: &str,
        quality: Option<&str>,
        proxy: Option<&str>,
    ) -> Result<StreamResult, ResolveError> {
        let platform: Platform = platform_id
            .parse()
            .map_err(|e| ResolveError::new(Phase::Metadata, e))?;
        self.resolve_with(platform.resolver().as_ref(), room, quality, proxy)
            .await
    }

    /// Resolve through a specific resolver instance.
    pub async fn resolve_with(
        &self,
        resolver: &dyn PlatformResolver,
        room: &str,
        quality: Option<&str>,
        proxy: Option<&str>,
    ) -> Result<StreamResult, ResolveError> {
        let platform = resolver.platform();
        let metadata_error = |e| ResolveError::new(Phase::Metadata, e);

        let identity = RoomIdentity::parse(platform, room).map_err(metadata_error)?;
        let session = SessionBuilder::from_settings(&self.settings, platform, proxy)
            .build()
            .map_err(metadata_error)?;
        debug!(%platform, url = %identity.live_url, "fetching room metadata");

        let metadata = resolver
            .fetch_metadata(&session, &identity.live_url)
            .await
            .map_err(metadata_error)?;

        let hint = QualityHint::parse(quality);
        let result = resolver
            .resolve_stream(&session, &metadata, &hint)
            .await
            .map_err(ResolveError::from_stream)?;

        info!(
            %platform,
            room = %metadata.room_id,
            live = result.is_live,
            quality = ?result.quality,
            backups = result.backup_urls.len(),
            "room resolved"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_platform_fails_in_metadata_phase() {
        let err = resolve("nowhere", "1", None, None).await.unwrap_err();
        assert_eq!(err.phase, Phase::Metadata);
        assert!(err.to_string().contains("unsupported platform: nowhere"));
    }

    #[tokio::test]
    async fn empty_room_fails_before_any_request() {
        let err = resolve("huya", "   ", None, None).await.unwrap_err();
        assert_eq!(err.phase, Phase::Metadata);
        assert!(matches!(err.source, crate::Error::Parse(_)));
    }
}
