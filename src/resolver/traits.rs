use crate::resolver::models::MediaInfo;
use crate::resolver::platform::Platform;
use crate::utils::error::{ResolveError, Result};
use async_trait::async_trait;

/// Core trait for all platform resolvers
///
/// This trait isolates callers from the per-platform scraping strategy.
/// Implementations hold no mutable state; every call is independent and
/// safe to run concurrently with any other call.
#[async_trait]
pub trait ShareResolver: Send + Sync + std::fmt::Debug {
    /// The platform this resolver handles.
    fn platform(&self) -> Platform;

    /// Checks if this resolver claims the given URL.
    ///
    /// Used by the registry to route a share URL to the right platform.
    fn supports(&self, url: &str) -> bool;

    /// Resolves a share URL into normalized media.
    async fn resolve_share_url(&self, share_url: &str) -> Result<MediaInfo>;

    /// Resolves a platform-native content id (optional; default
    /// implementation reports the operation as unsupported).
    async fn resolve_by_id(&self, _content_id: &str) -> Result<MediaInfo> {
        Err(ResolveError::NotSupported {
            platform: self.platform().as_str(),
            operation: "resolve by content id",
        })
    }
}
