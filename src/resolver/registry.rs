//! Resolver registry and dispatch
//!
//! Holds the closed set of platform resolvers and routes the two entry
//! points: free-text share URLs by host, content ids by platform
//! selector. A platform failure is surfaced as-is; there is no
//! cross-platform fallback, because another platform's resolver can
//! never answer for the one that failed.

use crate::resolver::models::MediaInfo;
use crate::resolver::platform::Platform;
use crate::resolver::platforms::{DouYinResolver, KuaiShouResolver, RedBookResolver};
use crate::resolver::traits::ShareResolver;
use crate::utils::config::ResolverConfig;
use crate::utils::error::{ResolveError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;
use url::Url;

// Callers paste prose around links; pull out the first http(s) URL.
static SHARE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"http[s]?://[\w.-]+[\w/-]*[\w.-]*\??[\w=&:\-\+%]*[/]*")
        .expect("Failed to compile share-url regex")
});

pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn ShareResolver>>,
}

impl ResolverRegistry {
    /// Build the registry with every supported platform resolver.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        Ok(Self {
            resolvers: vec![
                Arc::new(RedBookResolver::new(config)?),
                Arc::new(DouYinResolver::new()?),
                Arc::new(KuaiShouResolver::new()?),
            ],
        })
    }

    /// First well-formed http(s) URL substring of free-text input.
    pub fn extract_share_url(text: &str) -> Result<String> {
        SHARE_URL_RE
            .find(text)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| ResolveError::InvalidInput(text.to_string()))
    }

    fn find_by_url(&self, share_url: &str) -> Result<&Arc<dyn ShareResolver>> {
        for resolver in &self.resolvers {
            if resolver.supports(share_url) {
                debug!(platform = %resolver.platform(), "routing share url");
                return Ok(resolver);
            }
        }
        let host = Url::parse(share_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| share_url.to_string());
        Err(ResolveError::UnsupportedHost(host))
    }

    fn find_by_platform(&self, platform: Platform) -> &Arc<dyn ShareResolver> {
        self.resolvers
            .iter()
            .find(|r| r.platform() == platform)
            .expect("every Platform variant has a registered resolver")
    }

    /// Resolve a share link pasted as free text.
    pub async fn resolve_share_url(&self, text: &str) -> Result<MediaInfo> {
        let share_url = Self::extract_share_url(text)?;
        let resolver = self.find_by_url(&share_url)?;
        resolver.resolve_share_url(&share_url).await
    }

    /// Resolve a platform-native content id. The selector is accepted as
    /// a canonical slug or a symbolic name.
    pub async fn resolve_by_id(&self, selector: &str, content_id: &str) -> Result<MediaInfo> {
        let platform = Platform::from_selector(selector)?;
        debug!(platform = %platform, content_id, "routing id resolve");
        self.find_by_platform(platform)
            .resolve_by_id(content_id)
            .await
    }
}
