//! KuaiShou share-link resolver
//!
//! Short links hop through several redirectors before the content page;
//! the chain is chased manually (bounded) because a `/fw/long-video/`
//! intermediate must be rewritten to `/fw/photo/` to reach a page that
//! embeds state at all. The final page carries `window.INIT_STATE`,
//! strict JSON, keyed by opaque ids; the record is whichever entry has
//! both `photo` and `result`.

use crate::resolver::models::{ImageItem, MediaAuthor, MediaInfo};
use crate::resolver::platform::Platform;
use crate::resolver::state::{capture_script_state, parse_strict, str_at, top_keys};
use crate::resolver::traits::ShareResolver;
use crate::utils::error::{ResolveError, Result};
use crate::utils::user_agent::{user_agent_for, DeviceHint};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, COOKIE, LOCATION, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

static INIT_STATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)window\.INIT_STATE\s*=\s*(.*?)</script>")
        .expect("Failed to compile init-state regex")
});

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

// Anonymous device cookie; the page withholds state entirely without one.
const DID_COOKIE: &str = "did=web_d1326127361a7a02596e1e273063544d; didv=1686713337000;";

const MAX_REDIRECT_HOPS: usize = 5;

#[derive(Debug)]
pub struct KuaiShouResolver {
    client: Client,
}

impl KuaiShouResolver {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ResolveError::network("client setup", e))?;
        Ok(Self { client })
    }

    /// Chase the share link's redirect chain by hand, rewriting the
    /// long-video intermediate to its photo twin.
    async fn landing_url(&self, share_url: &str) -> Result<String> {
        let mut current = share_url.to_string();
        for _ in 0..MAX_REDIRECT_HOPS {
            let response = self
                .client
                .get(&current)
                .header(USER_AGENT, user_agent_for(DeviceHint::Ios))
                .send()
                .await
                .map_err(|e| ResolveError::network("redirect resolution", e))?;

            if !response.status().is_redirection() {
                return Ok(current);
            }
            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Ok(current);
            };
            let next = location.replace("/fw/long-video/", "/fw/photo/");
            debug!(location = next.as_str(), "share link redirected");
            current = next;
        }
        Ok(current)
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent_for(DeviceHint::Ios))
            .header(ACCEPT, ACCEPT_HTML)
            .header(COOKIE, DID_COOKIE)
            .send()
            .await
            .map_err(|e| ResolveError::network("landing fetch", e))?;

        if !response.status().is_success() {
            return Err(ResolveError::status("landing fetch", response.status()));
        }
        response
            .text()
            .await
            .map_err(|e| ResolveError::network("landing fetch", e))
    }

    /// The entry of `INIT_STATE` that holds the content: first top-level
    /// value with both `photo` and `result`, else `visionVideoDetail`.
    fn locate_record(state: &Value) -> Option<&Value> {
        if let Some(map) = state.as_object() {
            for value in map.values() {
                if value.get("photo").is_some() && value.get("result").is_some() {
                    return Some(value);
                }
            }
        }
        state.get("visionVideoDetail")
    }

    fn parse_page(body: &str) -> Result<MediaInfo> {
        let state = capture_script_state(body, &INIT_STATE_RE)
            .and_then(parse_strict)
            .ok_or_else(|| {
                ResolveError::StructureMismatch(
                    "parse video json info from html fail".to_string(),
                )
            })?;

        let record = Self::locate_record(&state).ok_or_else(|| {
            ResolveError::StructureMismatch(format!(
                "no photo record in INIT_STATE, top_keys={:?}",
                top_keys(&state, 20)
            ))
        })?;

        // result codes other than 1 are the platform's soft-block answer.
        if let Some(result) = record.get("result").and_then(Value::as_i64) {
            if result != 1 {
                return Err(ResolveError::StructureMismatch(format!(
                    "upstream answered result={result} for this photo (blocked or gone)"
                )));
            }
        }

        let photo = record.get("photo").ok_or_else(|| {
            ResolveError::StructureMismatch("photo record has no photo mapping".to_string())
        })?;

        let video_url = photo
            .get("mainMvUrls")
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .and_then(|entry| entry.get("url"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        let mut images = Vec::new();
        let atlas_cdn = photo
            .get("ext_params")
            .and_then(|v| v.get("atlas"))
            .and_then(|v| v.get("cdn"))
            .and_then(Value::as_array)
            .and_then(|list| list.first())
            .and_then(Value::as_str)
            .unwrap_or("");
        if !atlas_cdn.is_empty() {
            if let Some(list) = photo
                .get("ext_params")
                .and_then(|v| v.get("atlas"))
                .and_then(|v| v.get("list"))
                .and_then(Value::as_array)
            {
                for entry in list {
                    if let Some(path) = entry.as_str() {
                        images.push(ImageItem {
                            url: format!("https://{}/{}", atlas_cdn, path.trim_start_matches('/')),
                            live_photo_url: None,
                        });
                    }
                }
            }
        }

        Ok(MediaInfo {
            video_url,
            cover_url: photo
                .get("coverUrls")
                .and_then(Value::as_array)
                .and_then(|list| list.first())
                .and_then(|entry| entry.get("url"))
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            title: str_at(photo, &["caption"]).unwrap_or("").to_string(),
            images,
            author: MediaAuthor {
                uid: str_at(photo, &["userEid"]).unwrap_or("").to_string(),
                name: str_at(photo, &["userName"]).unwrap_or("").to_string(),
                avatar: str_at(photo, &["headUrl"]).unwrap_or("").to_string(),
            },
            platform: Platform::KuaiShou.as_str().to_string(),
        })
    }
}

#[async_trait]
impl ShareResolver for KuaiShouResolver {
    fn platform(&self) -> Platform {
        Platform::KuaiShou
    }

    fn supports(&self, url: &str) -> bool {
        url.contains("kuaishou.com") || url.contains("chenzhongtech.com")
    }

    async fn resolve_share_url(&self, share_url: &str) -> Result<MediaInfo> {
        let landing = self.landing_url(share_url).await?;
        let body = self.fetch_page(&landing).await?;
        Self::parse_page(&body)
    }

    // No id-based endpoint without a registered device identity; the
    // defaulted NotSupported answer from the trait stands.
}
