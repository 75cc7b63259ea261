//! DouYin share-link resolver
//!
//! App share links (`v.douyin.com`) are a single redirect hop away from a
//! URL whose path carries the aweme id; web links carry it directly. The
//! share page for that id embeds `window._ROUTER_DATA`, strict JSON, with
//! the content record nested under a `loaderData` key whose name encodes
//! the content kind (`video_(id)/page` or `note_(id)/page`).

use crate::resolver::models::{ImageItem, MediaAuthor, MediaInfo};
use crate::resolver::platform::Platform;
use crate::resolver::state::{capture_script_state, parse_strict, str_at, top_keys};
use crate::resolver::traits::ShareResolver;
use crate::utils::error::{ResolveError, Result};
use crate::utils::user_agent::{user_agent_for, DeviceHint};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{LOCATION, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

static ROUTER_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)window\._ROUTER_DATA\s*=\s*(.*?)</script>")
        .expect("Failed to compile router-data regex")
});

#[derive(Debug)]
pub struct DouYinResolver {
    client: Client,
    probe_client: Client,
}

impl DouYinResolver {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ResolveError::network("client setup", e))?;
        let probe_client = Client::builder()
            .timeout(Duration::from_secs(15))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ResolveError::network("client setup", e))?;
        Ok(Self {
            client,
            probe_client,
        })
    }

    /// Aweme id from a content URL: `modal_id` query parameter if
    /// present, else the last non-empty path segment.
    fn video_id_from_url(url_str: &str) -> Result<String> {
        let parsed = Url::parse(url_str)
            .map_err(|_| ResolveError::InvalidInput(url_str.to_string()))?;

        if let Some((_, id)) = parsed.query_pairs().find(|(k, _)| k == "modal_id") {
            if !id.is_empty() {
                return Ok(id.into_owned());
            }
        }

        parsed
            .path_segments()
            .and_then(|segments| {
                segments
                    .filter(|s| !s.is_empty())
                    .last()
                    .map(str::to_string)
            })
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ResolveError::StructureMismatch(format!(
                    "no video id in share url path: {url_str}"
                ))
            })
    }

    /// App share links redirect once; read the `Location` without
    /// following so the id-bearing URL is not lost.
    async fn follow_share_redirect(&self, share_url: &str) -> Result<String> {
        let response = self
            .probe_client
            .get(share_url)
            .header(USER_AGENT, user_agent_for(DeviceHint::Windows))
            .send()
            .await
            .map_err(|e| ResolveError::network("redirect resolution", e))?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ResolveError::StructureMismatch(
                    "share link did not redirect to a content page".to_string(),
                )
            })?;
        debug!(location, "share link redirected");
        Ok(location.to_string())
    }

    /// First URL of a list that is not a webp thumbnail.
    fn first_no_webp(url_list: &[Value]) -> String {
        for value in url_list {
            if let Some(url) = value.as_str() {
                if !url.contains(".webp") {
                    return url.to_string();
                }
            }
        }
        url_list
            .first()
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string()
    }

    /// The content record inside `_ROUTER_DATA`: the first
    /// `loaderData.<video_*|note_*>/page` entry carrying an item list.
    fn locate_router_item(state: &Value) -> Option<&Value> {
        let loader_data = state.get("loaderData")?.as_object()?;
        for (key, value) in loader_data {
            if key.contains("/page") && (key.starts_with("video_") || key.starts_with("note_")) {
                if let Some(item) = value
                    .get("videoInfoRes")
                    .and_then(|v| v.get("item_list"))
                    .and_then(Value::as_array)
                    .and_then(|list| list.first())
                {
                    return Some(item);
                }
            }
        }
        None
    }

    fn normalize(item: &Value) -> MediaInfo {
        let mut images = Vec::new();
        if let Some(list) = item.get("images").and_then(Value::as_array) {
            for entry in list {
                let Some(url_list) = entry.get("url_list").and_then(Value::as_array) else {
                    continue;
                };
                let url = Self::first_no_webp(url_list);
                if url.is_empty() {
                    continue;
                }
                let live_photo_url = entry
                    .get("video")
                    .and_then(|v| v.get("play_addr"))
                    .and_then(|v| v.get("url_list"))
                    .and_then(Value::as_array)
                    .and_then(|list| list.first())
                    .and_then(Value::as_str)
                    .map(str::to_string);
                images.push(ImageItem {
                    url,
                    live_photo_url,
                });
            }
        }

        // Galleries win: a note's preview clip is not the content.
        let mut video_url = String::new();
        if images.is_empty() {
            if let Some(play_url) = item
                .get("video")
                .and_then(|v| v.get("play_addr"))
                .and_then(|v| v.get("url_list"))
                .and_then(Value::as_array)
                .and_then(|list| list.first())
                .and_then(Value::as_str)
            {
                // The shared address serves the watermarked rendition.
                video_url = play_url.replace("playwm", "play");
            }
        }

        let cover_url = item
            .get("video")
            .and_then(|v| v.get("cover"))
            .and_then(|v| v.get("url_list"))
            .and_then(Value::as_array)
            .map(|list| Self::first_no_webp(list))
            .unwrap_or_default();

        MediaInfo {
            video_url,
            cover_url,
            title: str_at(item, &["desc"]).unwrap_or("").to_string(),
            images,
            author: MediaAuthor {
                uid: str_at(item, &["author", "sec_uid"]).unwrap_or("").to_string(),
                name: str_at(item, &["author", "nickname"]).unwrap_or("").to_string(),
                avatar: item
                    .get("author")
                    .and_then(|v| v.get("avatar_thumb"))
                    .and_then(|v| v.get("url_list"))
                    .and_then(Value::as_array)
                    .and_then(|list| list.first())
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            },
            platform: Platform::DouYin.as_str().to_string(),
        }
    }
}

#[async_trait]
impl ShareResolver for DouYinResolver {
    fn platform(&self) -> Platform {
        Platform::DouYin
    }

    fn supports(&self, url: &str) -> bool {
        url.contains("douyin.com") || url.contains("iesdouyin.com")
    }

    async fn resolve_share_url(&self, share_url: &str) -> Result<MediaInfo> {
        let parsed = Url::parse(share_url)
            .map_err(|_| ResolveError::InvalidInput(share_url.to_string()))?;
        let host = parsed.host_str().unwrap_or("");

        let content_url = if host.contains("v.douyin.com") {
            self.follow_share_redirect(share_url).await?
        } else {
            share_url.to_string()
        };

        let video_id = Self::video_id_from_url(&content_url)?;
        self.resolve_by_id(&video_id).await
    }

    async fn resolve_by_id(&self, content_id: &str) -> Result<MediaInfo> {
        let page_url = format!("https://www.douyin.com/share/video/{content_id}");
        let response = self
            .client
            .get(&page_url)
            .header(USER_AGENT, user_agent_for(DeviceHint::Windows))
            .send()
            .await
            .map_err(|e| ResolveError::network("share page fetch", e))?;

        if !response.status().is_success() {
            return Err(ResolveError::status("share page fetch", response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::network("share page fetch", e))?;

        let state = capture_script_state(&body, &ROUTER_DATA_RE)
            .and_then(parse_strict)
            .ok_or_else(|| {
                ResolveError::StructureMismatch(
                    "parse video json info from html fail".to_string(),
                )
            })?;

        let item = Self::locate_router_item(&state).ok_or_else(|| {
            ResolveError::StructureMismatch(format!(
                "no content record in _ROUTER_DATA, top_keys={:?}",
                top_keys(&state, 20)
            ))
        })?;

        Ok(Self::normalize(item))
    }
}
