//! RedBook (Xiaohongshu) share-link resolver
//!
//! Share links 30x to a content page whose server-rendered HTML embeds a
//! `window.__INITIAL_STATE__` blob. The page is fetched with a desktop
//! identity first (mobile identities trip the anti-bot heuristics more
//! often here), retried once with an iOS identity, and the blob is parsed
//! leniently. Two historical state shapes (`note` and `noteData`) are
//! both handled; anything else fails with a key snapshot for triage.

use crate::resolver::models::{ImageItem, MediaAuthor, MediaInfo};
use crate::resolver::platform::Platform;
use crate::resolver::state::{
    array_at, capture_script_state, object_at, parse_loose, str_at, top_keys,
};
use crate::resolver::traits::ShareResolver;
use crate::utils::config::ResolverConfig;
use crate::utils::error::{ResolveError, Result};
use crate::utils::user_agent::{user_agent_for, DeviceHint};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE, LOCATION, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

static INITIAL_STATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)window\.__INITIAL_STATE__\s*=\s*(.*?)</script>")
        .expect("Failed to compile initial-state regex")
});

// 24-hex note id, as it appears in content-page paths.
static PATH_NOTE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9a-fA-F]{24}").expect("Failed to compile note-id regex"));

// The same id under any of the inline key spellings the page has used.
static INLINE_NOTE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:noteId|currentNoteId|sourceNoteId|note_id)"\s*:\s*"([0-9a-fA-F]{24})""#)
        .expect("Failed to compile inline note-id regex")
});

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_ZH: &str = "zh-CN,zh;q=0.9,en;q=0.8";

#[derive(Debug)]
pub struct RedBookResolver {
    /// Follows redirects; used for the content-page fetches.
    client: Client,
    /// Redirects disabled; used to read the share-link `Location` hop.
    probe_client: Client,
    cookie: Option<String>,
}

impl RedBookResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
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
            cookie: config.redbook_cookie.clone(),
        })
    }

    /// Resolve the share link's redirect without following it, so the
    /// intermediate URL (which may carry the note id) is not lost.
    async fn landing_url(&self, share_url: &str) -> Result<String> {
        let mut request = self
            .probe_client
            .get(share_url)
            .header(USER_AGENT, user_agent_for(DeviceHint::Windows))
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_ZH);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::network("redirect resolution", e))?;

        if response.status().is_redirection() {
            if let Some(location) = response.headers().get(LOCATION) {
                if let Ok(location) = location.to_str() {
                    debug!(location, "share link redirected");
                    return Ok(location.to_string());
                }
            }
        }
        Ok(share_url.to_string())
    }

    /// Fetch the landing page with the given identity. Returns the final
    /// landed URL together with the body.
    async fn fetch_page(&self, url: &str, hint: DeviceHint) -> Result<(String, String)> {
        let mut request = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent_for(hint))
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_ZH);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::network("landing fetch", e))?;

        if !response.status().is_success() {
            return Err(ResolveError::status("landing fetch", response.status()));
        }

        let landed = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::network("landing fetch", e))?;
        Ok((landed, body))
    }

    fn extract_state(body: &str) -> Option<Value> {
        let blob = capture_script_state(body, &INITIAL_STATE_RE)?;
        parse_loose(blob)
    }

    /// Derive the note id independently of the state blob: a 24-hex path
    /// segment of the landed URL, else the first inline key match in the
    /// raw HTML.
    fn recover_note_id(landed_url: &str, body: &str) -> Option<String> {
        if let Ok(parsed) = Url::parse(landed_url) {
            if let Some(found) = PATH_NOTE_ID_RE.find(parsed.path()) {
                return Some(found.as_str().to_string());
            }
        }
        INLINE_NOTE_ID_RE
            .captures(body)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn usable_id<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<&'a str> {
        candidates
            .into_iter()
            .flatten()
            .find(|id| !id.is_empty() && *id != "undefined")
    }

    /// Locate the note record inside either of the two known state
    /// shapes. `recovered_id` is the fallback when the state cannot name
    /// its own id.
    fn locate_note_record<'a>(
        state: &'a Value,
        recovered_id: Option<&'a str>,
    ) -> Result<&'a Value> {
        if let Some(note) = state.get("note").filter(|v| v.is_object()) {
            let id = Self::usable_id([str_at(note, &["currentNoteId"]), recovered_id])
                .ok_or_else(Self::expired)?;
            return object_at(note, &["noteDetailMap", id, "note"])
                .ok_or_else(Self::auth_required);
        }

        if let Some(note_data) = state.get("noteData").filter(|v| v.is_object()) {
            let id = Self::usable_id([
                str_at(note_data, &["currentNoteId"]),
                str_at(note_data, &["noteId"]),
                str_at(note_data, &["noteDetail", "noteId"]),
                recovered_id,
            ])
            .ok_or_else(Self::expired)?;
            return object_at(note_data, &["noteDetailMap", id, "note"])
                .or_else(|| object_at(note_data, &["noteDetail", "note"]))
                .ok_or_else(Self::auth_required);
        }

        Err(ResolveError::StructureMismatch(format!(
            "missing `note` in __INITIAL_STATE__ (soft block or structure change), top_keys={:?}",
            top_keys(state, 20)
        )))
    }

    fn expired() -> ResolveError {
        ResolveError::StructureMismatch(
            "note id in response is empty/undefined (link may be expired)".to_string(),
        )
    }

    fn auth_required() -> ResolveError {
        ResolveError::AuthRequired(
            "note detail record is missing; this note likely needs an authenticated session, \
             set REDBOOK_COOKIE and retry"
                .to_string(),
        )
    }

    /// Rewrite a gallery image URL to the watermark-free CDN form.
    ///
    /// The rewrite only holds for the `notes_pre_post` URL family; other
    /// URLs pass through untouched. The image id comes from the URL path,
    /// so feeding an already-rewritten URL back through is a no-op.
    fn rewrite_image_url(url_default: &str) -> String {
        if !url_default.contains("notes_pre_post") {
            return url_default.to_string();
        }
        let segment = Url::parse(url_default).ok().and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|s| s.filter(|p| !p.is_empty()).last().map(str::to_string))
        });
        let image_id = match segment.as_deref().and_then(|s| s.split('!').next()) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return url_default.to_string(),
        };
        // Watermarked variants live under spectrum/; keep that prefix.
        let spectrum = if url_default.contains("spectrum") {
            "spectrum/"
        } else {
            ""
        };
        format!("https://ci.xiaohongshu.com/notes_pre_post/{spectrum}{image_id}?imageView2/format/jpg")
    }

    fn normalize(record: &Value) -> MediaInfo {
        let mut video_url = String::new();
        if let Some(first) = array_at(record, &["video", "media", "stream", "h264"])
            .and_then(|h264| h264.first())
        {
            video_url = str_at(first, &["masterUrl"]).unwrap_or("").to_string();
        }

        let image_list = array_at(record, &["imageList"]);

        let mut images = Vec::new();
        if video_url.is_empty() {
            for item in image_list.map(Vec::as_slice).unwrap_or_default() {
                let Some(url_default) = item
                    .get("urlDefault")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                else {
                    continue;
                };
                let mut image = ImageItem {
                    url: Self::rewrite_image_url(url_default),
                    live_photo_url: None,
                };
                if item
                    .get("livePhoto")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
                {
                    image.live_photo_url = array_at(item, &["stream", "h264"])
                        .and_then(|h264| h264.first())
                        .and_then(|first| str_at(first, &["masterUrl"]))
                        .map(str::to_string);
                }
                images.push(image);
            }
        }

        let cover_url = image_list
            .and_then(|list| list.first())
            .and_then(|item| item.get("urlDefault"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        MediaInfo {
            video_url,
            cover_url,
            title: str_at(record, &["title"]).unwrap_or("").to_string(),
            images,
            author: MediaAuthor {
                uid: str_at(record, &["user", "userId"]).unwrap_or("").to_string(),
                name: str_at(record, &["user", "nickname"]).unwrap_or("").to_string(),
                avatar: str_at(record, &["user", "avatar"]).unwrap_or("").to_string(),
            },
            platform: Platform::RedBook.as_str().to_string(),
        }
    }
}

#[async_trait]
impl ShareResolver for RedBookResolver {
    fn platform(&self) -> Platform {
        Platform::RedBook
    }

    fn supports(&self, url: &str) -> bool {
        url.contains("xiaohongshu.com") || url.contains("xhslink.com")
    }

    async fn resolve_share_url(&self, share_url: &str) -> Result<MediaInfo> {
        let landing = self.landing_url(share_url).await?;

        let (mut landed_url, mut body) = self.fetch_page(&landing, DeviceHint::Windows).await?;
        let mut state = Self::extract_state(&body);

        if state.is_none() {
            // Anti-bot miss: one retry with the alternate identity.
            debug!("initial state missing with windows identity, retrying as ios");
            let (retry_url, retry_body) = self.fetch_page(&landing, DeviceHint::Ios).await?;
            landed_url = retry_url;
            body = retry_body;
            state = Self::extract_state(&body);
        }

        let Some(state) = state else {
            return Err(ResolveError::StructureMismatch(
                "parse video json info from html fail".to_string(),
            ));
        };

        let recovered = Self::recover_note_id(&landed_url, &body);
        let record = Self::locate_note_record(&state, recovered.as_deref())?;
        Ok(Self::normalize(record))
    }

    // No public id-based endpoint; the defaulted NotSupported answer from
    // the trait is the contract here.
}
