//! Data structures for resolved media

use serde::{Deserialize, Serialize};

/// Content owner, when the platform exposes one.
///
/// Every field is empty-string-safe; platforms routinely omit parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAuthor {
    pub uid: String,
    pub name: String,
    pub avatar: String,
}

/// One image of a gallery post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    pub url: String,
    /// Some platforms attach a short looping clip to an image
    /// ("live photo"); delivered as a second linked asset.
    #[serde(default)]
    pub live_photo_url: Option<String>,
}

/// Normalized output of a resolve call.
///
/// The common case is exactly one of `video_url` / `images` populated.
/// Both empty is a valid degenerate result meaning "no playable media
/// found", not an error. `images` preserves the source carousel order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub images: Vec<ImageItem>,
    #[serde(default)]
    pub author: MediaAuthor,
    /// Slug of the resolver that produced this result.
    #[serde(default)]
    pub platform: String,
}

impl MediaInfo {
    /// True when the result carries neither a video nor a gallery.
    pub fn is_empty(&self) -> bool {
        self.video_url.is_empty() && self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_result_is_valid() {
        let info = MediaInfo::default();
        assert!(info.is_empty());
        assert!(info.video_url.is_empty());
        assert!(info.images.is_empty());
    }

    #[test]
    fn gallery_result_is_not_empty() {
        let info = MediaInfo {
            images: vec![ImageItem {
                url: "https://example.com/a.jpg".to_string(),
                live_photo_url: None,
            }],
            ..Default::default()
        };
        assert!(!info.is_empty());
    }
}
