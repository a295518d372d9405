//! Types for the content module.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque, caller-supplied identifier (URL) of an item or a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaReference(String);

impl MediaReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaReference {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MediaReference {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One downloadable encoded variant of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Identifier of the variant within the item (e.g. a format id).
    pub id: String,
    /// Container name, used as the file extension (e.g. "webm", "m4a").
    pub container: String,
    /// Average bitrate in kbps.
    pub bitrate_kbps: u32,
    /// Whether the variant carries audio and no video.
    pub audio_only: bool,
    /// Video height for video variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_height: Option<u32>,
    /// Direct URL the variant can be fetched from, when the client exposes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Extra HTTP headers required to fetch `url`.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl StreamDescriptor {
    /// Creates an audio-only descriptor.
    pub fn audio(id: impl Into<String>, container: impl Into<String>, bitrate_kbps: u32) -> Self {
        Self {
            id: id.into(),
            container: container.into(),
            bitrate_kbps,
            audio_only: true,
            video_height: None,
            url: None,
            headers: HashMap::new(),
        }
    }

    /// Creates a video descriptor.
    pub fn video(
        id: impl Into<String>,
        container: impl Into<String>,
        bitrate_kbps: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            container: container.into(),
            bitrate_kbps,
            audio_only: false,
            video_height: Some(height),
            url: None,
            headers: HashMap::new(),
        }
    }

    /// Sets the direct URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Metadata of a resolved item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMetadata {
    /// Reference the metadata was resolved from.
    pub reference: MediaReference,
    /// Human-readable title.
    pub title: String,
    /// Available variants, in the order the service returned them.
    pub streams: Vec<StreamDescriptor>,
    /// Duration in seconds, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Uploader or channel name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}

impl ItemMetadata {
    pub fn new(
        reference: MediaReference,
        title: impl Into<String>,
        streams: Vec<StreamDescriptor>,
    ) -> Self {
        Self {
            reference,
            title: title.into(),
            streams,
            duration_secs: None,
            uploader: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_reference_display_and_serde() {
        let reference = MediaReference::from("https://example.com/watch?v=abc");
        assert_eq!(reference.to_string(), "https://example.com/watch?v=abc");

        let json = serde_json::to_string(&reference).unwrap();
        assert_eq!(json, "\"https://example.com/watch?v=abc\"");
    }

    #[test]
    fn test_stream_constructors() {
        let audio = StreamDescriptor::audio("251", "webm", 160).with_url("https://cdn/a");
        assert!(audio.audio_only);
        assert_eq!(audio.url.as_deref(), Some("https://cdn/a"));

        let video = StreamDescriptor::video("136", "mp4", 2500, 720);
        assert!(!video.audio_only);
        assert_eq!(video.video_height, Some(720));
    }
}
