//! Stream metadata tags

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Well-known tag keys
pub mod keys {
    pub const TITLE: &str = "title";
    pub const ARTIST: &str = "artist";
    pub const ALBUM: &str = "album";
    pub const DATE: &str = "date";
    pub const COMMENT: &str = "comment";
    pub const GENRE: &str = "genre";
    pub const TRACK_NUMBER: &str = "track-number";
    pub const CONTAINER_FORMAT: &str = "container-format";
    pub const VIDEO_CODEC: &str = "video-codec";
    pub const AUDIO_CODEC: &str = "audio-codec";
    pub const BITRATE: &str = "bitrate";
    pub const NOMINAL_BITRATE: &str = "nominal-bitrate";
    pub const LANGUAGE_CODE: &str = "language-code";
    pub const IMAGE: &str = "image";
    pub const PREVIEW_IMAGE: &str = "preview-image";
}

/// Kind of elementary stream a tag set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Text,
}

impl StreamKind {
    pub const ALL: [StreamKind; 3] = [Self::Video, Self::Audio, Self::Text];
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Role of an embedded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    FrontCover,
    Undefined,
    Other,
}

/// An image carried in a tag (album art, preview frame)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    pub kind: ImageKind,
}

impl CoverImage {
    pub fn new(data: Vec<u8>, kind: ImageKind) -> Self {
        Self {
            data,
            mime_type: None,
            kind,
        }
    }
}

/// A single tag value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Text(String),
    UInt(u64),
    Int(i64),
    Float(f64),
    Image(CoverImage),
}

impl TagValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&CoverImage> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for TagValue {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

/// Key/value tag set; one value per key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagList {
    entries: BTreeMap<String, TagValue>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TagValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.entries.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(TagValue::as_text)
    }

    pub fn uint(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(TagValue::as_uint)
    }

    /// Merges `other` into `self`; values from `other` replace colliding keys
    pub fn merge_from(&mut self, other: &TagList) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
