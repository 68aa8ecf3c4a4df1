// FILE: crates/playback/src/metadata.rs

//! Metadata lookup over the tag snapshot and stream information

use crate::engine::StreamInfo;
use crate::tags::TagAggregator;
use cadence_core::{keys, StreamKind, TagList};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKey {
    Title,
    Artist,
    Album,
    Year,
    Comment,
    Genre,
    TrackNumber,
    ContainerFormat,
    VideoCodec,
    AudioCodec,
    VideoBitrate,
    AudioBitrate,
    Dimensions,
    FrameRate,
    HasAudio,
    HasVideo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    Int(u64),
    Float(f64),
    Bool(bool),
    Size { width: u32, height: u32 },
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{}", text),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:.2}", value),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Size { width, height } => write!(f, "{}x{}", width, height),
        }
    }
}

/// Looks up `key`; `None` when the media does not provide it
pub fn lookup(
    key: MetadataKey,
    tags: &TagAggregator,
    info: Option<&StreamInfo>,
) -> Option<MetadataValue> {
    let all = tags.aggregate();
    match key {
        MetadataKey::Title => text(all, keys::TITLE),
        MetadataKey::Artist => text(all, keys::ARTIST),
        MetadataKey::Album => text(all, keys::ALBUM),
        MetadataKey::Year => all
            .text(keys::DATE)
            .and_then(|date| date.get(..4))
            .filter(|year| year.chars().all(|c| c.is_ascii_digit()))
            .map(|year| MetadataValue::Text(year.to_string())),
        MetadataKey::Comment => text(all, keys::COMMENT),
        MetadataKey::Genre => text(all, keys::GENRE),
        MetadataKey::TrackNumber => all.uint(keys::TRACK_NUMBER).map(MetadataValue::Int),
        MetadataKey::ContainerFormat => text(all, keys::CONTAINER_FORMAT),
        MetadataKey::VideoCodec => text(tags.stream(StreamKind::Video), keys::VIDEO_CODEC),
        MetadataKey::AudioCodec => text(tags.stream(StreamKind::Audio), keys::AUDIO_CODEC),
        MetadataKey::VideoBitrate => bitrate(tags.stream(StreamKind::Video)),
        MetadataKey::AudioBitrate => bitrate(tags.stream(StreamKind::Audio)),
        MetadataKey::Dimensions => info
            .and_then(|i| i.video_size)
            .map(|(width, height)| MetadataValue::Size { width, height }),
        MetadataKey::FrameRate => info.and_then(|i| i.frame_rate).map(MetadataValue::Float),
        MetadataKey::HasAudio => info.map(|i| MetadataValue::Bool(i.has_audio())),
        MetadataKey::HasVideo => info.map(|i| MetadataValue::Bool(i.has_video())),
    }
}

fn text(tags: &TagList, key: &str) -> Option<MetadataValue> {
    tags.text(key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| MetadataValue::Text(s.to_string()))
}

/// Bitrate in kbit/s, preferring the measured over the nominal value
fn bitrate(tags: &TagList) -> Option<MetadataValue> {
    tags.uint(keys::BITRATE)
        .or_else(|| tags.uint(keys::NOMINAL_BITRATE))
        .map(|bps| MetadataValue::Int(bps / 1000))
}
