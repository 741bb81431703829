use miette::{Context, IntoDiagnostic};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::result::{bail, Result};

/// Value used by `yt-dlp` when a format has no stream of a kind
const NO_CODEC: &str = "none";

/// Read a field, treating a value of an unexpected type like a missing one
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// One media stream option of a video, as listed by `yt-dlp`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FormatEntry {
    /// Opaque identifier understood by `yt-dlp`
    #[serde(default, deserialize_with = "lenient")]
    pub format_id: String,

    #[serde(rename = "ext", default, deserialize_with = "lenient")]
    pub extension: String,

    #[serde(rename = "vcodec", default, deserialize_with = "lenient")]
    pub video_codec: Option<String>,

    #[serde(rename = "acodec", default, deserialize_with = "lenient")]
    pub audio_codec: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<u32>,

    #[serde(rename = "fps", default, deserialize_with = "lenient")]
    pub frame_rate: Option<f64>,

    #[serde(rename = "abr", default, deserialize_with = "lenient")]
    pub average_bitrate_kbps: Option<f64>,
}

fn is_codec(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| c != NO_CODEC)
}

impl FormatEntry {
    /// Carries a video stream of known height
    pub fn is_video_capable(&self) -> bool {
        is_codec(self.video_codec.as_deref()) && self.height.is_some_and(|h| h > 0)
    }

    pub fn is_audio_capable(&self) -> bool {
        is_codec(self.audio_codec.as_deref())
    }

    /// A video format that carries its own audio stream
    pub fn is_merged(&self) -> bool {
        self.is_video_capable() && self.is_audio_capable()
    }

    /// Label shown in the video quality list
    pub fn video_label(&self) -> String {
        let fps = self
            .frame_rate
            .map_or_else(|| "N/A".to_owned(), |fps| fps.to_string());
        let note = if self.is_merged() {
            "(Video+Audio)"
        } else {
            "(Video Only)"
        };

        format!(
            "{}p ({fps}fps, {}) {note}",
            self.height.unwrap_or(0),
            self.extension
        )
    }

    /// Label shown in the audio quality list
    pub fn audio_label(&self) -> String {
        format!(
            "{}k ({}, {})",
            self.average_bitrate_kbps.unwrap_or(0.0),
            self.audio_codec.as_deref().unwrap_or(NO_CODEC),
            self.extension
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    webpage_url: Option<String>,
    /// Kept raw so one odd entry does not discard the others
    #[serde(default, deserialize_with = "lenient")]
    formats: Vec<Value>,
}

/// Information about a video, parsed from the `yt-dlp --dump-json` output.
///
/// Only the few fields needed to pick formats and build the download
/// command are kept, the rest of the document is ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub duration_seconds: u64,
    pub webpage_url: Option<String>,
    pub formats: Vec<FormatEntry>,
}

impl VideoMetadata {
    pub fn from_json(value: Value) -> Result<Self> {
        if !value.as_object().is_some_and(|obj| !obj.is_empty()) {
            return bail("Received empty video information.");
        }

        let raw: RawMetadata = serde_json::from_value(value)
            .into_diagnostic()
            .wrap_err("Unexpected video information layout")?;

        Ok(Self {
            title: raw.title,
            // Some extractors give a fractional duration
            duration_seconds: raw.duration.map_or(0, |d| d.max(0.0) as u64),
            webpage_url: raw.webpage_url,
            formats: raw
                .formats
                .into_iter()
                .filter_map(|format| match serde_json::from_value(format) {
                    Ok(entry) => Some(entry),
                    Err(err) => {
                        debug!("Skipping unreadable format: {err}");
                        None
                    }
                })
                .collect(),
        })
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("N/A")
    }
}
