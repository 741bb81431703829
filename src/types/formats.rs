use std::cmp::Reverse;

use super::FormatEntry;

/// An entry of a quality list, with the label to show for it
#[derive(Debug, Clone, PartialEq)]
pub struct FormatChoice {
    pub label: String,
    pub entry: FormatEntry,
}

/// The video and audio quality lists derived from the formats of a video
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatLists {
    /// Video capable formats, best quality first
    pub video: Vec<FormatChoice>,

    /// Formats carrying only audio, in the order `yt-dlp` listed them
    pub audio: Vec<FormatChoice>,
}

impl FormatLists {
    pub fn from_formats(formats: &[FormatEntry]) -> Self {
        let mut video: Vec<&FormatEntry> = formats.iter().filter(|f| f.is_video_capable()).collect();
        // Stable sort, formats of the same height keep their listed order
        video.sort_by_key(|f| Reverse(f.height.unwrap_or(0)));

        let video = video
            .into_iter()
            .map(|f| FormatChoice {
                label: f.video_label(),
                entry: f.clone(),
            })
            .collect();

        let audio = formats
            .iter()
            .filter(|f| f.is_audio_capable() && !f.is_video_capable())
            .map(|f| FormatChoice {
                label: f.audio_label(),
                entry: f.clone(),
            })
            .collect();

        Self { video, audio }
    }

    pub fn video_position(&self, format_id: &str) -> Option<usize> {
        self.video
            .iter()
            .position(|c| c.entry.format_id == format_id)
    }

    pub fn audio_position(&self, format_id: &str) -> Option<usize> {
        self.audio
            .iter()
            .position(|c| c.entry.format_id == format_id)
    }
}
