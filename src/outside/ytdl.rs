use crate::types::ClipTime;

use super::command::YT_DLP;

/// Container used when `yt-dlp` has to merge separate video and audio streams
pub const MERGE_OUTPUT_FORMAT: &str = "mkv";

/// Everything needed to download a clip of a video
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    /// `<video>` or `<video>+<audio>` format selector
    pub format_spec: String,
    pub start: ClipTime,
    pub end: ClipTime,
    /// `yt-dlp` output template, e.g. `/out/title.%(ext)s`
    pub output_template: String,
    pub url: String,
}

/// Command lines for the [yt-dlp](https://github.com/yt-dlp/yt-dlp) program
#[derive(Debug, Clone)]
pub struct Ytdl {
    program: String,
}

impl Default for Ytdl {
    fn default() -> Self {
        Self::new(YT_DLP)
    }
}

impl Ytdl {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Print the video information as a single JSON document, download nothing
    pub fn fetch_args(&self, url: &str) -> Vec<String> {
        vec![self.program.clone(), "--dump-json".to_owned(), url.to_owned()]
    }

    /// Download only the requested section, cutting on exact frames
    pub fn clip_args(&self, request: &ClipRequest) -> Vec<String> {
        let section = format!("*{}-{}", request.start, request.end);

        [
            self.program.as_str(),
            "-f",
            request.format_spec.as_str(),
            "--download-sections",
            section.as_str(),
            "--force-keyframes-at-cuts",
            "--merge-output-format",
            MERGE_OUTPUT_FORMAT,
            "-o",
            request.output_template.as_str(),
            request.url.as_str(),
        ]
        .map(String::from)
        .to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_fetch_command() {
        let ytdl = Ytdl::default();
        assert_eq!(
            ytdl.fetch_args("https://example.com/v"),
            ["yt-dlp", "--dump-json", "https://example.com/v"]
        );
    }

    #[test]
    fn builds_clip_command() {
        let ytdl = Ytdl::new("/opt/bin/yt-dlp");
        let request = ClipRequest {
            format_spec: "137+140".to_owned(),
            start: ClipTime::from_seconds(65),
            end: ClipTime::from_seconds(3723),
            output_template: "/out/Demo.%(ext)s".to_owned(),
            url: "https://example.com/v".to_owned(),
        };

        assert_eq!(
            ytdl.clip_args(&request),
            [
                "/opt/bin/yt-dlp",
                "-f",
                "137+140",
                "--download-sections",
                "*00:01:05-01:02:03",
                "--force-keyframes-at-cuts",
                "--merge-output-format",
                "mkv",
                "-o",
                "/out/Demo.%(ext)s",
                "https://example.com/v",
            ]
        );
    }
}
