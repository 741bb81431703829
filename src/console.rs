use owo_colors::OwoColorize;

use crate::{
    session::SessionObserver,
    types::{ClipTime, FormatLists, VideoMetadata},
};

/// Front-end printing the session events to the terminal.
///
/// Command output goes to `stdout`, the rest is left to the logs.
#[derive(Debug, Default)]
pub struct ConsoleObserver {
    /// Message of the last failure, cleared when something succeeds
    failure: Option<String>,
    audio_enabled: bool,
}

impl ConsoleObserver {
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }
}

impl SessionObserver for ConsoleObserver {
    fn on_output_line(&mut self, line: &str) {
        println!("{} {line}", "|".dimmed());
    }

    fn on_fetch_succeeded(&mut self, metadata: &VideoMetadata) {
        self.failure = None;
        println!("{} {}", "Video title:".bold(), metadata.display_title());
        println!(
            "{} {}",
            "Duration:".bold(),
            ClipTime::from_seconds(metadata.duration_seconds)
        );
    }

    fn on_fetch_failed(&mut self, message: &str) {
        self.failure = Some(format!("Failed to fetch video info: {message}"));
    }

    fn on_download_succeeded(&mut self) {
        self.failure = None;
        println!("{}", "Video clip has been downloaded!".green());
    }

    fn on_download_failed(&mut self, message: &str) {
        self.failure = Some(format!(
            "The download failed: {message}. Check the log for details"
        ));
    }

    fn on_selection_changed(&mut self, audio_selection_enabled: bool) {
        self.audio_enabled = audio_selection_enabled;
    }
}

/// Print the quality lists with the ids to pass on the command line
pub fn print_formats(lists: &FormatLists) {
    println!("{}", "Video qualities:".bold());
    for choice in &lists.video {
        println!("  {:>8}  {}", choice.entry.format_id.cyan(), choice.label);
    }

    println!("{}", "Audio qualities:".bold());
    for choice in &lists.audio {
        println!("  {:>8}  {}", choice.entry.format_id.cyan(), choice.label);
    }
}
