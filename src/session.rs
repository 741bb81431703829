use std::path::Path;

use crossbeam_channel::TryRecvError;
use tracing::{debug, error, info, warn};

use crate::{
    filename::output_template,
    outside::{display_command, ClipRequest, Execution, Outcome, RunnerEvent, Ytdl},
    result::{err_msg, Error, Result},
    types::{ClipTime, FormatEntry, FormatLists, VideoMetadata},
};

const RUNNER_LOST: &str = "The command runner stopped without reporting a result";

/// Receiver of everything the session has to tell the front-end.
///
/// All methods are called from the thread driving the session
/// ([`Session::poll`] or [`Session::wait`]), in the order things happened.
pub trait SessionObserver {
    /// A line printed by the running command
    fn on_output_line(&mut self, line: &str);

    fn on_fetch_succeeded(&mut self, metadata: &VideoMetadata);

    fn on_fetch_failed(&mut self, message: &str);

    fn on_download_succeeded(&mut self);

    fn on_download_failed(&mut self, message: &str);

    /// The selected video format changed, the audio selection must be
    /// enabled only if that format has no audio of its own
    fn on_selection_changed(&mut self, audio_selection_enabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing running and no video information usable for a download
    Idle,
    Fetching,
    /// Video information loaded, a clip can be downloaded
    Ready,
    Downloading,
}

#[derive(Debug, Clone, Copy, Default)]
struct Selection {
    /// Index in the video list
    video: Option<usize>,
    /// Index in the audio list
    audio: Option<usize>,
}

/// State of one user session: the fetched video, the selected formats and
/// clip range, and the command currently running.
///
/// At most one command runs at a time. Requests made while one is running
/// are rejected with [`Error::Busy`].
pub struct Session<O> {
    ytdl: Ytdl,
    observer: O,
    state: SessionState,
    active: Option<Execution>,

    /// URL of the fetch in progress
    pending_url: Option<String>,

    metadata: Option<VideoMetadata>,
    /// URL the loaded metadata was fetched from
    metadata_url: Option<String>,
    lists: FormatLists,
    selection: Selection,
    range: (ClipTime, ClipTime),
}

impl<O: SessionObserver> Session<O> {
    pub fn new(ytdl: Ytdl, observer: O) -> Self {
        Self {
            ytdl,
            observer,
            state: SessionState::Idle,
            active: None,
            pending_url: None,
            metadata: None,
            metadata_url: None,
            lists: FormatLists::default(),
            selection: Selection::default(),
            range: (ClipTime::ZERO, ClipTime::ZERO),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        self.metadata.as_ref()
    }

    pub fn format_lists(&self) -> &FormatLists {
        &self.lists
    }

    pub fn clip_range(&self) -> (ClipTime, ClipTime) {
        self.range
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn can_fetch(&self) -> bool {
        !self.is_busy()
    }

    pub fn can_download(&self) -> bool {
        !self.is_busy() && self.state == SessionState::Ready
    }

    pub fn selected_video(&self) -> Option<&FormatEntry> {
        self.selection
            .video
            .and_then(|i| self.lists.video.get(i))
            .map(|c| &c.entry)
    }

    /// The selected audio format, kept even while the audio selection is disabled
    pub fn selected_audio(&self) -> Option<&FormatEntry> {
        self.selection
            .audio
            .and_then(|i| self.lists.audio.get(i))
            .map(|c| &c.entry)
    }

    pub fn audio_selection_enabled(&self) -> bool {
        self.selected_video().is_some_and(|v| !v.is_merged())
    }

    /// Start fetching the information of the video at `url`
    pub fn request_fetch(&mut self, url: &str) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }

        let url = url.trim();
        if url.is_empty() {
            return Err(Error::EmptyUrl);
        }

        info!("Fetching info for: {url}...");
        let argv = self.ytdl.fetch_args(url);
        self.pending_url = Some(url.to_owned());
        self.active = Some(Execution::start(argv, true));
        self.state = SessionState::Fetching;

        Ok(())
    }

    /// Select an entry of the video list
    pub fn select_video(&mut self, index: usize) -> Result<()> {
        if index >= self.lists.video.len() {
            return Err(Error::UnknownFormat(format!("#{index}")));
        }

        self.selection.video = Some(index);
        debug!("Video format '{}' selected", self.lists.video[index].entry.format_id);

        let enabled = self.audio_selection_enabled();
        self.observer.on_selection_changed(enabled);
        Ok(())
    }

    pub fn select_video_by_id(&mut self, format_id: &str) -> Result<()> {
        let index = self
            .lists
            .video_position(format_id)
            .ok_or_else(|| Error::UnknownFormat(format_id.to_owned()))?;
        self.select_video(index)
    }

    /// Select an entry of the audio list
    pub fn select_audio(&mut self, index: usize) -> Result<()> {
        if index >= self.lists.audio.len() {
            return Err(Error::UnknownFormat(format!("#{index}")));
        }

        self.selection.audio = Some(index);
        debug!("Audio format '{}' selected", self.lists.audio[index].entry.format_id);
        Ok(())
    }

    pub fn select_audio_by_id(&mut self, format_id: &str) -> Result<()> {
        let index = self
            .lists
            .audio_position(format_id)
            .ok_or_else(|| Error::UnknownFormat(format_id.to_owned()))?;
        self.select_audio(index)
    }

    /// Set the part of the video to download.
    ///
    /// Both bounds must be within the video. Whether the clip starts
    /// before it ends is only checked when downloading.
    pub fn set_clip_range(&mut self, start: ClipTime, end: ClipTime) -> Result<()> {
        let metadata = self.metadata.as_ref().ok_or(Error::NoVideoInfo)?;

        let duration = ClipTime::from_seconds(metadata.duration_seconds);
        if start > duration || end > duration {
            return Err(Error::OutOfRange);
        }

        self.range = (start, end);
        Ok(())
    }

    /// Build the download command of the current selection, without running it
    pub fn download_args(&self, out_dir: &Path, filename: &str) -> Result<Vec<String>> {
        let metadata = self.metadata.as_ref().ok_or(Error::NoVideoInfo)?;
        let video = self.selected_video().ok_or(Error::NoVideoSelected)?;

        let format_spec = if video.is_merged() {
            video.format_id.clone()
        } else {
            let audio = self.selected_audio().ok_or(Error::MissingAudio)?;
            format!("{}+{}", video.format_id, audio.format_id)
        };

        let (start, end) = self.range;
        if start >= end {
            return Err(Error::InvalidRange);
        }

        let url = metadata
            .webpage_url
            .clone()
            .or_else(|| self.metadata_url.clone())
            .ok_or_else(|| err_msg("The video information has no web page URL"))?;

        Ok(self.ytdl.clip_args(&ClipRequest {
            format_spec,
            start,
            end,
            output_template: output_template(out_dir, filename, metadata.title.as_deref()),
            url,
        }))
    }

    /// Start downloading the selected clip into `out_dir`.
    ///
    /// `filename` is the name of the file without extension.
    /// If blank, the video title is used.
    pub fn request_download(&mut self, out_dir: &Path, filename: &str) -> Result<()> {
        if self.is_busy() {
            return Err(Error::Busy);
        }
        if self.state != SessionState::Ready {
            return Err(Error::NoVideoInfo);
        }

        let argv = self.download_args(out_dir, filename)?;
        info!("Starting download with command: {}", display_command(&argv));

        self.active = Some(Execution::start(argv, false));
        self.state = SessionState::Downloading;

        Ok(())
    }

    /// Stop the running command, if any.
    /// The command then fails like any other would.
    pub fn cancel(&self) {
        if let Some(exec) = &self.active {
            exec.cancel();
        }
    }

    /// Handle the events already sent by the running command, without blocking.
    /// Return the number of events handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let event = match self.active.as_ref().map(|exec| exec.events().try_recv()) {
                None | Some(Err(TryRecvError::Empty)) => break,
                Some(Ok(event)) => event,
                Some(Err(TryRecvError::Disconnected)) => {
                    RunnerEvent::Finished(Outcome::Failed(RUNNER_LOST.to_owned()))
                }
            };

            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Handle the events of the running command until it finishes
    pub fn wait(&mut self) {
        while let Some(res) = self.active.as_ref().map(|exec| exec.events().recv()) {
            let event = res.unwrap_or_else(|_| {
                RunnerEvent::Finished(Outcome::Failed(RUNNER_LOST.to_owned()))
            });
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: RunnerEvent) {
        let outcome = match event {
            RunnerEvent::Line(line) => {
                self.observer.on_output_line(&line);
                return;
            }
            RunnerEvent::Finished(outcome) => outcome,
        };

        self.active = None;

        match (self.state, outcome) {
            (SessionState::Fetching, Outcome::SucceededWithData(value)) => {
                match VideoMetadata::from_json(value) {
                    Ok(metadata) => self.load(metadata),
                    Err(err) => self.fail_fetch(&err.to_string()),
                }
            }
            (SessionState::Fetching, Outcome::SucceededEmpty) => {
                self.fail_fetch("Received empty video information.")
            }
            (SessionState::Fetching, Outcome::Failed(msg)) => self.fail_fetch(&msg),

            (SessionState::Downloading, Outcome::Failed(msg)) => {
                error!("Download failed: {msg}");
                self.state = SessionState::Ready;
                self.observer.on_download_failed(&msg);
            }
            (SessionState::Downloading, _) => {
                info!("Download completed successfully!");
                self.state = SessionState::Ready;
                self.observer.on_download_succeeded();
            }

            (state, outcome) => warn!("Ignoring outcome {outcome:?} received while {state:?}"),
        }
    }

    /// Replace the video information and reset everything derived from it
    fn load(&mut self, metadata: VideoMetadata) {
        info!("Successfully parsed video information!");
        debug!("title    = {}", metadata.display_title());
        debug!("duration = {}", metadata.duration_seconds);
        debug!("formats  = {}", metadata.formats.len());

        self.lists = FormatLists::from_formats(&metadata.formats);
        self.selection = Selection {
            video: (!self.lists.video.is_empty()).then_some(0),
            audio: (!self.lists.audio.is_empty()).then_some(0),
        };
        self.range = (
            ClipTime::ZERO,
            ClipTime::from_seconds(metadata.duration_seconds),
        );
        self.metadata_url = self.pending_url.take();
        self.metadata = Some(metadata);
        self.state = SessionState::Ready;

        if let Some(metadata) = &self.metadata {
            self.observer.on_fetch_succeeded(metadata);
        }
        let enabled = self.audio_selection_enabled();
        self.observer.on_selection_changed(enabled);
    }

    /// Keep the previous video information, but do not allow downloading
    /// until a fetch succeeds
    fn fail_fetch(&mut self, msg: &str) {
        error!("Failed to fetch video info: {msg}");
        self.pending_url = None;
        self.state = SessionState::Idle;
        self.observer.on_fetch_failed(msg);
    }
}
