//! Drive a whole session against fake `yt-dlp` scripts.
#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use tempfile::TempDir;
use ytclip::{
    outside::{Ytdl, CANCELLED, NO_JSON_FOUND},
    types::{ClipTime, VideoMetadata},
    Error, Session, SessionObserver, SessionState,
};

const URL: &str = "https://example.com/watch?v=demo";

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Line(String),
    FetchSucceeded(String),
    FetchFailed(String),
    DownloadSucceeded,
    DownloadFailed(String),
    SelectionChanged(bool),
}

#[derive(Debug, Default)]
struct Recorder(Vec<Event>);

impl Recorder {
    fn lines(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|e| match e {
                Event::Line(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Everything but the output lines
    fn outcomes(&self) -> Vec<Event> {
        self.0
            .iter()
            .filter(|e| !matches!(e, Event::Line(_)))
            .cloned()
            .collect()
    }
}

impl SessionObserver for Recorder {
    fn on_output_line(&mut self, line: &str) {
        self.0.push(Event::Line(line.to_owned()));
    }

    fn on_fetch_succeeded(&mut self, metadata: &VideoMetadata) {
        self.0
            .push(Event::FetchSucceeded(metadata.display_title().to_owned()));
    }

    fn on_fetch_failed(&mut self, message: &str) {
        self.0.push(Event::FetchFailed(message.to_owned()));
    }

    fn on_download_succeeded(&mut self) {
        self.0.push(Event::DownloadSucceeded);
    }

    fn on_download_failed(&mut self, message: &str) {
        self.0.push(Event::DownloadFailed(message.to_owned()));
    }

    fn on_selection_changed(&mut self, audio_selection_enabled: bool) {
        self.0.push(Event::SelectionChanged(audio_selection_enabled));
    }
}

/// A fake `yt-dlp` printing `info` when asked for JSON, and recording its
/// arguments in `args.txt` when asked to download
struct FakeYtdl {
    dir: TempDir,
}

impl FakeYtdl {
    fn new(info: &str, download_exit_code: i32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args.txt");

        let script = format!(
            "#!/bin/sh\n\
            if [ \"$1\" = \"--dump-json\" ]; then\n\
              echo \"[youtube] Extracting URL: $2\"\n\
              echo 'WARNING: noisy diagnostics' >&2\n\
              echo '{info}'\n\
              exit 1\n\
            fi\n\
            printf '%s\\n' \"$@\" > '{}'\n\
            echo '[download] Destination: clip.mkv'\n\
            exit {download_exit_code}\n",
            args_file.display()
        );

        Self::with_script(dir, &script)
    }

    fn with_script(dir: TempDir, script: &str) -> Self {
        let path = dir.path().join("yt-dlp");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir }
    }

    fn program(&self) -> String {
        self.dir.path().join("yt-dlp").display().to_string()
    }

    fn session(&self) -> Session<Recorder> {
        Session::new(Ytdl::new(self.program()), Recorder::default())
    }

    fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.dir.path().join("args.txt"))
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }
}

fn demo_info(video: &str) -> String {
    format!(
        "{{\"title\": \"Demo\", \"duration\": 125, \"webpage_url\": \"{URL}\", \"formats\": [\
        {{\"format_id\": \"140\", \"ext\": \"m4a\", \"vcodec\": \"none\", \"acodec\": \"mp4a.40.2\", \"abr\": 129.5}}, \
        {video}]}}"
    )
}

const MERGED_720: &str = "{\"format_id\": \"22\", \"ext\": \"mp4\", \"vcodec\": \"avc1\", \"acodec\": \"mp4a\", \"height\": 720, \"fps\": 30}";
const VIDEO_ONLY_1080: &str = "{\"format_id\": \"137\", \"ext\": \"mp4\", \"vcodec\": \"avc1\", \"acodec\": \"none\", \"height\": 1080, \"fps\": 30}";

fn expected_args(format_spec: &str, out_dir: &Path) -> Vec<String> {
    [
        "-f",
        format_spec,
        "--download-sections",
        "*00:00:05-00:00:10",
        "--force-keyframes-at-cuts",
        "--merge-output-format",
        "mkv",
        "-o",
        format!("{}/Demo.%(ext)s", out_dir.display()).as_str(),
        URL,
    ]
    .map(String::from)
    .to_vec()
}

fn fetch(session: &mut Session<Recorder>) {
    session.request_fetch(URL).unwrap();
    assert_eq!(session.state(), SessionState::Fetching);
    assert!(!session.can_fetch());
    session.wait();
}

fn clip_5_to_10(session: &mut Session<Recorder>) {
    session
        .set_clip_range(ClipTime::from_seconds(5), ClipTime::from_seconds(10))
        .unwrap();
}

#[test]
fn merged_format_clip() {
    let fake = FakeYtdl::new(&demo_info(MERGED_720), 0);
    let mut session = fake.session();

    fetch(&mut session);
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.metadata().unwrap().duration_seconds, 125);
    assert!(session
        .observer()
        .lines()
        .contains(&format!("[youtube] Extracting URL: {URL}").as_str()));

    session.select_video_by_id("22").unwrap();
    assert!(!session.audio_selection_enabled());

    clip_5_to_10(&mut session);
    session.request_download(&fake.out_dir(), "").unwrap();
    assert_eq!(session.state(), SessionState::Downloading);
    session.wait();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(fake.recorded_args(), expected_args("22", &fake.out_dir()));
    assert_eq!(
        session.observer().outcomes(),
        [
            Event::FetchSucceeded("Demo".to_owned()),
            Event::SelectionChanged(false),
            Event::SelectionChanged(false),
            Event::DownloadSucceeded,
        ]
    );
}

#[test]
fn video_only_clip_merges_audio() {
    let fake = FakeYtdl::new(&demo_info(VIDEO_ONLY_1080), 0);
    let mut session = fake.session();

    fetch(&mut session);
    assert!(session.audio_selection_enabled());
    session.select_audio_by_id("140").unwrap();

    clip_5_to_10(&mut session);
    session.request_download(&fake.out_dir(), "").unwrap();
    session.wait();

    assert_eq!(
        fake.recorded_args(),
        expected_args("137+140", &fake.out_dir())
    );
    assert_eq!(
        session.observer().outcomes().last(),
        Some(&Event::DownloadSucceeded)
    );
}

#[test]
fn failed_download_keeps_selection() {
    let fake = FakeYtdl::new(&demo_info(VIDEO_ONLY_1080), 2);
    let mut session = fake.session();

    fetch(&mut session);
    clip_5_to_10(&mut session);
    session.request_download(&fake.out_dir(), "clip").unwrap();
    session.wait();

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.selected_video().unwrap().format_id, "137");
    assert_eq!(
        session.observer().outcomes().last(),
        Some(&Event::DownloadFailed(
            "Process finished with error code 2".to_owned()
        ))
    );

    // The user can retry right away
    assert!(session.can_download());
}

#[test]
fn fetch_without_json_fails() {
    let fake = FakeYtdl::with_script(
        tempfile::tempdir().unwrap(),
        "#!/bin/sh\necho 'ERROR: Video unavailable' >&2\nexit 1\n",
    );
    let mut session = fake.session();

    fetch(&mut session);

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.metadata().is_none());
    assert_eq!(session.observer().lines(), ["ERROR: Video unavailable"]);
    assert_eq!(
        session.observer().outcomes(),
        [Event::FetchFailed(NO_JSON_FOUND.to_owned())]
    );
}

#[test]
fn missing_program_is_named() {
    let program = "/nonexistent/dir/yt-dlp-missing";
    let mut session = Session::new(Ytdl::new(program), Recorder::default());

    fetch(&mut session);

    assert_eq!(session.state(), SessionState::Idle);
    match session.observer().outcomes().as_slice() {
        [Event::FetchFailed(msg)] => assert!(msg.contains(program), "{msg}"),
        events => panic!("unexpected events {events:?}"),
    }
}

#[test]
fn second_request_while_running_is_rejected() {
    let fake = FakeYtdl::with_script(
        tempfile::tempdir().unwrap(),
        "#!/bin/sh\necho waiting\nexec sleep 30\n",
    );
    let mut session = fake.session();

    session.request_fetch(URL).unwrap();
    assert!(matches!(session.request_fetch(URL), Err(Error::Busy)));
    assert!(matches!(
        session.request_download(&fake.out_dir(), ""),
        Err(Error::Busy)
    ));
    assert_eq!(session.state(), SessionState::Fetching);

    session.cancel();
    session.wait();

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        session.observer().outcomes(),
        [Event::FetchFailed(CANCELLED.to_owned())]
    );
}

#[test]
fn polling_delivers_lines_before_outcome() {
    let fake = FakeYtdl::new(&demo_info(MERGED_720), 0);
    let mut session = fake.session();

    session.request_fetch(URL).unwrap();

    let deadline = Instant::now() + Duration::from_secs(20);
    while session.is_busy() {
        assert!(Instant::now() < deadline, "fetch did not finish in time");
        if session.poll() == 0 {
            thread::sleep(Duration::from_millis(10));
        }
    }

    let events = &session.observer().0;
    let first_outcome = events
        .iter()
        .position(|e| !matches!(e, Event::Line(_)))
        .unwrap();
    assert!(first_outcome > 0);
    assert!(events[first_outcome..]
        .iter()
        .all(|e| !matches!(e, Event::Line(_))));
    assert_eq!(session.state(), SessionState::Ready);
}
