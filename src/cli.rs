use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::types::ClipTime;

macro_rules! arg_env {
    ($v:literal) => {
        concat!("YTCLIP_", $v)
    };
}

/// Clip a time range out of a web video.
///
/// Fetch the available formats of the video, then let `yt-dlp` download
/// only the wanted section in the chosen quality.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The URL of the video
    pub url: String,

    /// Only list the available formats, do not download anything
    #[arg(long)]
    pub list: bool,

    /// The id of the video format to download.
    /// Defaults to the best quality
    #[arg(long, env = arg_env!("VIDEO"))]
    pub video: Option<String>,

    /// The id of the audio format to merge with a video only format.
    /// Defaults to the first listed audio format
    #[arg(long, env = arg_env!("AUDIO"))]
    pub audio: Option<String>,

    /// Start of the clip, as `HH:MM:SS`, `MM:SS` or seconds.
    /// Defaults to the start of the video
    #[arg(long)]
    pub start: Option<ClipTime>,

    /// End of the clip, as `HH:MM:SS`, `MM:SS` or seconds.
    /// Defaults to the end of the video
    #[arg(long)]
    pub end: Option<ClipTime>,

    /// The path to the output directory.
    /// Defaults to the configured one
    #[arg(long, env = arg_env!("OUT"))]
    pub out: Option<PathBuf>,

    /// The output file name, without extension.
    /// Defaults to the video title
    #[arg(long, default_value = "")]
    pub filename: String,

    /// The path to the configuration file
    #[arg(long, env = arg_env!("CONFIG"))]
    pub config: Option<PathBuf>,

    /// Log more details. Can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
