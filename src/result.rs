use std::fmt::Display;

use miette::miette;

#[derive(Debug)]
pub enum Error {
    /// The URL to fetch is empty
    EmptyUrl,

    /// No video information is loaded, so nothing can be downloaded
    NoVideoInfo,

    NoVideoSelected,

    /// The selected video format has no audio stream and no audio format is selected
    MissingAudio,

    /// The clip does not start before it ends
    InvalidRange,

    /// A clip bound is past the end of the video
    OutOfRange,

    UnknownFormat(String),

    /// A command is already running
    Busy,

    Miette(miette::Report),
}

impl Error {
    /// Whether the error comes from a rejected user request rather than
    /// from something going wrong while handling it.
    pub fn is_input_error(&self) -> bool {
        !matches!(self, Error::Miette(_))
    }

    pub fn wrap_err_with<D, F>(self, f: F) -> Error
    where
        D: Display + Send + Sync + 'static,
        F: FnOnce() -> D,
    {
        match self {
            Error::Miette(report) => Error::Miette(report.wrap_err(f())),
            err => err,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptyUrl => write!(f, "Please enter a video URL."),
            Error::NoVideoInfo => write!(f, "No video information loaded. Fetch it first."),
            Error::NoVideoSelected => write!(f, "Please select a video quality."),
            Error::MissingAudio => write!(
                f,
                "This video format has no audio. Please select an audio format to merge."
            ),
            Error::InvalidRange => write!(f, "Start time must be before end time."),
            Error::OutOfRange => write!(f, "Clip times cannot go past the end of the video."),
            Error::UnknownFormat(id) => write!(f, "No format with id '{id}'"),
            Error::Busy => write!(f, "Another command is still running."),
            // Alternate form to keep the causes in the message
            Error::Miette(report) => write!(f, "{report:#}"),
        }
    }
}

impl From<miette::Report> for Error {
    fn from(err: miette::Report) -> Self {
        Error::Miette(err)
    }
}

impl From<Error> for miette::Report {
    fn from(err: Error) -> Self {
        match err {
            Error::Miette(err) => err,
            err => miette!("{err}"),
        }
    }
}

/// Build an error out of a simple message
pub fn err_msg<D>(msg: D) -> Error
where
    D: Display + Send + Sync + 'static,
{
    Error::Miette(miette!("{msg}"))
}

/// Return early with an error built out of a simple message
pub fn bail<T, D>(msg: D) -> Result<T>
where
    D: Display + Send + Sync + 'static,
{
    Err(err_msg(msg))
}

pub type Result<T> = std::result::Result<T, Error>;
