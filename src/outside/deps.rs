use indoc::indoc;
use tracing::debug;

use super::command::{FFMPEG, YT_DLP};

/// External programs the application cannot work without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    YtDlp,
    Ffmpeg,
}

impl Dependency {
    pub fn name(self) -> &'static str {
        match self {
            Dependency::YtDlp => YT_DLP,
            Dependency::Ffmpeg => FFMPEG,
        }
    }

    fn install_instructions(self) -> &'static str {
        match self {
            Dependency::YtDlp => indoc! {"
                # To install yt-dlp (recommended):
                sudo curl -L https://github.com/yt-dlp/yt-dlp/releases/latest/download/yt-dlp -o /usr/local/bin/yt-dlp
                sudo chmod a+rx /usr/local/bin/yt-dlp

                # Or to update an existing installation:
                sudo yt-dlp -U
            "},
            Dependency::Ffmpeg => indoc! {"
                # To install ffmpeg (for Debian/Ubuntu/Mint):
                sudo apt update && sudo apt install ffmpeg
            "},
        }
    }
}

/// Return the dependencies whose program cannot be found in the `PATH`.
///
/// Each dependency comes with the program to look for, which may be
/// a custom name or path instead of the default one.
pub fn find_missing(required: &[(Dependency, &str)]) -> Vec<Dependency> {
    required
        .iter()
        .filter(|(dep, program)| match which::which(program) {
            Ok(path) => {
                debug!("{} found at {}", dep.name(), path.display());
                false
            }
            Err(_) => true,
        })
        .map(|(dep, _)| *dep)
        .collect()
}

/// One-line explanation of what is missing
pub fn missing_message(missing: &[Dependency]) -> String {
    let names = missing
        .iter()
        .map(|dep| format!("`{}`", dep.name()))
        .collect::<Vec<_>>()
        .join(" and ");

    format!("This application requires {names} to function.")
}

/// Shell commands installing the missing dependencies
pub fn install_help(missing: &[Dependency]) -> String {
    let mut help = String::from(
        "Please install the missing components by running the following \
        commands in your terminal, then restart the application:\n\n",
    );
    for dep in missing {
        help.push_str(dep.install_instructions());
        help.push('\n');
    }
    help
}
