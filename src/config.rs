use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;

use crate::outside::{FFMPEG, YT_DLP};

/// Prefix of the environment variables overriding the settings
pub const ENV_PREFIX: &str = "YTCLIP";

/// Application settings.
///
/// Layered from lowest to highest priority: defaults, the configuration
/// file, then `YTCLIP_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Program, or path to the program, used to download videos
    pub yt_dlp: String,

    /// Program, or path to the program, `yt-dlp` relies on to cut and merge streams
    pub ffmpeg: String,

    /// Directory where clips are written by default
    pub output_dir: PathBuf,

    /// One of `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,
}

impl Settings {
    /// Load the settings.
    ///
    /// If no configuration file is given, the default one is used if it exists.
    /// A given file must exist.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let default_output_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let mut builder = Config::builder()
            .set_default("yt_dlp", YT_DLP)
            .into_diagnostic()?
            .set_default("ffmpeg", FFMPEG)
            .into_diagnostic()?
            .set_default("output_dir", default_output_dir.to_string_lossy().into_owned())
            .into_diagnostic()?
            .set_default("log_level", "info")
            .into_diagnostic()?;

        builder = match config_file {
            Some(path) => builder.add_source(File::from(path).format(FileFormat::Toml)),
            None => match default_config_file() {
                Some(path) => builder
                    .add_source(File::from(path.as_path()).format(FileFormat::Toml).required(false)),
                None => builder,
            },
        };

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .into_diagnostic()
            .wrap_err("Could not read the configuration")?
            .try_deserialize()
            .into_diagnostic()
            .wrap_err("Invalid configuration")
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.log_level
            .parse()
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid log level '{}'", self.log_level))
    }
}

/// `<config dir>/ytclip/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ytclip").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn reads_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "yt_dlp = \"/opt/yt-dlp\"\noutput_dir = \"/tmp/clips\"\nlog_level = \"debug\""
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.yt_dlp, "/opt/yt-dlp");
        assert_eq!(settings.ffmpeg, FFMPEG);
        assert_eq!(settings.output_dir, PathBuf::from("/tmp/clips"));
        assert_eq!(settings.log_level().unwrap(), tracing::Level::DEBUG);
    }

    #[test]
    fn missing_given_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "log_level = \"chatty\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert!(settings.log_level().is_err());
    }
}
