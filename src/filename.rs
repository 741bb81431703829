use std::{path::Path, sync::OnceLock};

use regex::Regex;

/// Characters that are not allowed in file names on at least one platform
const FORBIDDEN_CHARS: &str = r#"[\\/*?:"<>|]"#;

/// Name used when the video has no title
const DEFAULT_TITLE: &str = "video";

static FORBIDDEN_RE: OnceLock<Regex> = OnceLock::new();

/// Remove the characters that cannot appear in a file name
pub fn sanitize_title(title: &str) -> String {
    FORBIDDEN_RE
        .get_or_init(|| Regex::new(FORBIDDEN_CHARS).unwrap())
        .replace_all(title, "")
        .into_owned()
}

/// Build the `yt-dlp` output template of a clip.
///
/// The user given file name is used as-is when not blank,
/// otherwise the file is named after the sanitized video title.
/// The extension is left for `yt-dlp` to fill in.
pub fn output_template(out_dir: &Path, filename: &str, title: Option<&str>) -> String {
    let filename = filename.trim();
    let basename = if filename.is_empty() {
        sanitize_title(title.unwrap_or(DEFAULT_TITLE))
    } else {
        filename.to_owned()
    };

    out_dir
        .join(format!("{basename}.%(ext)s"))
        .to_string_lossy()
        .into_owned()
}
