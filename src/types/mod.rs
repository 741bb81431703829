mod clip_time;
mod formats;
mod metadata;

pub use clip_time::ClipTime;
pub use formats::{FormatChoice, FormatLists};
pub use metadata::{FormatEntry, VideoMetadata};
