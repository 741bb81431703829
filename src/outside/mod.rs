mod command;
mod deps;
mod ytdl;

pub use command::{
    classify_output, display_command, Execution, Outcome, RunnerEvent, CANCELLED, FFMPEG,
    INVALID_JSON, NO_JSON_FOUND, YT_DLP,
};
pub use deps::{find_missing, install_help, missing_message, Dependency};
pub use ytdl::{ClipRequest, Ytdl, MERGE_OUTPUT_FORMAT};
