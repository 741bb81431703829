use std::{
    io::{BufRead, BufReader, ErrorKind, Read},
    process::{Child, Command, Stdio},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{bounded, never, select, tick, unbounded, Receiver, Sender};
use miette::{Context, IntoDiagnostic};
use tracing::{debug, trace};

use crate::result::{bail, err_msg, Result};

pub const YT_DLP: &str = "yt-dlp";
pub const FFMPEG: &str = "ffmpeg";

pub const NO_JSON_FOUND: &str = "Could not find video information in the output.";
pub const INVALID_JSON: &str = "Failed to parse video information from yt-dlp's output.";
pub const CANCELLED: &str = "cancelled";

/// How often a running command is checked for exit
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How a command execution ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A JSON document was found in the output
    SucceededWithData(serde_json::Value),
    SucceededEmpty,
    Failed(String),
}

/// Message sent by a running command.
///
/// Every execution sends its output lines in order, followed by exactly
/// one [`RunnerEvent::Finished`]. Nothing is sent after it.
#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    Line(String),
    Finished(Outcome),
}

/// Handle to a command running in the background.
#[derive(Debug)]
pub struct Execution {
    argv: Vec<String>,
    events: Receiver<RunnerEvent>,
    cancel: Sender<()>,
}

impl Execution {
    /// Run the command on a dedicated thread, merging its `stdout` and `stderr`.
    ///
    /// If `expect_json` is set, the outcome is decided by the JSON found in the
    /// output rather than by the exit status.
    ///
    /// This never fails: problems are reported through the
    /// [`Outcome::Failed`] event.
    pub fn start(argv: Vec<String>, expect_json: bool) -> Self {
        let (event_tx, events) = unbounded();
        let (cancel, cancel_rx) = bounded(1);

        let thread_argv = argv.clone();
        let thread_tx = event_tx.clone();
        let spawned = thread::Builder::new()
            .name("runner".to_owned())
            .spawn(move || {
                let outcome = run(&thread_argv, expect_json, &thread_tx, &cancel_rx)
                    .unwrap_or_else(|err| Outcome::Failed(err.to_string()));

                match &outcome {
                    Outcome::Failed(msg) => debug!("Command failed: {msg}"),
                    _ => debug!("Command succeeded"),
                }

                // The receiving side may be gone, nobody left to notify then
                let _ = thread_tx.send(RunnerEvent::Finished(outcome));
            });

        if let Err(err) = spawned {
            let _ = event_tx.send(RunnerEvent::Finished(Outcome::Failed(format!(
                "Could not start the command thread: {err}"
            ))));
        }

        Self {
            argv,
            events,
            cancel,
        }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Channel of the events of this execution.
    /// It is disconnected once the final event has been sent.
    pub fn events(&self) -> &Receiver<RunnerEvent> {
        &self.events
    }

    /// Kill the process. The execution then finishes with a
    /// [`CANCELLED`] failure and no more lines are sent.
    ///
    /// Does nothing if the process already ended.
    pub fn cancel(&self) {
        let _ = self.cancel.try_send(());
    }
}

/// Render the command line the way a shell user would type it
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.contains(' ') {
                format!("'{arg}'")
            } else {
                arg.to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn not_found(program: &str) -> Outcome {
    Outcome::Failed(format!(
        "Error: Command '{program}' not found. Is it in your PATH?"
    ))
}

fn run(
    argv: &[String],
    expect_json: bool,
    events: &Sender<RunnerEvent>,
    cancel: &Receiver<()>,
) -> Result<Outcome> {
    let Some((program, args)) = argv.split_first() else {
        return bail("Empty command line");
    };

    let Ok(path) = which::which(program) else {
        return Ok(not_found(program));
    };

    // A single pipe for both outputs keeps the lines in the order they were written
    let (reader, writer) = os_pipe::pipe()
        .into_diagnostic()
        .wrap_err("Could not create the output pipe")?;
    let writer_clone = writer
        .try_clone()
        .into_diagnostic()
        .wrap_err("Could not share the output pipe")?;

    let mut cmd = Command::new(path);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(writer_clone)
        .stderr(writer);

    debug!("Executing command: {cmd:?}");
    let spawned = cmd.spawn();
    // The command holds the writing ends, the reader only sees the end of the
    // output once they are all closed
    drop(cmd);

    if matches!(&spawned, Err(err) if err.kind() == ErrorKind::NotFound) {
        return Ok(not_found(program));
    }
    let mut child = spawned
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not run {program}"))?;

    let res = follow(&mut child, reader, expect_json, events, cancel);
    if res.is_err() {
        // Do not leave the process running behind us
        let _ = child.kill();
        let _ = child.wait();
    }
    res
}

/// Forward the output of the process until it exits and closes its output,
/// then classify it
fn follow(
    child: &mut Child,
    output_pipe: os_pipe::PipeReader,
    expect_json: bool,
    events: &Sender<RunnerEvent>,
    cancel: &Receiver<()>,
) -> Result<Outcome> {
    let (line_tx, lines) = unbounded();
    let pump = spawn_pump("runner-output", output_pipe, line_tx)?;

    let exit_check = tick(EXIT_POLL_INTERVAL);
    let no_lines = never();
    let no_cancel = never();
    let no_check = never();

    let mut output_open = true;
    let mut can_cancel = true;
    let mut status = None;
    let mut output = String::new();

    while output_open || status.is_none() {
        select! {
            recv(if output_open { &lines } else { &no_lines }) -> msg => match msg {
                Ok(Ok(line)) => {
                    output.push_str(&line);

                    let line = line.trim_end_matches(['\n', '\r']);
                    trace!("{line}");
                    let _ = events.send(RunnerEvent::Line(line.to_owned()));
                }
                Ok(Err(err)) => {
                    return Err(err_msg(format!("Could not read the command output: {err}")))
                }
                // The pump is done, every writer of the pipe is closed
                Err(_) => output_open = false,
            },
            recv(if status.is_none() { &exit_check } else { &no_check }) -> _ => {
                status = child
                    .try_wait()
                    .into_diagnostic()
                    .wrap_err("Could not check whether the command exited")?;
            },
            recv(if can_cancel { cancel } else { &no_cancel }) -> msg => match msg {
                Ok(()) => {
                    debug!("Cancelling the command");
                    if status.is_none() {
                        child
                            .kill()
                            .into_diagnostic()
                            .wrap_err("Could not kill the command")?;
                        child.wait().into_diagnostic()?;
                    }
                    return Ok(Outcome::Failed(CANCELLED.to_owned()));
                }
                // The execution handle is gone, nobody can cancel anymore
                Err(_) => can_cancel = false,
            },
        }
    }

    let _ = pump.join();
    let Some(status) = status else {
        return bail("The command exit status is unknown");
    };

    debug!("status: {status}");
    debug!("output: {} bytes long", output.len());

    Ok(classify_output(&output, status.code(), expect_json))
}

/// Read a stream line by line on its own thread, replacing invalid UTF-8
fn spawn_pump<R: Read + Send + 'static>(
    name: &str,
    stream: R,
    lines: Sender<std::io::Result<String>>,
) -> Result<JoinHandle<()>> {
    let handle = thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            let mut reader = BufReader::new(stream);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf).into_owned();
                        if lines.send(Ok(line)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = lines.send(Err(err));
                        break;
                    }
                }
            }
        })
        .into_diagnostic()
        .wrap_err("Could not start an output reader thread")?;

    Ok(handle)
}

/// Decide the outcome of a finished command from its whole output and exit code.
///
/// When JSON is expected, `yt-dlp` may print diagnostics before the document
/// and exit with an error code even though the document is usable.
/// The JSON is then trusted over the exit code.
pub fn classify_output(output: &str, exit_code: Option<i32>, expect_json: bool) -> Outcome {
    if expect_json {
        let Some(start) = output.find('{') else {
            return Outcome::Failed(NO_JSON_FOUND.to_owned());
        };

        // Only the first document is read, whatever follows it is ignored
        let mut documents =
            serde_json::Deserializer::from_str(&output[start..]).into_iter::<serde_json::Value>();

        return match documents.next() {
            Some(Ok(value)) => Outcome::SucceededWithData(value),
            Some(Err(err)) => {
                debug!("Invalid JSON output: {err}");
                Outcome::Failed(INVALID_JSON.to_owned())
            }
            None => Outcome::Failed(INVALID_JSON.to_owned()),
        };
    }

    match exit_code {
        Some(0) => Outcome::SucceededEmpty,
        Some(code) => Outcome::Failed(format!("Process finished with error code {code}")),
        None => Outcome::Failed("Process was terminated by a signal".to_owned()),
    }
}
