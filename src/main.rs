use clap::Parser;
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing::{debug, info, warn, Level};

use ytclip::{
    cli::Args,
    config::Settings,
    console::{print_formats, ConsoleObserver},
    logging::init_logging,
    outside::{find_missing, install_help, missing_message, Dependency, Ytdl},
    Session,
};

fn main() -> Result<()> {
    // Initialize the CLI, settings & logging
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    let level = match args.verbose {
        0 => settings.log_level()?,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    init_logging(level)?;
    debug!("{settings:?}");

    // Nothing can be done without the external programs
    let missing = find_missing(&[
        (Dependency::YtDlp, settings.yt_dlp.as_str()),
        (Dependency::Ffmpeg, settings.ffmpeg.as_str()),
    ]);
    if !missing.is_empty() {
        return Err(miette!(
            help = install_help(&missing),
            "{}",
            missing_message(&missing)
        ));
    }

    let mut session = Session::new(
        Ytdl::new(settings.yt_dlp.as_str()),
        ConsoleObserver::default(),
    );

    session.request_fetch(&args.url)?;
    session.wait();
    if let Some(failure) = session.observer().failure() {
        return Err(miette!("{failure}"));
    }

    print_formats(session.format_lists());
    if args.list {
        return Ok(());
    }

    if let Some(id) = &args.video {
        session.select_video_by_id(id)?;
    }
    if let Some(id) = &args.audio {
        session.select_audio_by_id(id)?;
        if !session.observer().audio_enabled() {
            warn!("The selected video format has its own audio, --audio is ignored");
        }
    }

    let (start, end) = session.clip_range();
    session.set_clip_range(args.start.unwrap_or(start), args.end.unwrap_or(end))?;

    // Make sure the output directory exists
    let out_dir = args.out.as_ref().unwrap_or(&settings.output_dir);
    std::fs::create_dir_all(out_dir)
        .into_diagnostic()
        .wrap_err("Could not create out directory")?;

    session
        .request_download(out_dir, &args.filename)
        .map_err(|err| err.wrap_err_with(|| "Could not start the download"))?;
    session.wait();
    if let Some(failure) = session.observer().failure() {
        return Err(miette!("{failure}"));
    }

    info!("All tasks completed");
    Ok(())
}
