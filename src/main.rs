use clap::{Parser, Subcommand};
use photo_strip::camera::{Camera, NoCamera, StillsCamera};
use photo_strip::compose::StripCompositor;
use photo_strip::export::{DirectoryDelivery, ExportDispatcher, ExportSettings};
use photo_strip::imaging::{ImageBackend, RustBackend, supported_input_extensions};
use photo_strip::session::{
    AddPhotosOutcome, AppStep, KeepOutcome, Session, SessionError, SessionSettings, SkippedUpload,
    Upload,
};
use photo_strip::types::{FRAMES_PER_STRIP, FilterMode};
use photo_strip::{config, output};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Shared flags for commands that finish with an exported strip.
#[derive(clap::Args, Clone)]
struct ExportArgs {
    /// Render filter: natural or monochrome
    #[arg(long, default_value = "natural")]
    filter: FilterMode,

    /// Directory the strip is delivered into
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Use the share action instead of download (writes into <out>/shared/)
    #[arg(long)]
    share: bool,

    /// Fire timers immediately instead of waiting out countdowns
    #[arg(long)]
    no_delay: bool,
}

#[derive(Parser)]
#[command(name = "photo-strip")]
#[command(about = "Photo-booth strip compositor")]
#[command(long_about = "\
Photo-booth strip compositor

Collects four frames, either from a camera countdown or from picked photos,
stacks them on a paper-colored strip with a dated caption, and exports the
result as a JPEG.

  gallery   pick up to four photos; fewer are repeated to fill the strip
  camera    run the 3-2-1 countdown four times against a camera feed

Run 'photo-strip gen-config' to generate a documented photo-strip.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./photo-strip.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more to stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build a strip from up to four photos (directories are walked)
    Gallery {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Build a strip by capturing four frames from a camera
    Camera {
        /// Directory of images replayed as the camera feed
        #[arg(long)]
        stills: PathBuf,
        /// Ask keep/retake on stdin after each shot
        #[arg(long)]
        review: bool,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Print a stock photo-strip.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Gallery { paths, export } => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);

            let mut session = Session::new(
                NoCamera,
                RustBackend::new(),
                SessionSettings::from_config(&config),
            );
            let room = FRAMES_PER_STRIP.saturating_sub(session.selection().len());
            let mut batch = read_uploads(&collect_gallery_paths(&paths), room);

            let outcome = session.add_photos(std::mem::take(&mut batch.uploads))?;
            let outcome = batch.merge(outcome);
            output::print_step(session.step(), 0);
            output::print_add_photos(&outcome, &batch.names, 1);

            session.create_strip()?;
            output::print_step(session.step(), 0);
            drive_timers(&mut session, export.no_delay)?;

            finish(&mut session, &config, &export)?;
        }
        Command::Camera {
            stills,
            review,
            export,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            init_thread_pool(&config.processing);

            let mut session = Session::new(
                StillsCamera::new(stills),
                RustBackend::new(),
                SessionSettings::from_config(&config),
            );
            if let Err(e) = session.start_camera() {
                if let Some(message) = e.user_message() {
                    eprintln!("{message}");
                }
                return Err(e.into());
            }
            output::print_step(session.step(), session.cursor());
            capture_loop(&mut session, review, export.no_delay)?;

            finish(&mut session, &config, &export)?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores. Config can lower it, never raise it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Files are taken as given; directories contribute their image files, sorted.
fn collect_gallery_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let exts = supported_input_extensions();
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        files.extend(
            WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| {
                    p.extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| exts.contains(&e.to_ascii_lowercase().as_str()))
                }),
        );
    }
    files
}

/// Gallery files read from disk, in the order they were given.
#[derive(Debug, Default)]
struct UploadBatch {
    /// Names of every file offered, indexed like the paths.
    names: Vec<String>,
    uploads: Vec<Upload>,
    /// Path index of each entry in `uploads`.
    positions: Vec<usize>,
    unreadable: Vec<SkippedUpload>,
    /// Files past the free slots, never opened.
    ignored: usize,
}

impl UploadBatch {
    /// Rebase a session outcome onto path indices and fold in read failures.
    fn merge(&self, outcome: AddPhotosOutcome) -> AddPhotosOutcome {
        let position = |i: usize| self.positions.get(i).copied().unwrap_or(i);
        let mut added = outcome.added;
        for photo in &mut added {
            photo.index = position(photo.index);
        }
        let mut skipped: Vec<SkippedUpload> = outcome
            .skipped
            .into_iter()
            .map(|s| SkippedUpload {
                index: position(s.index),
                ..s
            })
            .chain(self.unreadable.iter().cloned())
            .collect();
        skipped.sort_by_key(|s| s.index);
        AddPhotosOutcome {
            added,
            skipped,
            ignored: outcome.ignored + self.ignored,
        }
    }
}

/// Read at most `room` files. Files that cannot be read are skipped, not fatal.
fn read_uploads(paths: &[PathBuf], room: usize) -> UploadBatch {
    let mut batch = UploadBatch {
        names: paths.iter().map(|p| upload_name(p)).collect(),
        ignored: paths.len().saturating_sub(room),
        ..UploadBatch::default()
    };
    for (index, path) in paths.iter().take(room).enumerate() {
        match std::fs::read(path) {
            Ok(bytes) => {
                batch.uploads.push(Upload::new(batch.names[index].clone(), bytes));
                batch.positions.push(index);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                batch.unreadable.push(SkippedUpload {
                    index,
                    name: batch.names[index].clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    batch
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Sleep out and fire timers until none is pending.
fn drive_timers<C: Camera, B: ImageBackend>(
    session: &mut Session<C, B>,
    no_delay: bool,
) -> Result<(), SessionError> {
    while let Some(timer) = session.pending_timer() {
        wait(timer.delay, no_delay);
        let outcome = session.fire(timer.id)?;
        output::print_timer_outcome(outcome, session.pending_shot().map(|f| f.id()));
    }
    Ok(())
}

/// Run countdowns and keep/retake decisions until the strip is ready.
fn capture_loop<C: Camera, B: ImageBackend>(
    session: &mut Session<C, B>,
    review: bool,
    no_delay: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = std::io::stdin();
    let mut answers = stdin.lock().lines();

    while session.step() == AppStep::CameraCapture {
        if session.pending_timer().is_some() {
            if let Err(e) = drive_timers(session, no_delay) {
                if let Some(message) = e.user_message() {
                    eprintln!("{message}");
                }
                if session.step() != AppStep::CameraCapture {
                    return Err(e.into());
                }
                // Encode failure: the slot is counted down again.
                tracing::warn!(error = %e, "shot lost, retrying");
            }
            continue;
        }

        let keep = if review {
            print!("Keep this shot? [Y/r] ");
            std::io::stdout().flush()?;
            match answers.next().transpose()? {
                Some(answer) => !matches!(answer.trim(), "r" | "R" | "retake" | "n" | "N"),
                None => true,
            }
        } else {
            true
        };

        if keep {
            if let KeepOutcome::NextFrame { cursor } = session.keep()? {
                output::print_step(session.step(), cursor);
            }
        } else {
            session.retake()?;
        }
    }
    Ok(())
}

fn wait(delay: Duration, no_delay: bool) {
    if !no_delay {
        std::thread::sleep(delay);
    }
}

/// Compose the memoized strip and deliver it.
fn finish<C: Camera, B: ImageBackend>(
    session: &mut Session<C, B>,
    config: &config::PhotoStripConfig,
    export: &ExportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    session.set_filter(export.filter);
    output::print_step(session.step(), 0);

    let strip = session.final_strip().ok_or("no strip was produced")?;
    let compositor = StripCompositor::from_config(session.backend(), config)?;
    let today = chrono::Local::now().date_naive();
    let composed = compositor.compose(strip, session.filter(), today)?;
    output::print_strip(strip, &composed);

    let delivery = DirectoryDelivery::new(export.out.clone()).with_sharing(export.share);
    let mut dispatcher =
        ExportDispatcher::new(session.backend(), delivery, ExportSettings::from_config(config));
    if export.share {
        output::print_share_outcome(&dispatcher.share_strip(&composed)?);
    } else {
        let now = chrono::Utc::now().timestamp_millis();
        output::print_download_outcome(&dispatcher.download_strip(&composed, now)?);
    }
    Ok(())
}
