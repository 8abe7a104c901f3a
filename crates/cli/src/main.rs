use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand, ValueEnum};
use crossbeam_channel::Receiver;

use facelens_core::capture::domain::capture_device::{CaptureDevice, FacingMode};
use facelens_core::capture::domain::stream_session::StreamSession;
use facelens_core::capture::infrastructure::ffmpeg_file_device::FfmpegFileDevice;
use facelens_core::capture::infrastructure::nokhwa_camera::{list_cameras, NokhwaCameraDevice};
use facelens_core::detection::domain::face_analysis::FrameAnalysis;
use facelens_core::detection::domain::model_loader::ModelKind;
use facelens_core::detection::infrastructure::model_registry::ModelRegistry;
use facelens_core::detection::infrastructure::onnx_model_loader::OnnxModelLoader;
use facelens_core::media::image_file::{is_image_path, write_image};
use facelens_core::overlay::infrastructure::rgba_overlay::RgbaOverlay;
use facelens_core::pipeline::analysis_sink::AnalysisUpdate;
use facelens_core::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use facelens_core::pipeline::detect_face_use_case::DetectFaceUseCase;
use facelens_core::pipeline::live_session_use_case::LiveSessionUseCase;
use facelens_core::shared::config::AnalyzerConfig;
use facelens_core::shared::frame::Frame;

/// Wait this long for the first live frame before giving up.
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(30);

/// Once streaming, give up when no frame has arrived for this long.
const STALLED_STREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Face analysis for images, cameras and video files.
#[derive(Parser)]
#[command(name = "facelens")]
struct Cli {
    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true, default_value = "0.5")]
    confidence: f64,

    /// Base URL the model artifacts are downloaded from.
    #[arg(long, global = true)]
    model_url: Option<String>,

    /// Directory checked for model files before downloading.
    #[arg(long, global = true)]
    models_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze the most prominent face in a still image.
    Analyze {
        /// Input image file.
        image: PathBuf,

        /// Write the image with the overlay drawn on it.
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Print the analysis as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Stream a camera (or a video file) and print each analysis.
    Live {
        /// Which camera to open.
        #[arg(long, value_enum, default_value = "user")]
        facing: Facing,

        /// Replay a video file instead of opening a camera.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Stop after this many frames.
        #[arg(long)]
        frames: Option<usize>,

        /// Milliseconds between loop iterations.
        #[arg(long, default_value = "33")]
        interval_ms: u64,

        /// Print each analysis as a JSON line.
        #[arg(long)]
        json: bool,
    },
    /// Download (if needed) and load all four models.
    Models,
    /// List available cameras.
    Devices,
}

#[derive(Clone, Copy, ValueEnum)]
enum Facing {
    User,
    Environment,
}

impl From<Facing> for FacingMode {
    fn from(facing: Facing) -> Self {
        match facing {
            Facing::User => FacingMode::User,
            Facing::Environment => FacingMode::Environment,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli);

    match cli.command {
        Command::Analyze {
            image,
            overlay,
            json,
        } => run_analyze(&config, &image, overlay.as_deref(), json),
        Command::Live {
            facing,
            source,
            frames,
            interval_ms,
            json,
        } => {
            let config = AnalyzerConfig {
                frame_interval: Duration::from_millis(interval_ms),
                ..config
            };
            run_live(&config, facing.into(), source.as_deref(), frames, json)
        }
        Command::Models => run_models(&config),
        Command::Devices => run_devices(),
    }
}

fn run_analyze(
    config: &AnalyzerConfig,
    image: &Path,
    overlay: Option<&Path>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let detector = build_detector(config);
    let sink = Arc::new(|_: AnalysisUpdate| {});
    let mut use_case = AnalyzeImageUseCase::new(detector, Box::new(RgbaOverlay::new(0, 0)), sink);

    use_case.select_image_file(image)?;
    let analysis = use_case.analyze()?;
    eprintln!();

    match &analysis {
        Some(analysis) if json => println!("{}", serde_json::to_string_pretty(analysis)?),
        Some(analysis) => println!("{}", describe(analysis)),
        None if json => println!("null"),
        None => println!("No face detected"),
    }

    if let Some(path) = overlay {
        if let Some(composed) = use_case.composed() {
            write_image(path, &composed)?;
            log::info!("Overlay written to {}", path.display());
        }
    }
    Ok(())
}

fn run_live(
    config: &AnalyzerConfig,
    facing: FacingMode,
    source: Option<&Path>,
    frames: Option<usize>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let device: Box<dyn CaptureDevice> = match source {
        Some(path) => Box::new(FfmpegFileDevice::new(path, true)),
        None => Box::new(NokhwaCameraDevice::new(config)),
    };
    let detector = build_detector(config);
    detector.registry().ensure_loaded()?;
    eprintln!();

    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = Arc::new(move |update: AnalysisUpdate| {
        let _ = tx.send(update);
    });
    let mut live = LiveSessionUseCase::new(
        StreamSession::new(device, facing),
        detector,
        sink,
        config.frame_interval,
    );
    live.camera_on()?;
    log::info!("Live session started ({facing} camera)");

    let mut seen = 0;
    let mut timeout = FIRST_FRAME_TIMEOUT;
    while frames.map_or(true, |n| seen < n) {
        let (frame, analysis) = next_frame(&rx, timeout)?;
        seen += 1;
        timeout = config.frame_interval.max(STALLED_STREAM_TIMEOUT);

        match (&analysis, json) {
            (Some(analysis), true) => println!(
                "{}",
                serde_json::json!({ "frame": frame.index(), "analysis": analysis })
            ),
            (None, true) => println!(
                "{}",
                serde_json::json!({ "frame": frame.index(), "analysis": null })
            ),
            (Some(analysis), false) => println!("frame {}: {}", frame.index(), describe(analysis)),
            (None, false) => println!("frame {}: no face", frame.index()),
        }
    }

    if let Some(stats) = live.camera_off() {
        eprintln!("{}", stats.summary());
    }
    Ok(())
}

/// Waits for the next update that carries a frame. Updates from failed
/// captures are skipped without extending the wait.
fn next_frame(
    rx: &Receiver<AnalysisUpdate>,
    timeout: Duration,
) -> Result<(Frame, Option<FrameAnalysis>), String> {
    let deadline = Instant::now() + timeout;
    loop {
        let update = rx
            .recv_deadline(deadline)
            .map_err(|_| format!("No frames received within {:.1}s", timeout.as_secs_f64()))?;
        if let Some(frame) = update.frame {
            return Ok((frame, update.analysis));
        }
    }
}

fn run_models(config: &AnalyzerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let registry = ModelRegistry::new(Box::new(
        OnnxModelLoader::new(config).with_progress(Arc::new(download_progress)),
    ));
    registry.ensure_loaded()?;
    eprintln!();
    for kind in ModelKind::ALL {
        println!("{kind}: loaded ({})", kind.file_name());
        println!("  {}", kind.upstream());
    }
    Ok(())
}

fn run_devices() -> Result<(), Box<dyn std::error::Error>> {
    let cameras = list_cameras()?;
    if cameras.is_empty() {
        println!("No cameras found");
    }
    for camera in cameras {
        println!("{}: {}", camera.index, camera.name);
    }
    Ok(())
}

fn build_config(cli: &Cli) -> AnalyzerConfig {
    let mut config = AnalyzerConfig {
        confidence: cli.confidence,
        bundled_model_dir: cli.models_dir.clone(),
        ..AnalyzerConfig::default()
    };
    if let Some(url) = &cli.model_url {
        config.model_base_url = url.clone();
    }
    config
}

fn build_detector(config: &AnalyzerConfig) -> Arc<DetectFaceUseCase> {
    let loader = OnnxModelLoader::new(config).with_progress(Arc::new(download_progress));
    Arc::new(DetectFaceUseCase::new(Arc::new(ModelRegistry::new(
        Box::new(loader),
    ))))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if let Some(dir) = &cli.models_dir {
        if !dir.is_dir() {
            return Err(format!("Models directory not found: {}", dir.display()).into());
        }
    }
    match &cli.command {
        Command::Analyze { image, overlay, .. } => {
            if !image.exists() {
                return Err(format!("Input file not found: {}", image.display()).into());
            }
            if !is_image_path(image) {
                return Err(format!("Not a supported image file: {}", image.display()).into());
            }
            if let Some(out) = overlay {
                if !is_image_path(out) {
                    return Err(format!(
                        "Overlay output must be an image file, got {}",
                        out.display()
                    )
                    .into());
                }
            }
        }
        Command::Live {
            source,
            frames,
            interval_ms,
            ..
        } => {
            if let Some(path) = source {
                if !path.exists() {
                    return Err(format!("Source file not found: {}", path.display()).into());
                }
            }
            if *frames == Some(0) {
                return Err("--frames must be at least 1".into());
            }
            if *interval_ms == 0 {
                return Err("--interval-ms must be at least 1".into());
            }
        }
        Command::Models | Command::Devices => {}
    }
    Ok(())
}

fn describe(analysis: &FrameAnalysis) -> String {
    format!(
        "{}, age {}, {} (hair {}, eyes {}, score {}%)",
        analysis.gender,
        analysis.age,
        analysis.dominant_expression,
        analysis.hair_color,
        analysis.eye_color,
        analysis.score
    )
}

fn download_progress(kind: ModelKind, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {kind} model... {pct}%");
    } else {
        eprint!("\rDownloading {kind} model... {downloaded} bytes");
    }
}
