use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use face_anonymizer_core::detection::domain::detector_provider::{DetectorProvider, SharedDetector};
use face_anonymizer_core::detection::infrastructure::recorded_face_detector::{
    RecordedFaceDetector, SidecarDetectorProvider,
};
use face_anonymizer_core::pipeline::batch_queue::{BatchOutcome, BatchQueue, BatchSummary, Job};
use face_anonymizer_core::pipeline::batch_scheduler::BatchScheduler;
use face_anonymizer_core::pipeline::job_paths::{
    collect_images, default_output_path, folder_output_dir,
};
use face_anonymizer_core::pipeline::pipeline_observer::{LogObserver, PipelineObserver};
use face_anonymizer_core::shared::constants::{IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use face_anonymizer_core::shared::options::{AnonymizationOptions, MaskMethod};
use face_anonymizer_core::video::infrastructure::file_media_backend::FileMediaBackend;
use face_anonymizer_core::video::infrastructure::image_file_reader::load_overlay;

const EXIT_FAILED_JOBS: i32 = 2;
const EXIT_STOPPED: i32 = 130;

/// Face anonymization for videos, images and folders of images.
#[derive(Parser)]
#[command(name = "face-anonymizer")]
struct Cli {
    /// Input videos, images or folders of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write outputs here instead of next to each input.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Mask method: blur, solid, mosaic, image or none.
    #[arg(long, default_value = "blur")]
    method: String,

    /// Scale factor applied to each detection box (>= 1.0).
    #[arg(long, default_value = "1.3")]
    mask_scale: f64,

    /// Mask the full rectangle instead of the inscribed ellipse.
    #[arg(long = "box")]
    use_box: bool,

    /// Draw the detection score above each face.
    #[arg(long)]
    draw_scores: bool,

    /// Mosaic cell size in pixels.
    #[arg(long, default_value = "20")]
    mosaic_size: u32,

    /// Blur strength (1-10).
    #[arg(long, default_value = "5")]
    blur_intensity: u8,

    /// Replacement image for the image method.
    #[arg(long)]
    overlay_image: Option<PathBuf>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value = "0.2")]
    threshold: f32,

    /// Run detection on a copy scaled by this factor (0.0-1.0].
    #[arg(long, default_value = "1.0")]
    detection_downscale: f64,

    /// Detections file used for every input. Defaults to <input>.faces.json.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Number of images processed in parallel.
    #[arg(long, default_value = "1")]
    jobs: usize,

    /// Drop the audio track of video outputs.
    #[arg(long)]
    no_audio: bool,
}

fn main() {
    env_logger::init();

    match run() {
        Ok(summary) => process::exit(exit_code(&summary)),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn run() -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let options = Arc::new(build_options(&cli)?);
    let provider = build_provider(&cli)?;
    let mut queue = build_queue(&cli.inputs, cli.output_dir.as_deref(), &options)?;
    if queue.is_empty() {
        return Err("No images or videos to process".into());
    }

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nStopping after the current frame...");
        flag.store(true, Ordering::Relaxed);
    })?;

    let backend = Arc::new(FileMediaBackend::new().with_audio(!cli.no_audio));
    let scheduler = BatchScheduler::new(provider, backend, cancelled);
    let mut observer = ConsoleObserver::new();

    let summary = if cli.jobs > 1 {
        scheduler.run_images_parallel(&mut queue, cli.jobs, &mut observer)
    } else {
        scheduler.run(&mut queue, &mut observer)
    };

    for job in queue.jobs() {
        if let Some(err) = job.error() {
            eprintln!("{}: {err}", job.input_path().display());
        }
    }
    eprintln!("{summary}");
    Ok(summary)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
        if input.is_file() && !is_supported(input) {
            return Err(format!("Unsupported input format: {}", input.display()).into());
        }
    }
    if cli.jobs == 0 {
        return Err("--jobs must be at least 1".into());
    }
    if let Some(path) = &cli.detections {
        if !path.is_file() {
            return Err(format!("Detections file not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn build_options(cli: &Cli) -> Result<AnonymizationOptions, Box<dyn std::error::Error>> {
    let method: MaskMethod = cli.method.parse()?;
    let mut builder = AnonymizationOptions::builder()
        .method(method)
        .mask_scale(cli.mask_scale)
        .use_ellipse(!cli.use_box)
        .draw_scores(cli.draw_scores)
        .mosaic_size(cli.mosaic_size)
        .blur_intensity(cli.blur_intensity)
        .detection_downscale(cli.detection_downscale)
        .threshold(cli.threshold);

    if let Some(path) = &cli.overlay_image {
        let overlay = load_overlay(path)
            .map_err(|e| format!("cannot load overlay image {}: {e}", path.display()))?;
        builder = builder.overlay_image(overlay);
    }
    Ok(builder.build()?)
}

fn build_provider(cli: &Cli) -> Result<Arc<dyn DetectorProvider>, Box<dyn std::error::Error>> {
    let downscaled = cli.detection_downscale < 1.0;
    match &cli.detections {
        Some(path) => {
            let detector = RecordedFaceDetector::from_json_file(path)?;
            log::info!(
                "Loaded detections for {} frames from {}",
                detector.frame_count(),
                path.display()
            );
            if downscaled && detector.source_width().is_none() {
                log::warn!(
                    "{} declares no frame width; --detection-downscale will misplace its boxes",
                    path.display()
                );
            }
            Ok(Arc::new(SharedDetector::new(Arc::new(detector))))
        }
        None => {
            if downscaled {
                log::warn!(
                    "--detection-downscale only applies to detection files declaring a frame width"
                );
            }
            Ok(Arc::new(SidecarDetectorProvider))
        }
    }
}

/// Expands folders into their images and pairs every input with its output
/// path. Repeated inputs are skipped with a warning.
fn build_queue(
    inputs: &[PathBuf],
    output_dir: Option<&Path>,
    options: &Arc<AnonymizationOptions>,
) -> Result<BatchQueue, Box<dyn std::error::Error>> {
    let mut queue = BatchQueue::new();
    for input in inputs {
        if input.is_dir() {
            let out_dir = output_dir.map_or_else(|| folder_output_dir(input), Path::to_path_buf);
            let images = collect_images(input)?;
            if images.is_empty() {
                log::warn!("No images found in {}", input.display());
            }
            for image in images {
                let output = default_output_path(&image, Some(&out_dir));
                enqueue(&mut queue, Job::new(image, output, options.clone()));
            }
        } else {
            let output = default_output_path(input, output_dir);
            enqueue(&mut queue, Job::new(input.clone(), output, options.clone()));
        }
    }
    Ok(queue)
}

fn enqueue(queue: &mut BatchQueue, job: Job) {
    if let Err(e) = queue.push(job) {
        log::warn!("Skipping input: {e}");
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS.contains(&ext.as_str()) || VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
}

fn exit_code(summary: &BatchSummary) -> i32 {
    match summary.outcome {
        BatchOutcome::Completed => 0,
        BatchOutcome::CompletedWithFailures => EXIT_FAILED_JOBS,
        BatchOutcome::Stopped => EXIT_STOPPED,
    }
}

/// Prints a single updating progress line per job on stderr and leaves
/// everything else to [`LogObserver`].
struct ConsoleObserver {
    log: LogObserver,
}

impl ConsoleObserver {
    fn new() -> Self {
        Self {
            log: LogObserver::new(),
        }
    }
}

impl PipelineObserver for ConsoleObserver {
    fn on_progress(&mut self, percent: u8) {
        eprint!("\rProcessing... {percent}%");
        if percent == 100 {
            eprintln!();
        }
    }

    fn on_log(&mut self, message: &str) {
        self.log.on_log(message);
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.log.timing(stage, duration_ms);
    }

    fn on_job_started(&mut self, index: usize, total: usize, job: &Job) {
        eprintln!("[{}/{total}] {}", index + 1, job.input_path().display());
        self.log.on_job_started(index, total, job);
    }

    fn on_job_finished(&mut self, index: usize, job: &Job) {
        self.log.on_job_finished(index, job);
    }

    fn on_finished(&mut self, summary: &BatchSummary) {
        self.log.on_finished(summary);
    }
}
