use std::time::Duration;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Extensions picked up when a whole folder is queued.
pub const FOLDER_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Appended to the file stem (and folder name) of anonymized outputs.
pub const OUTPUT_SUFFIX: &str = "_anonymized";

/// Downscaled detection only kicks in when the shorter side exceeds this.
pub const DOWNSCALE_MIN_SIDE: u32 = 480;

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Every Nth processed frame is offered to the caller as a preview.
pub const PREVIEW_EVERY_FRAMES: usize = 5;

/// Upper bound on parallel image workers.
pub const MAX_IMAGE_WORKERS: usize = 8;

pub const SIDECAR_SUFFIX: &str = ".faces.json";

/// Previews a channel observer holds for a slow receiver before dropping
/// new ones.
pub const PREVIEW_CHANNEL_CAPACITY: usize = 2;
