pub mod constants;
pub mod detection;
pub mod frame;
pub mod mask_region;
pub mod options;
pub mod video_metadata;

/// Error type crossing the reader, writer and detector ports.
///
/// `Send + Sync` so failures can travel from worker threads back to the
/// stream's main loop.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
