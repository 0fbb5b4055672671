pub mod media_backend;
pub mod video_reader;
pub mod video_writer;
