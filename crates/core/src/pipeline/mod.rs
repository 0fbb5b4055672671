pub mod batch_queue;
pub mod batch_scheduler;
pub mod frame_processor;
pub mod image_worker_pool;
pub mod infrastructure;
pub mod job_paths;
pub mod pipeline_error;
pub mod pipeline_observer;
pub mod progress_throttle;
pub mod stream_controller;
#[cfg(test)]
pub(crate) mod test_support;
