pub mod detection;
pub mod masking;
pub mod pipeline;
pub mod shared;
pub mod video;
