pub mod detector_provider;
pub mod face_detector;
pub mod mask_region_builder;
