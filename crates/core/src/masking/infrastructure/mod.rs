pub mod blur_masker;
mod box_blur;
mod ellipse;
pub mod masker_factory;
pub mod mosaic_masker;
pub mod noop_masker;
pub mod overlay_masker;
mod roi;
pub mod score_label;
pub mod solid_masker;
