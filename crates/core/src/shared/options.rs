use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::shared::frame::Frame;

pub const DEFAULT_MASK_SCALE: f64 = 1.3;
pub const DEFAULT_MOSAIC_SIZE: u32 = 20;
pub const DEFAULT_BLUR_INTENSITY: u8 = 5;
pub const DEFAULT_THRESHOLD: f32 = 0.2;

/// Redaction strategy applied to each mask region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MaskMethod {
    #[default]
    Blur,
    Solid,
    Mosaic,
    ImageOverlay,
    None,
}

impl fmt::Display for MaskMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MaskMethod::Blur => "blur",
            MaskMethod::Solid => "solid",
            MaskMethod::Mosaic => "mosaic",
            MaskMethod::ImageOverlay => "image",
            MaskMethod::None => "none",
        };
        f.write_str(name)
    }
}

impl FromStr for MaskMethod {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blur" => Ok(MaskMethod::Blur),
            "solid" => Ok(MaskMethod::Solid),
            "mosaic" => Ok(MaskMethod::Mosaic),
            "image" | "img" | "overlay" => Ok(MaskMethod::ImageOverlay),
            "none" => Ok(MaskMethod::None),
            other => Err(OptionsError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum OptionsError {
    #[error("unknown mask method '{0}' (expected blur, solid, mosaic, image or none)")]
    UnknownMethod(String),
    #[error("mask scale must be >= 1.0, got {0}")]
    MaskScale(f64),
    #[error("mosaic size must be > 0")]
    MosaicSize,
    #[error("blur intensity must be between 1 and 10, got {0}")]
    BlurIntensity(u8),
    #[error("detection downscale must be in (0, 1], got {0}")]
    DetectionDownscale(f64),
    #[error("detection threshold must be between 0.0 and 1.0, got {0}")]
    Threshold(f32),
    #[error("image overlay method requires an overlay image")]
    MissingOverlay,
    #[error("overlay image must have 3 (RGB) or 4 (RGBA) channels, got {0}")]
    OverlayChannels(u8),
    #[error("overlay image is malformed ({width}x{height}, {len} bytes)")]
    MalformedOverlay { width: u32, height: u32, len: usize },
}

/// Immutable per-job anonymization settings.
///
/// Built once through [`AnonymizationOptions::builder`] and shared read-only
/// (behind an `Arc`) by every frame of the job.
#[derive(Clone, Debug)]
pub struct AnonymizationOptions {
    pub method: MaskMethod,
    pub mask_scale: f64,
    pub use_ellipse: bool,
    pub draw_scores: bool,
    pub mosaic_size: u32,
    pub blur_intensity: u8,
    pub overlay_image: Option<Arc<Frame>>,
    pub detection_downscale: f64,
    pub threshold: f32,
}

impl Default for AnonymizationOptions {
    fn default() -> Self {
        Self {
            method: MaskMethod::Blur,
            mask_scale: DEFAULT_MASK_SCALE,
            use_ellipse: true,
            draw_scores: false,
            mosaic_size: DEFAULT_MOSAIC_SIZE,
            blur_intensity: DEFAULT_BLUR_INTENSITY,
            overlay_image: None,
            detection_downscale: 1.0,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl AnonymizationOptions {
    pub fn builder() -> AnonymizationOptionsBuilder {
        AnonymizationOptionsBuilder {
            options: Self::default(),
        }
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if !(self.mask_scale >= 1.0 && self.mask_scale.is_finite()) {
            return Err(OptionsError::MaskScale(self.mask_scale));
        }
        if self.mosaic_size == 0 {
            return Err(OptionsError::MosaicSize);
        }
        if !(1..=10).contains(&self.blur_intensity) {
            return Err(OptionsError::BlurIntensity(self.blur_intensity));
        }
        if !(self.detection_downscale > 0.0 && self.detection_downscale <= 1.0) {
            return Err(OptionsError::DetectionDownscale(self.detection_downscale));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(OptionsError::Threshold(self.threshold));
        }
        match (&self.overlay_image, self.method) {
            (None, MaskMethod::ImageOverlay) => return Err(OptionsError::MissingOverlay),
            (Some(img), _) if img.channels() != 3 && img.channels() != 4 => {
                return Err(OptionsError::OverlayChannels(img.channels()))
            }
            (Some(img), _) if !img.is_valid() => {
                return Err(OptionsError::MalformedOverlay {
                    width: img.width(),
                    height: img.height(),
                    len: img.data().len(),
                })
            }
            _ => {}
        }
        Ok(())
    }
}

/// Fluent builder; `build` validates before handing out the options.
pub struct AnonymizationOptionsBuilder {
    options: AnonymizationOptions,
}

impl AnonymizationOptionsBuilder {
    pub fn method(mut self, method: MaskMethod) -> Self {
        self.options.method = method;
        self
    }

    pub fn mask_scale(mut self, mask_scale: f64) -> Self {
        self.options.mask_scale = mask_scale;
        self
    }

    pub fn use_ellipse(mut self, use_ellipse: bool) -> Self {
        self.options.use_ellipse = use_ellipse;
        self
    }

    pub fn draw_scores(mut self, draw_scores: bool) -> Self {
        self.options.draw_scores = draw_scores;
        self
    }

    pub fn mosaic_size(mut self, mosaic_size: u32) -> Self {
        self.options.mosaic_size = mosaic_size;
        self
    }

    pub fn blur_intensity(mut self, blur_intensity: u8) -> Self {
        self.options.blur_intensity = blur_intensity;
        self
    }

    pub fn overlay_image(mut self, overlay: Frame) -> Self {
        self.options.overlay_image = Some(Arc::new(overlay));
        self
    }

    pub fn detection_downscale(mut self, downscale: f64) -> Self {
        self.options.detection_downscale = downscale;
        self
    }

    pub fn threshold(mut self, threshold: f32) -> Self {
        self.options.threshold = threshold;
        self
    }

    pub fn build(self) -> Result<AnonymizationOptions, OptionsError> {
        self.options.validate()?;
        Ok(self.options)
    }
}
