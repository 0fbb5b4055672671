use crate::masking::domain::region_masker::RegionMasker;
use crate::shared::options::{AnonymizationOptions, MaskMethod};

use super::blur_masker::BlurMasker;
use super::mosaic_masker::MosaicMasker;
use super::noop_masker::NoopMasker;
use super::overlay_masker::OverlayMasker;
use super::solid_masker::SolidMasker;

/// Creates the masker for the configured redaction method.
pub fn create_masker(options: &AnonymizationOptions) -> Box<dyn RegionMasker> {
    log::debug!("Using {} masker", options.method);
    match options.method {
        MaskMethod::Blur => Box::new(BlurMasker::new(options.blur_intensity, options.use_ellipse)),
        MaskMethod::Solid => Box::new(SolidMasker),
        MaskMethod::Mosaic => Box::new(MosaicMasker::new(options.mosaic_size)),
        MaskMethod::ImageOverlay => Box::new(OverlayMasker::new(options.overlay_image.clone())),
        MaskMethod::None => Box::new(NoopMasker),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use crate::shared::mask_region::MaskRegion;
    use rstest::rstest;
    use std::sync::Arc;

    fn textured(width: u32, height: u32) -> Frame {
        let data = (0..width * height * 3).map(|v| (v * 37 % 256) as u8).collect();
        Frame::new(data, width, height, 3, 0)
    }

    fn options(method: MaskMethod) -> AnonymizationOptions {
        AnonymizationOptions {
            method,
            overlay_image: Some(Arc::new(Frame::new(vec![5u8; 12], 2, 2, 3, 0))),
            ..AnonymizationOptions::default()
        }
    }

    #[rstest]
    #[case(MaskMethod::Blur)]
    #[case(MaskMethod::Solid)]
    #[case(MaskMethod::Mosaic)]
    #[case(MaskMethod::ImageOverlay)]
    fn test_redacting_methods_change_region(#[case] method: MaskMethod) {
        let mut frame = textured(64, 64);
        let original = frame.clone();
        create_masker(&options(method))
            .apply(&mut frame, &MaskRegion::new(8, 8, 56, 56))
            .unwrap();
        assert_ne!(frame, original);
    }

    #[test]
    fn test_none_method_is_noop() {
        let mut frame = textured(32, 32);
        let original = frame.clone();
        create_masker(&options(MaskMethod::None))
            .apply(&mut frame, &MaskRegion::new(0, 0, 32, 32))
            .unwrap();
        assert_eq!(frame, original);
    }

    #[test]
    fn test_overlay_without_image_fails_per_region() {
        let opts = AnonymizationOptions {
            method: MaskMethod::ImageOverlay,
            ..AnonymizationOptions::default()
        };
        let mut frame = textured(8, 8);
        assert!(create_masker(&opts)
            .apply(&mut frame, &MaskRegion::new(0, 0, 4, 4))
            .is_err());
    }
}
