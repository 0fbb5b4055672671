use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, LumaA, Pixel, Rgb, Rgba};

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::mask_region_builder::MaskRegionBuilder;
use crate::masking::domain::region_masker::RegionMasker;
use crate::masking::infrastructure::masker_factory::create_masker;
use crate::masking::infrastructure::score_label::draw_score;
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::constants::DOWNSCALE_MIN_SIDE;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;
use crate::shared::options::AnonymizationOptions;
use crate::shared::BoxError;

/// Per-frame orchestration: detect faces, turn them into mask regions and
/// redact them in place.
///
/// Detection and masking are exposed separately so the stream controller can
/// run them on different threads.
pub struct FrameProcessor {
    detector: Arc<dyn FaceDetector>,
    masker: Box<dyn RegionMasker>,
    regions: MaskRegionBuilder,
    options: Arc<AnonymizationOptions>,
}

impl FrameProcessor {
    pub fn new(detector: Arc<dyn FaceDetector>, options: Arc<AnonymizationOptions>) -> Self {
        Self {
            masker: create_masker(&options),
            regions: MaskRegionBuilder::new(options.mask_scale),
            detector,
            options,
        }
    }

    pub fn options(&self) -> &AnonymizationOptions {
        &self.options
    }

    /// Runs the detector, on a downscaled copy when configured and the frame
    /// is large enough, and returns boxes in full-resolution coordinates.
    pub fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, PipelineError> {
        check_frame(frame)?;
        let ds = self.options.detection_downscale;
        let threshold = self.options.threshold;
        let to_detector_error = |source: BoxError| PipelineError::Detector {
            frame: frame.index(),
            source,
        };

        if ds < 1.0 && frame.width().min(frame.height()) > DOWNSCALE_MIN_SIDE {
            if let Some(small) = downscaled_copy(frame, ds) {
                let detections = self
                    .detector
                    .detect(&small, threshold)
                    .map_err(to_detector_error)?;
                return Ok(detections.iter().map(|d| d.scaled(1.0 / ds)).collect());
            }
            log::debug!("Frame {}: downscale failed, detecting at full size", frame.index());
        }
        self.detector.detect(frame, threshold).map_err(to_detector_error)
    }

    /// Masks every detection in detector order and returns how many regions
    /// were redacted.
    ///
    /// Regions that collapse to zero area are skipped; a region the masker
    /// rejects is logged and left untouched. Score labels are drawn after all
    /// regions so no label leaks into another region's mask.
    pub fn apply(&self, frame: &mut Frame, detections: &[Detection]) -> usize {
        if let Err(e) = check_frame(frame) {
            log::warn!("{e}; frame left unmasked");
            return 0;
        }
        let (w, h) = (frame.width(), frame.height());
        let mut masked: Vec<(MaskRegion, f32)> = Vec::with_capacity(detections.len());

        for det in detections {
            let Some(region) = self.regions.build(det, w, h) else {
                continue;
            };
            match self.masker.apply(frame, &region) {
                Ok(()) => masked.push((region, det.score)),
                Err(e) => log::warn!("Frame {}: skipping region {region:?}: {e}", frame.index()),
            }
        }

        if self.options.draw_scores {
            for (region, score) in &masked {
                draw_score(frame, region, *score);
            }
        }
        masked.len()
    }

    /// Detects and masks `frame` in place.
    pub fn process(&self, frame: &mut Frame) -> Result<Vec<Detection>, PipelineError> {
        let detections = self.detect(frame)?;
        self.apply(frame, &detections);
        Ok(detections)
    }
}

fn check_frame(frame: &Frame) -> Result<(), PipelineError> {
    if frame.is_valid() {
        return Ok(());
    }
    Err(PipelineError::InvalidFrame {
        frame: frame.index(),
        width: frame.width(),
        height: frame.height(),
        channels: frame.channels(),
        len: frame.data().len(),
    })
}

/// Copy of `frame` scaled by `factor`, keeping its index so index-keyed
/// detectors still line up.
fn downscaled_copy(frame: &Frame, factor: f64) -> Option<Frame> {
    let width = ((f64::from(frame.width()) * factor).round() as u32).max(1);
    let height = ((f64::from(frame.height()) * factor).round() as u32).max(1);
    let data = match frame.channels() {
        1 => resize_buffer::<Luma<u8>>(frame, width, height),
        2 => resize_buffer::<LumaA<u8>>(frame, width, height),
        3 => resize_buffer::<Rgb<u8>>(frame, width, height),
        4 => resize_buffer::<Rgba<u8>>(frame, width, height),
        _ => None,
    }?;
    Some(Frame::new(data, width, height, frame.channels(), frame.index()))
}

fn resize_buffer<P>(frame: &Frame, width: u32, height: u32) -> Option<Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let src: ImageBuffer<P, Vec<u8>> =
        ImageBuffer::from_raw(frame.width(), frame.height(), frame.data().to_vec())?;
    Some(imageops::resize(&src, width, height, FilterType::Triangle).into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::options::MaskMethod;
    use approx::assert_relative_eq;
    use std::sync::Mutex;

    /// Returns the same boxes for every frame and remembers the sizes it saw.
    struct FixedDetector {
        detections: Vec<Detection>,
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl FixedDetector {
        fn new(detections: Vec<Detection>) -> Self {
            Self {
                detections,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl FaceDetector for FixedDetector {
        fn detect(&self, frame: &Frame, threshold: f32) -> Result<Vec<Detection>, BoxError> {
            self.seen.lock().unwrap().push((frame.width(), frame.height()));
            Ok(self
                .detections
                .iter()
                .filter(|d| d.score >= threshold)
                .copied()
                .collect())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&self, _frame: &Frame, _threshold: f32) -> Result<Vec<Detection>, BoxError> {
            Err("backend unavailable".into())
        }
    }

    fn textured(width: u32, height: u32) -> Frame {
        let data = (0..width * height * 3).map(|v| (v * 31 % 251) as u8).collect();
        Frame::new(data, width, height, 3, 7)
    }

    fn options(method: MaskMethod) -> Arc<AnonymizationOptions> {
        Arc::new(AnonymizationOptions {
            method,
            mask_scale: 1.0,
            ..AnonymizationOptions::default()
        })
    }

    #[test]
    fn test_process_masks_detected_region_only() {
        let detector =
            Arc::new(FixedDetector::new(vec![Detection::new(10.0, 10.0, 20.0, 20.0, 0.9)]));
        let processor = FrameProcessor::new(detector, options(MaskMethod::Solid));
        let mut frame = textured(40, 30);
        let original = frame.clone();

        let detections = processor.process(&mut frame).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(frame.pixel(15, 15), &[0, 0, 0]);
        assert_eq!(frame.pixel(5, 5), original.pixel(5, 5));
        assert_eq!(frame.pixel(25, 25), original.pixel(25, 25));
    }

    #[test]
    fn test_threshold_passed_to_detector() {
        let detector = Arc::new(FixedDetector::new(vec![
            Detection::new(0.0, 0.0, 5.0, 5.0, 0.1),
            Detection::new(10.0, 10.0, 15.0, 15.0, 0.8),
        ]));
        let opts = Arc::new(AnonymizationOptions {
            threshold: 0.5,
            ..AnonymizationOptions::default()
        });
        let processor = FrameProcessor::new(detector, opts);
        let detections = processor.detect(&textured(20, 20)).unwrap();
        assert_eq!(detections.len(), 1);
        assert_relative_eq!(detections[0].score, 0.8);
    }

    #[test]
    fn test_detector_failure_propagates() {
        let processor = FrameProcessor::new(Arc::new(FailingDetector), options(MaskMethod::Blur));
        let err = processor.process(&mut textured(10, 10)).unwrap_err();
        assert!(matches!(err, PipelineError::Detector { frame: 7, .. }));
    }

    #[test]
    fn test_invalid_frame_fails_before_detection() {
        let detector = Arc::new(FixedDetector::new(vec![]));
        let processor = FrameProcessor::new(detector.clone(), options(MaskMethod::Blur));
        let mut frame = Frame::from_raw_unchecked(vec![0u8; 5], 4, 4, 3, 2);
        let err = processor.process(&mut frame).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFrame { frame: 2, len: 5, .. }));
        assert!(detector.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_frame_is_invalid() {
        let processor = FrameProcessor::new(
            Arc::new(FixedDetector::new(vec![])),
            options(MaskMethod::Blur),
        );
        let mut frame = Frame::new(Vec::new(), 0, 0, 3, 0);
        assert!(matches!(
            processor.process(&mut frame),
            Err(PipelineError::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_outside_and_degenerate_detections_are_skipped() {
        let detector = Arc::new(FixedDetector::new(vec![
            Detection::new(100.0, 100.0, 120.0, 120.0, 0.9),
            Detection::new(5.0, 5.0, 5.0, 9.0, 0.9),
            Detection::new(f64::NAN, 0.0, 4.0, 4.0, 0.9),
        ]));
        let processor = FrameProcessor::new(detector, options(MaskMethod::Solid));
        let mut frame = textured(20, 20);
        let original = frame.clone();
        let detections = processor.detect(&frame).unwrap();
        assert_eq!(processor.apply(&mut frame, &detections), 0);
        assert_eq!(frame, original);
    }

    #[test]
    fn test_mask_error_skips_region_but_masks_others() {
        // The overlay masker rejects grayscale frames.
        let overlay = Arc::new(Frame::new(vec![9u8; 12], 2, 2, 3, 0));
        let opts = Arc::new(AnonymizationOptions {
            method: MaskMethod::ImageOverlay,
            overlay_image: Some(overlay),
            mask_scale: 1.0,
            ..AnonymizationOptions::default()
        });
        let detector = Arc::new(FixedDetector::new(vec![Detection::new(1.0, 1.0, 4.0, 4.0, 0.9)]));
        let processor = FrameProcessor::new(detector, opts);
        let mut gray = Frame::new(vec![50u8; 36], 6, 6, 1, 0);
        let original = gray.clone();
        let detections = processor.process(&mut gray).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(gray, original);
    }

    #[test]
    fn test_empty_overlay_leaves_frame_unchanged() {
        let opts = Arc::new(AnonymizationOptions {
            method: MaskMethod::ImageOverlay,
            overlay_image: Some(Arc::new(Frame::new(Vec::new(), 0, 0, 3, 0))),
            mask_scale: 1.0,
            ..AnonymizationOptions::default()
        });
        let detector =
            Arc::new(FixedDetector::new(vec![Detection::new(2.0, 2.0, 12.0, 12.0, 0.9)]));
        let processor = FrameProcessor::new(detector, opts);
        let mut frame = textured(16, 16);
        let original = frame.clone();

        let detections = processor.detect(&frame).unwrap();
        assert_eq!(processor.apply(&mut frame, &detections), 0);
        assert_eq!(frame, original);
    }

    #[test]
    fn test_scores_drawn_after_masking() {
        let detector =
            Arc::new(FixedDetector::new(vec![Detection::new(0.0, 0.0, 30.0, 20.0, 0.87)]));
        let opts = Arc::new(AnonymizationOptions {
            method: MaskMethod::Solid,
            mask_scale: 1.0,
            draw_scores: true,
            ..AnonymizationOptions::default()
        });
        let processor = FrameProcessor::new(detector, opts);
        let mut frame = textured(40, 30);
        processor.process(&mut frame).unwrap();

        let green = (0..20u32)
            .flat_map(|y| (0..30u32).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y) == [0, 255, 0])
            .count();
        assert!(green > 0);
        assert_eq!(frame.pixel(29, 19), &[0, 0, 0]);
    }

    #[test]
    fn test_downscaled_detection_rescales_boxes() {
        let detector =
            Arc::new(FixedDetector::new(vec![Detection::new(10.0, 20.0, 60.0, 80.0, 0.9)]));
        let opts = Arc::new(AnonymizationOptions {
            detection_downscale: 0.5,
            ..AnonymizationOptions::default()
        });
        let processor = FrameProcessor::new(detector.clone(), opts);
        let frame = Frame::new(vec![128u8; 1000 * 600 * 3], 1000, 600, 3, 0);

        let detections = processor.detect(&frame).unwrap();
        assert_eq!(detector.seen.lock().unwrap().as_slice(), &[(500, 300)]);
        assert_relative_eq!(detections[0].x1, 20.0);
        assert_relative_eq!(detections[0].y1, 40.0);
        assert_relative_eq!(detections[0].x2, 120.0);
        assert_relative_eq!(detections[0].y2, 160.0);
    }

    #[test]
    fn test_small_frames_detect_at_full_size() {
        let detector = Arc::new(FixedDetector::new(vec![]));
        let opts = Arc::new(AnonymizationOptions {
            detection_downscale: 0.5,
            ..AnonymizationOptions::default()
        });
        let processor = FrameProcessor::new(detector.clone(), opts);
        processor.detect(&textured(640, 480)).unwrap();
        assert_eq!(detector.seen.lock().unwrap().as_slice(), &[(640, 480)]);
    }

    #[test]
    fn test_downscaled_copy_keeps_index() {
        let frame = textured(100, 50);
        let small = downscaled_copy(&frame, 0.25).unwrap();
        assert_eq!((small.width(), small.height(), small.index()), (25, 13, 7));
    }
}
