use crate::masking::domain::region_masker::{MaskError, RegionMasker};
use crate::shared::frame::Frame;
use crate::shared::mask_region::MaskRegion;

/// Leaves the frame untouched. Used to inspect raw detections.
pub struct NoopMasker;

impl RegionMasker for NoopMasker {
    fn apply(&self, _frame: &mut Frame, _region: &MaskRegion) -> Result<(), MaskError> {
        Ok(())
    }
}
