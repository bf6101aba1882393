//! Resolution-dependent staging memory for frame readback.

use frameclass_tensor::{ByteOrder, PixelBuffer, ShapeError};
use tracing::debug;

use crate::error::CaptureError;
use crate::frame::Resolution;

/// CPU side of the readback: one BGRA frame of bottom-up rows.
///
/// The buffer always matches the resolution it was last sized for. A frame
/// of a different size reallocates it before anything is copied in, so a
/// frame never sees bytes left over from a frame of another size.
#[derive(Debug, Default)]
pub struct ReadbackStaging {
    resolution: Option<Resolution>,
    bytes: Vec<u8>,
    reallocations: u64,
}

impl ReadbackStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    /// Sizes the buffer for `resolution`. Returns true if it was
    /// reallocated; the new buffer is zeroed. A resolution too large to
    /// address leaves the current buffer untouched.
    pub fn ensure(&mut self, resolution: Resolution) -> Result<bool, CaptureError> {
        if self.resolution == Some(resolution) {
            return Ok(false);
        }
        let len = resolution.bgra_len()?;
        debug!(
            from = ?self.resolution.map(|r| r.to_string()),
            to = %resolution,
            "readback staging reallocated"
        );
        self.bytes = vec![0; len];
        self.resolution = Some(resolution);
        self.reallocations += 1;
        Ok(true)
    }

    /// How many times the buffer has been (re)allocated.
    pub fn reallocations(&self) -> u64 {
        self.reallocations
    }

    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Flips the staged rows into a new top-down [`PixelBuffer`].
    pub fn to_pixel_buffer(&self) -> Result<PixelBuffer, ShapeError> {
        let res = self
            .resolution
            .ok_or(ShapeError::ZeroDimension("staging resolution"))?;
        PixelBuffer::from_bottom_up(res.width, res.height, ByteOrder::Bgra, &self.bytes)
    }
}
