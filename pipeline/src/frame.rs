//! Host frame sources.

use std::fmt;

use frameclass_tensor::ByteOrder;
use serde::Serialize;

use crate::error::CaptureError;

/// Bytes per pixel of a host frame: BGRA.
pub const FRAME_CHANNELS: usize = 4;

/// Host frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Size of one BGRA frame at this resolution.
    pub fn bgra_len(&self) -> Result<usize, CaptureError> {
        self.width
            .checked_mul(self.height)
            .and_then(|n| n.checked_mul(FRAME_CHANNELS))
            .ok_or(CaptureError::TooLarge(*self))
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The host side of a GPU readback.
///
/// Frames are BGRA with rows bottom-up (graphics convention).
pub trait FrameSource {
    /// Resolution of the frame about to be read, or `None` when nothing is
    /// connected to the input.
    fn resolution(&self) -> Option<Resolution>;

    /// Copies the current frame into `dst`, which is exactly
    /// `resolution().bgra_len()` bytes. Blocks until the GPU is done.
    ///
    /// Returns `Ok(false)` when the host produced no pixels this frame.
    fn download(&mut self, dst: &mut [u8]) -> Result<bool, CaptureError>;
}

/// A [`FrameSource`] backed by a frame held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSource {
    resolution: Option<Resolution>,
    rows: Option<Vec<u8>>,
}

impl MemoryFrameSource {
    /// A source with nothing connected.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Wraps BGRA bottom-up rows as the host would deliver them.
    pub fn from_bottom_up_bgra(resolution: Resolution, rows: Vec<u8>) -> Result<Self, CaptureError> {
        let expected = resolution.bgra_len()?;
        if rows.len() != expected {
            return Err(CaptureError::SizeMismatch {
                expected,
                got: rows.len(),
            });
        }
        Ok(Self {
            resolution: Some(resolution),
            rows: Some(rows),
        })
    }

    /// Converts a top-down image in any supported byte order into a host
    /// frame: BGRA, bottom-up. Missing alpha is opaque.
    pub fn from_top_down(
        width: usize,
        height: usize,
        order: ByteOrder,
        data: &[u8],
    ) -> Result<Self, CaptureError> {
        let resolution = Resolution::new(width, height);
        let channels = order.channels();
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(channels))
            .ok_or(CaptureError::TooLarge(resolution))?;
        if data.len() != expected {
            return Err(CaptureError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }

        let mut rows = Vec::with_capacity(resolution.bgra_len()?);
        if expected > 0 {
            for row in data.chunks_exact(width * channels).rev() {
                for p in row.chunks_exact(channels) {
                    rows.extend_from_slice(&to_bgra(order, p));
                }
            }
        }
        Self::from_bottom_up_bgra(resolution, rows)
    }

    /// A frame filled with one BGRA colour.
    pub fn solid(resolution: Resolution, bgra: [u8; 4]) -> Self {
        let rows = bgra.repeat(resolution.width * resolution.height);
        Self {
            resolution: Some(resolution),
            rows: Some(rows),
        }
    }

    /// Keeps the resolution but makes every download report no pixels.
    pub fn without_pixels(mut self) -> Self {
        self.rows = None;
        self
    }
}

fn to_bgra(order: ByteOrder, p: &[u8]) -> [u8; 4] {
    match order {
        ByteOrder::Gray => [p[0], p[0], p[0], 255],
        ByteOrder::Rgb => [p[2], p[1], p[0], 255],
        ByteOrder::Bgr => [p[0], p[1], p[2], 255],
        ByteOrder::Rgba => [p[2], p[1], p[0], p[3]],
        ByteOrder::Bgra => [p[0], p[1], p[2], p[3]],
    }
}

impl FrameSource for MemoryFrameSource {
    fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    fn download(&mut self, dst: &mut [u8]) -> Result<bool, CaptureError> {
        let Some(rows) = &self.rows else {
            return Ok(false);
        };
        if dst.len() != rows.len() {
            return Err(CaptureError::SizeMismatch {
                expected: dst.len(),
                got: rows.len(),
            });
        }
        dst.copy_from_slice(rows);
        Ok(true)
    }
}
