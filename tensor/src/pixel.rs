//! CPU-resident pixel data handed over by the host after readback.

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;

/// Byte layout of one pixel in a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    Gray,
    Rgb,
    Bgr,
    Rgba,
    Bgra,
}

impl ByteOrder {
    /// Number of bytes per pixel.
    pub fn channels(self) -> usize {
        match self {
            ByteOrder::Gray => 1,
            ByteOrder::Rgb | ByteOrder::Bgr => 3,
            ByteOrder::Rgba | ByteOrder::Bgra => 4,
        }
    }
}

/// An owned, row-major, top-down block of 8-bit pixels.
///
/// The length of the data is always `width * height * channels`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    byte_order: ByteOrder,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps top-down pixel rows.
    pub fn new(
        width: usize,
        height: usize,
        byte_order: ByteOrder,
        data: Vec<u8>,
    ) -> Result<Self, ShapeError> {
        let expected = checked_len(width, height, byte_order)?;
        if data.len() != expected {
            return Err(ShapeError::DataLength {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            byte_order,
            data,
        })
    }

    /// Copies bottom-up rows (graphics convention, first row is the bottom
    /// of the image) into a top-down buffer.
    pub fn from_bottom_up(
        width: usize,
        height: usize,
        byte_order: ByteOrder,
        rows: &[u8],
    ) -> Result<Self, ShapeError> {
        let expected = checked_len(width, height, byte_order)?;
        if rows.len() != expected {
            return Err(ShapeError::DataLength {
                expected,
                got: rows.len(),
            });
        }

        let stride = width * byte_order.channels();
        let mut data = Vec::with_capacity(expected);
        for row in rows.chunks_exact(stride).rev() {
            data.extend_from_slice(row);
        }
        Ok(Self {
            width,
            height,
            byte_order,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.byte_order.channels()
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the bytes of the pixel at column `x`, row `y` (top-down).
    pub fn pixel(&self, x: usize, y: usize) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let ch = self.channels();
        let start = (y * self.width + x) * ch;
        Some(&self.data[start..start + ch])
    }
}

fn checked_len(width: usize, height: usize, byte_order: ByteOrder) -> Result<usize, ShapeError> {
    if width == 0 {
        return Err(ShapeError::ZeroDimension("width"));
    }
    if height == 0 {
        return Err(ShapeError::ZeroDimension("height"));
    }
    let channels = byte_order.channels();
    width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(channels))
        .ok_or(ShapeError::TooLarge {
            width,
            height,
            channels,
        })
}
