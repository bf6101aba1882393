//! Pixel buffers and normalized model-input tensors.
//!
//! This crate covers the CPU half of the frame-to-tensor path: a host hands
//! over a [`PixelBuffer`] after GPU readback, and [`normalize`] turns it into
//! a [`NormalizedTensor`] shaped for a classification network.
//!
//! # Usage
//!
//! ```
//! use frameclass_tensor::{normalize, ByteOrder, PixelBuffer, TargetShape};
//!
//! let pixels = PixelBuffer::new(4, 4, ByteOrder::Bgra, vec![0u8; 4 * 4 * 4]).unwrap();
//! let target = TargetShape::new(2, 2, 3);
//! let tensor = normalize(&pixels, target, 0.0, 1.0).unwrap();
//! assert_eq!(tensor.shape(), [1, 2, 2, 3]);
//! assert!(tensor.values().iter().all(|&v| v == 0.0));
//! ```
//!
//! # Pipeline
//!
//! 1. Channel remap: output channel `c` reads source channel `(channels - 1) - c`
//!    (BGRA readback becomes RGB).
//! 2. Byte to float widening.
//! 3. Leading batch dimension of 1.
//! 4. Bilinear resize to the target height and width.
//! 5. `(value - mean) / stddev` with one scalar pair for all channels.

mod error;
mod normalize;
mod pixel;
mod tensor;

pub use error::ShapeError;
pub use normalize::{normalize, resize_bilinear, sample_channels};
pub use pixel::{ByteOrder, PixelBuffer};
pub use tensor::{NormalizedTensor, TargetShape};
