//! Pixel buffer to normalized tensor conversion.

use crate::error::ShapeError;
use crate::pixel::PixelBuffer;
use crate::tensor::{NormalizedTensor, TargetShape};

/// Converts a pixel buffer into a `(1, height, width, channels)` tensor.
///
/// Output channel `c` is read from source channel `(target.channels - 1) - c`,
/// so a BGRA readback yields RGB. The sampled bytes are widened to `f32`,
/// bilinearly resized to `target.height x target.width` and mapped through
/// `(value - mean) / stddev` with the same scalars for every channel.
///
/// The input buffer is not modified.
pub fn normalize(
    buffer: &PixelBuffer,
    target: TargetShape,
    mean: f32,
    stddev: f32,
) -> Result<NormalizedTensor, ShapeError> {
    if target.height == 0 {
        return Err(ShapeError::ZeroDimension("target height"));
    }
    if target.width == 0 {
        return Err(ShapeError::ZeroDimension("target width"));
    }
    if stddev == 0.0 || !stddev.is_finite() {
        return Err(ShapeError::InvalidStddev(stddev.to_string()));
    }

    let sampled = sample_channels(buffer, target.channels)?;
    let mut values = resize_bilinear(
        &sampled,
        (buffer.height(), buffer.width(), target.channels),
        (target.height, target.width),
    );

    for v in &mut values {
        *v = (*v - mean) / stddev;
    }

    NormalizedTensor::from_parts(target.batched(), values)
}

/// Reads `channels` channels from every pixel in reverse order and widens
/// them to `f32`. No scaling is applied.
///
/// The result is row-major HWC with `buffer.height() * buffer.width() * channels`
/// elements.
pub fn sample_channels(buffer: &PixelBuffer, channels: usize) -> Result<Vec<f32>, ShapeError> {
    if channels == 0 {
        return Err(ShapeError::ZeroDimension("target channels"));
    }
    let available = buffer.channels();
    if available < channels {
        return Err(ShapeError::InsufficientChannels {
            needed: channels,
            available,
        });
    }

    let mut out = Vec::with_capacity(buffer.width() * buffer.height() * channels);
    for px in buffer.data().chunks_exact(available) {
        for c in 0..channels {
            out.push(px[(channels - 1) - c] as f32);
        }
    }
    Ok(out)
}

/// Bilinear resize of a row-major HWC float image.
///
/// Source coordinates are `dst * (src_size / dst_size)` without half-pixel
/// offsets or corner alignment; neighbours past the last row or column are
/// clamped to the edge.
pub fn resize_bilinear(
    src: &[f32],
    (src_h, src_w, channels): (usize, usize, usize),
    (dst_h, dst_w): (usize, usize),
) -> Vec<f32> {
    debug_assert_eq!(src.len(), src_h * src_w * channels);

    if src_h == dst_h && src_w == dst_w {
        return src.to_vec();
    }

    let ys = interpolation_weights(src_h, dst_h);
    let xs = interpolation_weights(src_w, dst_w);

    let mut out = vec![0.0f32; dst_h * dst_w * channels];
    for (y, yw) in ys.iter().enumerate() {
        let top = yw.lower * src_w;
        let bottom = yw.upper * src_w;
        for (x, xw) in xs.iter().enumerate() {
            let tl = (top + xw.lower) * channels;
            let tr = (top + xw.upper) * channels;
            let bl = (bottom + xw.lower) * channels;
            let br = (bottom + xw.upper) * channels;
            let dst = (y * dst_w + x) * channels;
            for c in 0..channels {
                let t = src[tl + c] + (src[tr + c] - src[tl + c]) * xw.lerp;
                let b = src[bl + c] + (src[br + c] - src[bl + c]) * xw.lerp;
                out[dst + c] = t + (b - t) * yw.lerp;
            }
        }
    }
    out
}

struct Weight {
    lower: usize,
    upper: usize,
    lerp: f32,
}

fn interpolation_weights(src: usize, dst: usize) -> Vec<Weight> {
    let scale = src as f32 / dst as f32;
    (0..dst)
        .map(|i| {
            let pos = i as f32 * scale;
            let lower = (pos.floor() as usize).min(src - 1);
            let upper = (pos.ceil() as usize).min(src - 1);
            Weight {
                lower,
                upper,
                lerp: pos - pos.floor(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::ByteOrder;

    fn bgra(width: usize, height: usize, data: Vec<u8>) -> PixelBuffer {
        PixelBuffer::new(width, height, ByteOrder::Bgra, data).unwrap()
    }

    #[test]
    fn output_shape_matches_target() {
        for (order, ch) in [(ByteOrder::Bgr, 3), (ByteOrder::Bgra, 4)] {
            let buf = PixelBuffer::new(7, 5, order, vec![17u8; 7 * 5 * ch]).unwrap();
            for target in [
                TargetShape::new(3, 3, 3),
                TargetShape::new(10, 4, 3),
                TargetShape::new(5, 7, ch),
            ] {
                let t = normalize(&buf, target, 128.0, 128.0).unwrap();
                assert_eq!(t.shape(), [1, target.height, target.width, target.channels]);
                assert_eq!(t.values().len(), target.element_count());
            }
        }
    }

    #[test]
    fn bgra_pixel_reads_as_rgb() {
        let (b, g, r, a) = (10u8, 20u8, 30u8, 255u8);
        let buf = bgra(1, 1, vec![b, g, r, a]);
        let sampled = sample_channels(&buf, 3).unwrap();
        assert_eq!(sampled, vec![r as f32, g as f32, b as f32]);
    }

    #[test]
    fn four_channel_target_reverses_alpha_too() {
        let buf = bgra(1, 1, vec![1, 2, 3, 4]);
        assert_eq!(sample_channels(&buf, 4).unwrap(), vec![4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn single_channel_reads_first_byte() {
        let buf = bgra(2, 1, vec![9, 1, 1, 1, 7, 1, 1, 1]);
        assert_eq!(sample_channels(&buf, 1).unwrap(), vec![9.0, 7.0]);
    }

    #[test]
    fn mean_128_stddev_128_scale() {
        let buf = PixelBuffer::new(3, 1, ByteOrder::Gray, vec![128, 0, 255]).unwrap();
        let t = normalize(&buf, TargetShape::new(1, 3, 1), 128.0, 128.0).unwrap();
        assert_eq!(t.values()[0], 0.0);
        assert_eq!(t.values()[1], -1.0);
        assert!((t.values()[2] - 0.992).abs() < 1e-3, "got {}", t.values()[2]);
    }

    #[test]
    fn black_frame_normalizes_to_zero() {
        let buf = bgra(4, 4, vec![0u8; 4 * 4 * 4]);
        let t = normalize(&buf, TargetShape::new(2, 2, 3), 0.0, 1.0).unwrap();
        assert_eq!(t.shape(), [1, 2, 2, 3]);
        assert_eq!(t.values(), &[0.0f32; 12][..]);
    }

    #[test]
    fn downscale_samples_top_left_of_each_block() {
        // 4x4 gray with value = y * 4 + x. Scale 2 lands on integer source
        // coordinates, so no blending happens.
        let data: Vec<u8> = (0..16).collect();
        let buf = PixelBuffer::new(4, 4, ByteOrder::Gray, data).unwrap();
        let t = normalize(&buf, TargetShape::new(2, 2, 1), 0.0, 1.0).unwrap();
        assert_eq!(t.values(), &[0.0, 2.0, 8.0, 10.0]);
    }

    #[test]
    fn upscale_blends_and_clamps_edges() {
        let src = vec![0.0, 10.0];
        let out = resize_bilinear(&src, (1, 2, 1), (1, 4));
        // Positions 0, 0.5, 1.0, 1.5 -> the last clamps to the edge.
        assert_eq!(out, vec![0.0, 5.0, 10.0, 10.0]);
    }

    #[test]
    fn identity_resize_copies() {
        let src: Vec<f32> = (0..12).map(|v| v as f32).collect();
        assert_eq!(resize_bilinear(&src, (2, 2, 3), (2, 2)), src);
    }

    #[test]
    fn channel_shortfall_is_rejected() {
        let buf = PixelBuffer::new(1, 1, ByteOrder::Gray, vec![0]).unwrap();
        assert_eq!(
            normalize(&buf, TargetShape::new(1, 1, 3), 0.0, 1.0).unwrap_err(),
            ShapeError::InsufficientChannels {
                needed: 3,
                available: 1
            }
        );
    }

    #[test]
    fn zero_target_is_rejected() {
        let buf = bgra(1, 1, vec![0; 4]);
        assert!(normalize(&buf, TargetShape::new(0, 1, 3), 0.0, 1.0).is_err());
        assert!(normalize(&buf, TargetShape::new(1, 0, 3), 0.0, 1.0).is_err());
        assert!(normalize(&buf, TargetShape::new(1, 1, 0), 0.0, 1.0).is_err());
    }

    #[test]
    fn zero_stddev_is_rejected() {
        let buf = bgra(1, 1, vec![0; 4]);
        assert!(matches!(
            normalize(&buf, TargetShape::new(1, 1, 3), 0.0, 0.0),
            Err(ShapeError::InvalidStddev(_))
        ));
    }

    #[test]
    fn input_is_untouched() {
        let buf = bgra(2, 2, (0..16).collect());
        let before = buf.clone();
        let _ = normalize(&buf, TargetShape::new(3, 3, 3), 128.0, 128.0).unwrap();
        assert_eq!(buf, before);
    }
}
