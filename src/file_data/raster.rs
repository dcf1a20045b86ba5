//! Fallback reader for single-plane raster files, via the
//! `image` crate. Covers compressed TIFFs and the common
//! 8/16-bit and float formats the native reader skips.

use std::path::Path;

use image::DynamicImage;
use log::debug;
use ndarray::{ArrayD, IxDyn};

use crate::data::image::ImageStack;
use crate::MetricsError;

/// `(channels, samples)` from any `ImageBuffer`, samples kept at
/// their native value (no rescaling to 0..1 or to 16 bits).
macro_rules! raw_samples {
    ($buffer : expr, $channels : expr) => {
        ($channels, $buffer.into_raw().into_iter().map(f64::from).collect::<Vec<f64>>())
    };
}

/// Reads a raster image as `(Y, X)` for single-channel images or
/// `(Y, X, C)` otherwise.
pub fn open_raster(path : &Path) -> Result<ImageStack<f64>, MetricsError> {
    let img = image::open(path)?;
    let (height, width) = (img.height() as usize, img.width() as usize);

    let (channels, samples) = match img {
        DynamicImage::ImageLuma8(buf) => raw_samples!(buf, 1),
        DynamicImage::ImageLumaA8(buf) => raw_samples!(buf, 2),
        DynamicImage::ImageRgb8(buf) => raw_samples!(buf, 3),
        DynamicImage::ImageRgba8(buf) => raw_samples!(buf, 4),
        DynamicImage::ImageLuma16(buf) => raw_samples!(buf, 1),
        DynamicImage::ImageLumaA16(buf) => raw_samples!(buf, 2),
        DynamicImage::ImageRgb16(buf) => raw_samples!(buf, 3),
        DynamicImage::ImageRgba16(buf) => raw_samples!(buf, 4),
        DynamicImage::ImageRgb32F(buf) => raw_samples!(buf, 3),
        DynamicImage::ImageRgba32F(buf) => raw_samples!(buf, 4),
        other => raw_samples!(other.into_rgba32f(), 4),
    };

    let shape = if channels == 1 {
        vec![height, width]
    } else {
        vec![height, width, channels]
    };
    debug!("{}: decoded raster {:?}", path.display(), shape);

    let data = ArrayD::from_shape_vec(IxDyn(&shape), samples)
        .map_err(|err| MetricsError::Format(err.to_string()))?;
    let axes = if channels == 1 { "YX" } else { "YXC" };
    Ok(ImageStack::new(data, path).with_axes(axes.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    #[test]
    fn grayscale_png_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g.png");
        let img : ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_fn(5, 3, |x, y| Luma([(y * 1000 + x) as u16]));
        img.save(&path).unwrap();

        let stack = open_raster(&path).unwrap();
        assert_eq!(stack.shape(), &[3, 5]);
        assert_eq!(stack.data[[2, 4]], 2004.0);
        assert_eq!(stack.axes.unwrap().to_string(), "YX");
    }

    #[test]
    fn rgb_png_has_trailing_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.png");
        let img : ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_fn(4, 2, |x, _| Rgb([x as u8, 10, 20]));
        img.save(&path).unwrap();

        let stack = open_raster(&path).unwrap();
        assert_eq!(stack.shape(), &[2, 4, 3]);
        assert_eq!(stack.data[[1, 3, 0]], 3.0);
        assert_eq!(stack.data[[1, 3, 2]], 20.0);
    }
}
