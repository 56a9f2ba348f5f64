//! Image pre-processing before OCR.
//!
//! Scans that are already grayscale go to Tesseract untouched. Colour scans
//! are denoised, converted to grayscale and sharpened with an unsharp mask
//! (`1.5 * gray - 0.2 * blur`).

use std::path::Path;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::{gaussian_blur_f32, median_filter};

use crate::OcrError;

const BLUR_SIGMA: f32 = 1.0;
const GRAY_WEIGHT: f32 = 1.5;
const BLUR_WEIGHT: f32 = -0.2;

/// True if every pixel has equal colour channels.
pub fn is_grayscale(img: &DynamicImage) -> bool {
    match img {
        DynamicImage::ImageLuma8(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA16(_) => true,
        _ => img
            .to_rgb8()
            .pixels()
            .all(|p| p[0] == p[1] && p[1] == p[2]),
    }
}

/// Denoise, grayscale and sharpen a colour scan.
pub fn normalize_color(img: &DynamicImage) -> GrayImage {
    let denoised = median_filter(&img.to_rgb8(), 1, 1);
    let gray = DynamicImage::ImageRgb8(denoised).to_luma8();
    let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);

    let mut out = GrayImage::new(gray.width(), gray.height());
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let g = gray.get_pixel(x, y)[0] as f32;
        let b = blurred.get_pixel(x, y)[0] as f32;
        let value = (GRAY_WEIGHT * g + BLUR_WEIGHT * b).round().clamp(0.0, 255.0);
        *pixel = Luma([value as u8]);
    }
    out
}

/// Normalises the image at `path` in place if it is a colour scan.
///
/// Returns the image dimensions and whether the file was rewritten.
pub fn prepare_for_ocr(path: &Path) -> Result<(u32, u32, bool), OcrError> {
    let img = image::open(path)
        .map_err(|e| OcrError::ImageProcess(format!("cannot open {}: {}", path.display(), e)))?;
    let (width, height) = (img.width(), img.height());

    if is_grayscale(&img) {
        log::debug!("[Preprocess] {} is grayscale", path.display());
        return Ok((width, height, false));
    }

    let normalized = normalize_color(&img);
    normalized
        .save(path)
        .map_err(|e| OcrError::ImageProcess(format!("cannot save {}: {}", path.display(), e)))?;
    log::info!("[Preprocess] normalised colour scan {}", path.display());
    Ok((width, height, true))
}

/// Dimensions of the image at `path`, without decoding pixel data.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32), OcrError> {
    image::image_dimensions(path)
        .map_err(|e| OcrError::ImageProcess(format!("cannot read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_grayscale_detection() {
        let gray = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([90])));
        assert!(is_grayscale(&gray));

        let neutral = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([50, 50, 50])));
        assert!(is_grayscale(&neutral));

        let mut colour = RgbImage::from_pixel(4, 4, Rgb([50, 50, 50]));
        colour.put_pixel(2, 2, Rgb([200, 10, 10]));
        assert!(!is_grayscale(&DynamicImage::ImageRgb8(colour)));
    }

    #[test]
    fn test_normalize_flat_image() {
        // flat input: blur equals gray, so the result is 1.3 * gray
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([100, 100, 100])));
        let out = normalize_color(&img);
        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(out.get_pixel(4, 4)[0], 130);
    }

    #[test]
    fn test_prepare_rewrites_colour_scans_only() {
        let dir = tempfile::tempdir().unwrap();

        let gray_path = dir.path().join("gray.png");
        GrayImage::from_pixel(6, 4, Luma([10])).save(&gray_path).unwrap();
        assert_eq!(prepare_for_ocr(&gray_path).unwrap(), (6, 4, false));

        let colour_path = dir.path().join("colour.png");
        RgbImage::from_pixel(6, 4, Rgb([200, 30, 30]))
            .save(&colour_path)
            .unwrap();
        assert_eq!(prepare_for_ocr(&colour_path).unwrap(), (6, 4, true));
        let reopened = image::open(&colour_path).unwrap();
        assert!(is_grayscale(&reopened));

        assert!(prepare_for_ocr(&dir.path().join("missing.png")).is_err());
    }
}
