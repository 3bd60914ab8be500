//! Image preprocessing for OCR.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::CropRect;

/// Image preprocessor for the roster screenshot.
pub struct ImagePreprocessor {
    /// Region holding the roster list.
    crop: CropRect,
    /// Upscale factor applied by `enhance`.
    upscale_factor: f32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            crop: CropRect::default(),
            upscale_factor: 1.5,
        }
    }

    /// Set the crop rectangle.
    pub fn with_crop(mut self, crop: CropRect) -> Self {
        self.crop = crop;
        self
    }

    /// Set the upscale factor used by `enhance`.
    pub fn with_upscale_factor(mut self, factor: f32) -> Self {
        self.upscale_factor = factor;
        self
    }

    /// Crop the image to the configured fractional rectangle.
    pub fn crop(&self, image: &DynamicImage) -> Result<DynamicImage, OcrError> {
        let (width, height) = image.dimensions();
        let (x, y, w, h) = self.crop.to_pixels(width, height);

        if w == 0 || h == 0 {
            return Err(OcrError::InvalidImage(format!(
                "crop of {}x{} image is empty",
                width, height
            )));
        }

        debug!("Cropping {}x{} to {}x{} at ({}, {})", width, height, w, h, x, y);
        Ok(image.crop_imm(x, y, w, h))
    }

    /// Grayscale, upscale, and binarize for sparse-text OCR.
    pub fn enhance(&self, image: &DynamicImage) -> Result<DynamicImage, OcrError> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();

        let new_width = (width as f32 * self.upscale_factor).round() as u32;
        let new_height = (height as f32 * self.upscale_factor).round() as u32;
        if new_width == 0 || new_height == 0 {
            return Err(OcrError::Preprocessing(format!(
                "upscale factor {} collapses {}x{} image",
                self.upscale_factor, width, height
            )));
        }

        let resized = image::imageops::resize(
            &gray,
            new_width,
            new_height,
            image::imageops::FilterType::Lanczos3,
        );

        let threshold = otsu_threshold(&resized);
        debug!("Otsu threshold {} on {}x{}", threshold, new_width, new_height);

        Ok(DynamicImage::ImageLuma8(binarize(&resized, threshold)))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Global threshold maximizing between-class variance of the histogram.
fn otsu_threshold(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(value, &count)| value as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut best_threshold = 0u8;
    let mut best_variance = 0f64;

    for (value, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += value as f64 * count as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight as f64;

        let variance = background_weight as f64
            * foreground_weight as f64
            * (background_mean - foreground_mean).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_threshold = value as u8;
        }
    }

    best_threshold
}

fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let output = if pixel[0] > threshold { 255 } else { 0 };
        result.put_pixel(x, y, Luma([output]));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_crop_uses_fractions() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(1000, 2000));
        let cropped = ImagePreprocessor::new().crop(&image).unwrap();
        assert_eq!(cropped.dimensions(), (370, 1140));
    }

    #[test]
    fn test_crop_of_tiny_image_is_invalid() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let result = ImagePreprocessor::new().crop(&empty);
        assert!(matches!(result, Err(OcrError::InvalidImage(_))));

        let sliver = CropRect {
            left: 0.40,
            top: 0.0,
            right: 0.45,
            bottom: 1.0,
        };
        let narrow = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let result = ImagePreprocessor::new().with_crop(sliver).crop(&narrow);
        assert!(matches!(result, Err(OcrError::InvalidImage(_))));
    }

    #[test]
    fn test_enhance_binarizes_and_upscales() {
        let mut image = RgbImage::from_pixel(20, 10, Rgb([30, 30, 30]));
        for x in 10..20 {
            for y in 0..10 {
                image.put_pixel(x, y, Rgb([220, 220, 220]));
            }
        }

        let enhanced = ImagePreprocessor::new()
            .enhance(&DynamicImage::ImageRgb8(image))
            .unwrap();
        assert_eq!(enhanced.dimensions(), (30, 15));

        let luma = enhanced.to_luma8();
        assert!(luma.pixels().all(|p| p[0] == 0 || p[0] == 255));
        assert_eq!(luma.get_pixel(0, 0)[0], 0);
        assert_eq!(luma.get_pixel(29, 14)[0], 255);
    }

    #[test]
    fn test_otsu_splits_two_levels() {
        let mut image = GrayImage::from_pixel(4, 1, Luma([10]));
        image.put_pixel(2, 0, Luma([200]));
        image.put_pixel(3, 0, Luma([200]));
        let threshold = otsu_threshold(&image);
        assert!((10..200).contains(&threshold));
    }
}
