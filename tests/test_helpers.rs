//! # Test Helper Library
//!
//! Synthetic document canvases, on-disk fixtures and OCR engine doubles
//! shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scanprep::ocr::{OcrEngine, StaticTextEngine};
use scanprep::preprocessing::{rotate_about_center, Interpolation};
use scanprep::PipelineError;

/// Black 500x300 color canvas with a filled white 100x100 square at (100, 100)
pub fn square_canvas() -> DynamicImage {
    canvas_with_square(500, 300, (100, 100, 100))
}

/// Black color canvas with a filled white square `(x, y, side)`
pub fn canvas_with_square(width: u32, height: u32, square: (u32, u32, u32)) -> DynamicImage {
    let (sx, sy, side) = square;
    let mut img = RgbImage::new(width, height);
    for y in sy..sy + side {
        for x in sx..sx + side {
            img.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    DynamicImage::ImageRgb8(img)
}

/// Black 500x300 grayscale canvas with a centered 240x80 white bar rotated
/// by `degrees` (clockwise on screen)
pub fn rotated_bar_canvas(degrees: f32) -> DynamicImage {
    let mut img = GrayImage::new(500, 300);
    for y in 110..190 {
        for x in 130..370 {
            img.put_pixel(x, y, Luma([255]));
        }
    }
    rotate_about_center(&DynamicImage::ImageLuma8(img), degrees, Interpolation::Bilinear)
}

/// Grayscale noise with a fixed seed
pub fn noise_image(width: u32, height: u32, seed: u64) -> GrayImage {
    let mut rng = StdRng::seed_from_u64(seed);
    GrayImage::from_fn(width, height, |_, _| Luma([rng.random_range(0..=255u8)]))
}

/// Saves an image into `dir` and returns its path
pub fn write_image(dir: &Path, name: &str, image: &DynamicImage) -> PathBuf {
    let path = dir.join(name);
    image.save(&path).expect("Failed to write test image");
    path
}

/// Lets a test keep a handle on an engine it gave to a pipeline
pub struct SharedEngine(pub Arc<StaticTextEngine>);

impl SharedEngine {
    pub fn new(text: &str) -> (Self, Arc<StaticTextEngine>) {
        let engine = Arc::new(StaticTextEngine::new(text));
        (Self(engine.clone()), engine)
    }
}

impl OcrEngine for SharedEngine {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn recognize(&self, image: &GrayImage) -> Result<String, PipelineError> {
        self.0.recognize(image)
    }
}

/// Engine that always fails
pub struct FailingEngine;

impl OcrEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    fn recognize(&self, _image: &GrayImage) -> Result<String, PipelineError> {
        Err(PipelineError::Engine("engine unavailable".to_string()))
    }
}

/// Asserts two values are within `tolerance` of each other
pub fn assert_near(actual: u32, expected: u32, tolerance: u32, what: &str) {
    assert!(
        actual.abs_diff(expected) <= tolerance,
        "{}: expected {} +/- {}, got {}",
        what,
        expected,
        tolerance,
        actual
    );
}
