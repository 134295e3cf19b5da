// THEORY:
// The `ContourExtractor` is the bridge between raw pixels and the geometric world
// the rest of the pipeline lives in. It turns an RGBA frame into a binary
// foreground mask, cleans the mask up, and traces the outline of every
// connected foreground shape.
//
// Two mask strategies are supported:
// 1.  **Grayscale threshold**: the marker is a dark shape on a light background.
//     Luma at or below the threshold becomes foreground, then a light erosion
//     removes speckle and breaks thin bridges between touching shapes.
// 2.  **Dual hue-range color mask**: the marker is a specific saturated color.
//     A pixel is foreground when it is saturated and bright enough and its hue
//     lies inside the configured band. On the 0..180 hue scale a band around red
//     crosses the 0/180 seam, so it is split into two ranges. An opening (erode,
//     then dilate) removes noise without shrinking the marker.
//
// The extractor only measures geometry: bounding box, polygon area and convex
// hull area. Deciding what is a marker is the `BlobClassifier`'s job.

use crate::config::{DetectionConfig, DetectionStrategy};
use crate::core_modules::blob_classifier::{BoundingBox, ContourGeometry};
use crate::core_modules::pixel::Pixel;
use crate::error::{PitchError, Result};
use image::{GrayImage, Luma, RgbaImage};
use imageproc::contours::{BorderType, find_contours};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::distance_transform::Norm;
use imageproc::geometry::convex_hull;
use imageproc::morphology::{dilate, erode};
use imageproc::point::Point;

const FOREGROUND: Luma<u8> = Luma([255]);
const BACKGROUND: Luma<u8> = Luma([0]);

/// Frame → contour geometry. Owns all image preprocessing.
pub trait ContourExtractor: Send {
    fn extract(&self, frame: &RgbaImage) -> Result<Vec<ContourGeometry>>;
}

/// Inclusive hue ranges on the 0..180 scale for a band `center ± tolerance`.
pub fn hue_ranges(center: u8, tolerance: u8) -> Vec<(f32, f32)> {
    let low = center as f32 - tolerance as f32;
    let high = center as f32 + tolerance as f32;
    if low < 0.0 {
        vec![(0.0, high), (180.0 + low, 180.0)]
    } else if high > 180.0 {
        vec![(low, 180.0), (0.0, high - 180.0)]
    } else {
        vec![(low, high)]
    }
}

/// Shoelace area of a closed polygon.
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice_area.abs() as f64 / 2.0
}

/// Measures one traced outline.
pub fn contour_geometry(points: &[Point<i32>]) -> Option<ContourGeometry> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    let hull = convex_hull(points);
    Some(ContourGeometry {
        bounding_box: BoundingBox {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        },
        area: polygon_area(points),
        hull_area: polygon_area(&hull),
    })
}

/// Contour extraction on `image` buffers with `imageproc`.
#[derive(Debug, Clone)]
pub struct ImageContourExtractor {
    config: DetectionConfig,
    hue_ranges: Vec<(f32, f32)>,
}

impl ImageContourExtractor {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            config: config.clone(),
            hue_ranges: hue_ranges(config.hue_center, config.hue_tolerance),
        }
    }

    /// The cleaned binary mask for a frame; foreground is 255.
    pub fn foreground_mask(&self, frame: &RgbaImage) -> GrayImage {
        match self.config.strategy {
            DetectionStrategy::Grayscale => self.grayscale_mask(frame),
            DetectionStrategy::Color => self.color_mask(frame),
        }
    }

    fn grayscale_mask(&self, frame: &RgbaImage) -> GrayImage {
        let gray = image::imageops::grayscale(frame);
        let mask = threshold(&gray, self.config.gray_threshold, ThresholdType::BinaryInverted);
        if self.config.erode_radius > 0 {
            erode(&mask, Norm::LInf, self.config.erode_radius)
        } else {
            mask
        }
    }

    fn color_mask(&self, frame: &RgbaImage) -> GrayImage {
        let saturation_min = self.config.saturation_min as f32 / 255.0;
        let value_min = self.config.value_min as f32 / 255.0;

        let mut mask = GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
            let pixel = Pixel::from(*frame.get_pixel(x, y));
            if pixel.saturation_hsv() < saturation_min || pixel.value_hsv() < value_min {
                return BACKGROUND;
            }
            let hue = pixel.hue_half_degrees();
            if self.hue_ranges.iter().any(|&(low, high)| hue >= low && hue <= high) {
                FOREGROUND
            } else {
                BACKGROUND
            }
        });

        if self.config.erode_radius > 0 {
            mask = erode(&mask, Norm::LInf, self.config.erode_radius);
        }
        if self.config.dilate_radius > 0 {
            mask = dilate(&mask, Norm::LInf, self.config.dilate_radius);
        }
        mask
    }
}

impl ContourExtractor for ImageContourExtractor {
    fn extract(&self, frame: &RgbaImage) -> Result<Vec<ContourGeometry>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(PitchError::Extraction(format!(
                "empty frame {}x{}",
                frame.width(),
                frame.height()
            )));
        }

        let mask = self.foreground_mask(frame);
        Ok(find_contours::<i32>(&mask)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .filter_map(|contour| contour_geometry(&contour.points))
            .collect())
    }
}
