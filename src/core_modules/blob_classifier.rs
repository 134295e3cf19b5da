// THEORY:
// The `BlobClassifier` is the first gate of the pitch pipeline. The contour
// extractor hands it every connected shape it could find in the thresholded
// frame: marker dots, but also hands, shadows, sheet-music glyphs and sensor
// noise. The classifier keeps only the shapes that look like a marker.
//
// Three cheap geometric tests decide:
// 1.  **Area**: too small is noise, too large is a hand or a shadow.
// 2.  **Aspect ratio**: the bounding box of a dot or a square sticker is close
//     to square; long strokes are rejected.
// 3.  **Solidity**: contour area over convex-hull area. A filled dot is convex
//     (close to 1.0); ragged or concave shapes fall below the threshold.
//
// Like the `BlobDetector` of a motion engine, it is a stateless utility with no
// memory of previous frames. An empty output is normal and common.

use crate::config::MarkerProfile;

/// Axis-aligned bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// Raw geometry of one contour, as produced by the contour extractor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourGeometry {
    pub bounding_box: BoundingBox,
    /// Enclosed area of the contour polygon.
    pub area: f64,
    /// Enclosed area of the contour's convex hull.
    pub hull_area: f64,
}

/// A contour that passed every shape test. Discarded at the end of the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobCandidate {
    pub bounding_box: BoundingBox,
    pub area: f64,
    pub centroid: (f64, f64),
    pub aspect_ratio: f64,
    pub solidity: f64,
}

impl BlobCandidate {
    pub fn x(&self) -> f64 {
        self.centroid.0
    }

    pub fn y(&self) -> f64 {
        self.centroid.1
    }
}

/// Inclusive acceptance ranges for the three shape tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierThresholds {
    pub area_min: f64,
    pub area_max: f64,
    pub aspect_min: f64,
    pub aspect_max: f64,
    pub solidity_min: f64,
}

impl ClassifierThresholds {
    pub fn for_profile(profile: MarkerProfile) -> Self {
        match profile {
            MarkerProfile::Round => Self {
                area_min: 50.0,
                area_max: 4000.0,
                aspect_min: 0.5,
                aspect_max: 2.0,
                solidity_min: 0.8,
            },
            MarkerProfile::Square => Self {
                area_min: 70.0,
                area_max: 6000.0,
                aspect_min: 0.7,
                aspect_max: 1.3,
                solidity_min: 0.85,
            },
        }
    }
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self::for_profile(MarkerProfile::Round)
    }
}

/// Filters raw contour geometry down to marker candidates.
#[derive(Debug, Clone)]
pub struct BlobClassifier {
    thresholds: ClassifierThresholds,
}

impl BlobClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &ClassifierThresholds {
        &self.thresholds
    }

    /// Keeps the contours that look like a marker, in input order.
    pub fn classify(&self, contours: &[ContourGeometry]) -> Vec<BlobCandidate> {
        contours.iter().filter_map(|c| self.classify_one(c)).collect()
    }

    /// Runs the three shape tests on a single contour.
    pub fn classify_one(&self, contour: &ContourGeometry) -> Option<BlobCandidate> {
        let t = &self.thresholds;

        if contour.area < t.area_min || contour.area > t.area_max {
            return None;
        }

        let bbox = contour.bounding_box;
        if bbox.height == 0 {
            return None;
        }
        let aspect_ratio = bbox.width as f64 / bbox.height as f64;
        if aspect_ratio < t.aspect_min || aspect_ratio > t.aspect_max {
            return None;
        }

        if contour.hull_area <= 0.0 {
            return None;
        }
        let solidity = contour.area / contour.hull_area;
        if solidity < t.solidity_min {
            return None;
        }

        Some(BlobCandidate {
            bounding_box: bbox,
            area: contour.area,
            centroid: bbox.center(),
            aspect_ratio,
            solidity,
        })
    }
}

impl Default for BlobClassifier {
    fn default() -> Self {
        Self::new(ClassifierThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contour(width: u32, height: u32, area: f64, hull_area: f64) -> ContourGeometry {
        ContourGeometry {
            bounding_box: BoundingBox { x: 100, y: 40, width, height },
            area,
            hull_area,
        }
    }

    #[test]
    fn accepts_a_filled_dot() {
        let classifier = BlobClassifier::default();
        let dot = contour(20, 20, 300.0, 310.0);
        let candidate = classifier.classify_one(&dot).unwrap();
        assert_eq!(candidate.centroid, (110.0, 50.0));
        assert!((candidate.solidity - 300.0 / 310.0).abs() < 1e-12);
        assert_eq!(candidate.aspect_ratio, 1.0);
    }

    #[test]
    fn area_outside_range_is_always_excluded() {
        let classifier = BlobClassifier::default();
        // Perfect shape otherwise.
        assert!(classifier.classify_one(&contour(5, 5, 49.0, 49.0)).is_none());
        assert!(classifier.classify_one(&contour(70, 70, 4000.5, 4000.5)).is_none());
        assert!(classifier.classify_one(&contour(8, 8, 50.0, 50.0)).is_some());
        assert!(classifier.classify_one(&contour(64, 64, 4000.0, 4000.0)).is_some());
    }

    #[test]
    fn rejects_elongated_shapes() {
        let classifier = BlobClassifier::default();
        assert!(classifier.classify_one(&contour(50, 10, 400.0, 400.0)).is_none());
        assert!(classifier.classify_one(&contour(10, 50, 400.0, 400.0)).is_none());
    }

    #[test]
    fn square_profile_is_stricter_on_aspect() {
        let classifier = BlobClassifier::new(ClassifierThresholds::for_profile(MarkerProfile::Square));
        // 1.5 passes a round profile but not a square one.
        assert!(classifier.classify_one(&contour(30, 20, 500.0, 500.0)).is_none());
        assert!(BlobClassifier::default().classify_one(&contour(30, 20, 500.0, 500.0)).is_some());
    }

    #[test]
    fn rejects_zero_hull_and_concave_shapes() {
        let classifier = BlobClassifier::default();
        assert!(classifier.classify_one(&contour(20, 20, 300.0, 0.0)).is_none());
        assert!(classifier.classify_one(&contour(20, 20, 300.0, 400.0)).is_none());
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(BlobClassifier::default().classify(&[]).is_empty());
    }
}
