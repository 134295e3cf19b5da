// THEORY (1D Pixel Heuristics):
// The `Pixel` module is the smallest unit the contour extractor reasons about. It
// is a "dumb" data container for a single RGBA pixel plus the handful of
// single-pixel heuristics the marker masks need. Nothing here reads a neighbor;
// anything spatial (erosion, contours) belongs to the extractor.
//
// Heuristic families:
// - Brightness:     HSV value (max channel)
// - Color strength: chroma (max − min), HSV saturation (chroma / value)
// - Hue:            angle on the color wheel, in degrees [0, 360) and on the
//                   half-degree 0..180 scale that 8-bit HSV masks use
//
// All heuristics use normalized sRGB directly: fast enough to run on every pixel
// of every frame, and accurate enough for coarse color bucketing.

pub type Channel = u8;
pub type NormalizedChannel = f32;
pub type Hue = f32;

/// A single RGBA pixel with its normalized channels precomputed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pixel {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
    pub alpha: Channel,
    red_normalized: NormalizedChannel,
    green_normalized: NormalizedChannel,
    blue_normalized: NormalizedChannel,
}

impl Pixel {
    pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
        Pixel {
            red,
            green,
            blue,
            alpha,
            red_normalized: red as NormalizedChannel / 255.0f32,
            green_normalized: green as NormalizedChannel / 255.0f32,
            blue_normalized: blue as NormalizedChannel / 255.0f32,
        }
    }

    fn max_channel(&self) -> NormalizedChannel {
        self.red_normalized
            .max(self.green_normalized.max(self.blue_normalized))
    }

    fn min_channel(&self) -> NormalizedChannel {
        self.red_normalized
            .min(self.green_normalized.min(self.blue_normalized))
    }

    /// HSV Value (V): max(R, G, B) in 0..1.
    pub fn value_hsv(&self) -> NormalizedChannel {
        self.max_channel()
    }

    /// Chroma: max − min in 0..1.
    pub fn chroma(&self) -> NormalizedChannel {
        self.max_channel() - self.min_channel()
    }

    /// HSV Saturation: chroma / value in 0..1; zero for black.
    pub fn saturation_hsv(&self) -> NormalizedChannel {
        let value = self.value_hsv();
        if value <= 1e-6 { 0.0 } else { self.chroma() / value }
    }

    /// Hue angle in degrees [0, 360). Achromatic pixels report 0.
    pub fn hue(&self) -> Hue {
        let maximum_channel = self.max_channel();
        let chroma = self.chroma();
        if chroma <= 1e-6 {
            return 0.0;
        }
        let inverse_chroma = 1.0 / chroma;

        let (base_difference, sector_offset) = if maximum_channel == self.red_normalized {
            (self.green_normalized - self.blue_normalized, 0.0)
        } else if maximum_channel == self.green_normalized {
            (self.blue_normalized - self.red_normalized, 2.0)
        } else {
            (self.red_normalized - self.green_normalized, 4.0)
        };

        let mut hue_degrees = (base_difference * inverse_chroma + sector_offset) * 60.0;
        if hue_degrees < 0.0 {
            hue_degrees += 360.0;
        }
        hue_degrees
    }

    /// Hue on the 0..180 scale (half degrees).
    pub fn hue_half_degrees(&self) -> Hue {
        self.hue() / 2.0
    }
}

impl From<image::Rgba<u8>> for Pixel {
    fn from(rgba: image::Rgba<u8>) -> Self {
        let [red, green, blue, alpha] = rgba.0;
        Pixel::new(red, green, blue, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_hues() {
        assert_eq!(Pixel::new(255, 0, 0, 255).hue(), 0.0);
        assert_eq!(Pixel::new(0, 255, 0, 255).hue(), 120.0);
        assert_eq!(Pixel::new(0, 0, 255, 255).hue(), 240.0);
        assert_eq!(Pixel::new(0, 0, 255, 255).hue_half_degrees(), 120.0);
    }

    #[test]
    fn magenta_red_wraps_near_360() {
        let hue = Pixel::new(255, 0, 20, 255).hue();
        assert!(hue > 350.0 && hue < 360.0, "hue = {hue}");
    }

    #[test]
    fn gray_is_unsaturated() {
        let gray = Pixel::new(128, 128, 128, 255);
        assert_eq!(gray.saturation_hsv(), 0.0);
        assert_eq!(gray.hue(), 0.0);
        assert_eq!(Pixel::new(0, 0, 0, 255).saturation_hsv(), 0.0);
    }

    #[test]
    fn from_image_rgba() {
        let pixel = Pixel::from(image::Rgba([10u8, 20, 30, 128]));
        assert_eq!((pixel.red, pixel.green, pixel.blue, pixel.alpha), (10, 20, 30, 128));
    }
}
