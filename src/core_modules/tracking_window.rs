// THEORY:
// The `TrackingWindow` is the horizontal gate of the controller. Only markers
// whose centroid falls inside a narrow vertical strip of the frame may sound;
// everything else on screen is scenery.
//
// In fixed mode the strip sits in the middle of the frame. In tracking mode it
// follows the markers with an exponential moving average, so a hand that
// drifts sideways keeps playing while single-frame jitter barely moves the
// strip. When nothing is seen and nothing is sounding, the strip creeps back to
// the center at a much slower rate, recovering from drift without a visible
// snap.
//
// The stored position is the strip's left edge; the strip covers
// [left_x, left_x + width). It is clamped after every update so the strip never
// leaves the frame.

use crate::config::{WindowConfig, WindowMode};

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingWindow {
    mode: WindowMode,
    width: f64,
    alpha: f64,
    idle_relax: f64,
    frame_width: f64,
    left_x: f64,
}

impl TrackingWindow {
    pub fn new(config: &WindowConfig, frame_width: u32) -> Self {
        let mut window = Self {
            mode: config.mode,
            width: config.width,
            alpha: config.alpha,
            idle_relax: config.idle_relax,
            frame_width: frame_width as f64,
            left_x: 0.0,
        };
        window.left_x = window.clamp(window.centered_left());
        window
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn left_x(&self) -> f64 {
        self.left_x
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Whether a centroid at `x` is eligible this frame.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.left_x && x < self.left_x + self.width
    }

    /// Moves the window for this frame and returns the new left edge.
    ///
    /// `chord_active` is whether a chord was sounding after the previous frame;
    /// the idle drift back to center only happens when it was not.
    pub fn update(&mut self, candidate_xs: &[f64], chord_active: bool) -> f64 {
        if self.mode == WindowMode::Fixed {
            return self.left_x;
        }

        let next = if candidate_xs.is_empty() {
            if chord_active {
                self.left_x
            } else {
                let center = self.centered_left();
                self.idle_relax * center + (1.0 - self.idle_relax) * self.left_x
            }
        } else {
            let mean_x = candidate_xs.iter().sum::<f64>() / candidate_xs.len() as f64;
            let target = mean_x - self.width / 2.0;
            self.alpha * target + (1.0 - self.alpha) * self.left_x
        };

        self.left_x = self.clamp(next);
        self.left_x
    }

    /// New frame width: a fixed window re-centers, a tracking one is re-clamped.
    pub fn resize(&mut self, frame_width: u32) {
        self.frame_width = frame_width as f64;
        self.left_x = match self.mode {
            WindowMode::Fixed => self.clamp(self.centered_left()),
            WindowMode::Tracking => self.clamp(self.left_x),
        };
    }

    pub fn reset(&mut self) {
        self.left_x = self.clamp(self.centered_left());
    }

    fn centered_left(&self) -> f64 {
        self.frame_width / 2.0 - self.width / 2.0
    }

    fn clamp(&self, left_x: f64) -> f64 {
        let max_left = (self.frame_width - self.width).max(0.0);
        left_x.clamp(0.0, max_left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracking(frame_width: u32) -> TrackingWindow {
        let config = WindowConfig {
            mode: WindowMode::Tracking,
            ..WindowConfig::default()
        };
        TrackingWindow::new(&config, frame_width)
    }

    #[test]
    fn fixed_window_is_centered_and_never_moves() {
        let mut window = TrackingWindow::new(&WindowConfig::default(), 640);
        assert_eq!(window.left_x(), 310.0);
        window.update(&[10.0, 20.0], false);
        assert_eq!(window.left_x(), 310.0);
        assert!(window.contains(310.0));
        assert!(window.contains(329.9));
        assert!(!window.contains(330.0));
    }

    #[test]
    fn fixed_window_recenters_on_resize() {
        let mut window = TrackingWindow::new(&WindowConfig::default(), 640);
        window.resize(320);
        assert_eq!(window.left_x(), 150.0);
    }

    #[test]
    fn tracking_window_smooths_toward_candidates() {
        let mut window = tracking(640);
        // target = 410 - 10 = 400; 0.1 * 400 + 0.9 * 310 = 319
        let left = window.update(&[400.0, 420.0], false);
        assert!((left - 319.0).abs() < 1e-9);
    }

    #[test]
    fn idle_window_relaxes_slowly_to_center() {
        let mut window = tracking(640);
        for _ in 0..50 {
            window.update(&[600.0], false);
        }
        let drifted = window.left_x();
        let relaxed = window.update(&[], false);
        assert!(relaxed < drifted);
        assert!(drifted - relaxed < 2.0);
    }

    #[test]
    fn idle_window_holds_while_a_chord_sounds() {
        let mut window = tracking(640);
        window.update(&[600.0], false);
        let held = window.left_x();
        assert_eq!(window.update(&[], true), held);
    }

    #[test]
    fn window_is_clamped_to_frame() {
        let mut window = tracking(640);
        for target in [-5000.0, 0.0, 639.0, 5000.0] {
            for _ in 0..200 {
                let left = window.update(&[target], false);
                assert!((0.0..=620.0).contains(&left), "left = {left}");
            }
        }
    }

    #[test]
    fn window_wider_than_frame_pins_to_zero() {
        let config = WindowConfig {
            width: 800.0,
            ..WindowConfig::default()
        };
        let window = TrackingWindow::new(&config, 640);
        assert_eq!(window.left_x(), 0.0);
    }
}
