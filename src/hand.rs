//! Hand detection and landmark estimation networks.
//!
//! Hands are found in two stages: the palm detector ([`detection`]) locates palms in the whole
//! frame, and each palm is turned into a rotated region of interest (ROI) that the landmark
//! network ([`landmark`]) estimates the 21 hand landmarks in. Landmarks of the previous frame can
//! also be turned into the next frame's ROI, which allows skipping palm detection while tracking.

pub mod detection;
pub mod landmark;

use std::f32::consts::PI;

use nalgebra::{Rotation2, Vector2};

use crate::rect::{Rect, RotatedRect};

/// Computes the clockwise rotation that turns an upright hand into one pointing from `wrist` to
/// `fingers`.
///
/// A rotation of 0 means that fingers point upwards. The result is normalized to `-π..=π`.
fn hand_rotation(wrist: [f32; 2], fingers: [f32; 2]) -> f32 {
    let [dx, dy] = [fingers[0] - wrist[0], fingers[1] - wrist[1]];
    normalize_radians(dx.atan2(-dy))
}

fn normalize_radians(angle: f32) -> f32 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

/// Moves `roi` along its own "up" axis by `shift_y` times its height (negative values move it
/// towards the fingers), then makes it square on its longer side and scales it by `scale`.
fn expand_roi(roi: RotatedRect, shift_y: f32, scale: f32) -> RotatedRect {
    let rect = roi.rect();
    let shift = Rotation2::new(roi.rotation_radians()) * Vector2::new(0.0, rect.height() * shift_y);
    let [cx, cy] = rect.center();
    let size = rect.width().max(rect.height()) * scale;

    RotatedRect::new(
        Rect::from_center(cx + shift.x, cy + shift.y, size, size),
        roi.rotation_radians(),
    )
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn rotation() {
        assert_relative_eq!(hand_rotation([0.0, 0.0], [0.0, -1.0]), 0.0);
        assert_relative_eq!(hand_rotation([0.0, 0.0], [1.0, 0.0]), FRAC_PI_2);
        assert_relative_eq!(hand_rotation([0.0, 0.0], [-1.0, 0.0]), -FRAC_PI_2);
        assert_relative_eq!(hand_rotation([0.0, 0.0], [0.0, 1.0]).abs(), PI);
        assert_relative_eq!(normalize_radians(3.0 * PI / 2.0), -FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn expand_upright() {
        let roi = RotatedRect::from(Rect::from_center(100.0, 100.0, 40.0, 20.0));
        let out = expand_roi(roi, -0.5, 2.0);
        assert_eq!(out.center(), [100.0, 90.0]);
        assert_eq!(out.rect().width(), 80.0);
        assert_eq!(out.rect().height(), 80.0);
    }

    #[test]
    fn expand_rotated() {
        // Pointing right: "up" is +X.
        let roi = RotatedRect::new(Rect::from_center(100.0, 100.0, 20.0, 20.0), FRAC_PI_2);
        let out = expand_roi(roi, -0.5, 1.0);
        assert_relative_eq!(out.center()[0], 110.0, epsilon = 1e-4);
        assert_relative_eq!(out.center()[1], 100.0, epsilon = 1e-4);
        assert_eq!(out.rotation_radians(), FRAC_PI_2);
    }
}
