//! Types for representing image resolutions.

use std::fmt;

use crate::rect::Rect;

/// Resolution (`width x height`) of an image, window, camera, or network input.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// VGA resolution: `640x480`
    ///
    /// This is what most webcams deliver by default.
    pub const RES_VGA: Self = Self {
        width: 640,
        height: 480,
    };

    /// 720p resolution: `1280x720`
    pub const RES_720P: Self = Self {
        width: 1280,
        height: 720,
    };

    /// Creates a new [`Resolution`] of `width x height`.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the width of this [`Resolution`].
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height of this [`Resolution`].
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns a [`Rect`] positioned at `(0, 0)` with the size of `self`.
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0.0, 0.0, self.width as f32, self.height as f32)
    }

    /// Returns the smallest square [`Rect`] that contains the whole image and shares its center.
    ///
    /// Feeding this square to a network with a square input letterboxes (or pillarboxes) the
    /// image instead of distorting it.
    pub fn letterbox_square(&self) -> Rect {
        let size = self.width.max(self.height) as f32;
        let [cx, cy] = self.rect().center();
        Rect::from_center(cx, cy, size, size)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letterbox() {
        let sq = Resolution::RES_VGA.letterbox_square();
        assert_eq!(sq, Rect::from_top_left(0.0, -80.0, 640.0, 640.0));

        let sq = Resolution::new(100, 300).letterbox_square();
        assert_eq!(sq, Rect::from_top_left(-100.0, 0.0, 300.0, 300.0));
    }

    #[test]
    fn display() {
        assert_eq!(Resolution::RES_720P.to_string(), "1280x720");
        assert_eq!(Resolution::RES_VGA.num_pixels(), 307_200);
    }
}
