//! Anchor/Prior generation for Single Shot MultiBox Detectors (SSDs).
//!
//! Only the anchor layout used by MediaPipe's palm detector is supported: every anchor sits at
//! the center of its feature map cell and has a fixed unit size, so networks output box offsets
//! in input pixels relative to the anchor center.

use std::ops::Index;

use crate::image::Resolution;

/// An anchor of an SSD network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    // values range from 0 to 1
    x_center: f32,
    y_center: f32,
}

impl Anchor {
    #[inline]
    pub fn x_center(&self) -> f32 {
        self.x_center
    }

    #[inline]
    pub fn y_center(&self) -> f32 {
        self.y_center
    }

    /// Returns the anchor's center in pixels of a network input with resolution `input`.
    pub fn position(&self, input: Resolution) -> [f32; 2] {
        [
            self.x_center * input.width() as f32,
            self.y_center * input.height() as f32,
        ]
    }
}

/// Describes an output layer of an SSD network.
#[derive(Debug, Clone, Copy)]
pub struct LayerInfo {
    /// Number of anchors per feature map cell. Must be non-zero.
    boxes_per_cell: u32,
    /// Feature map resolution of this layer.
    resolution: Resolution,
}

impl LayerInfo {
    /// Creates a new SSD layer description.
    ///
    /// # Parameters
    ///
    /// - `boxes_per_cell`: the number of boxes associated with each cell in this feature map.
    /// - `width`/`height`: size of this layer's feature map, in output cells.
    pub const fn new(boxes_per_cell: u32, width: u32, height: u32) -> Self {
        assert!(boxes_per_cell != 0);
        Self {
            boxes_per_cell,
            resolution: Resolution::new(width, height),
        }
    }
}

/// The full list of anchors of a network, in output order.
pub struct Anchors {
    anchors: Vec<Anchor>,
}

impl Anchors {
    /// Computes the anchors for a network with the given output layers.
    ///
    /// All boxes of a cell share the cell's center.
    pub fn new(layers: &[LayerInfo]) -> Self {
        let mut anchors = Vec::new();

        for layer in layers {
            let height = layer.resolution.height();
            let width = layer.resolution.width();

            for y in 0..height {
                for x in 0..width {
                    let x_center = (x as f32 + 0.5) / width as f32;
                    let y_center = (y as f32 + 0.5) / height as f32;
                    for _ in 0..layer.boxes_per_cell {
                        anchors.push(Anchor { x_center, y_center });
                    }
                }
            }
        }

        Self { anchors }
    }

    /// Returns the total number of SSD anchors/priors.
    #[inline]
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Anchor> + '_ {
        self.anchors.iter()
    }
}

impl Index<usize> for Anchors {
    type Output = Anchor;

    fn index(&self, index: usize) -> &Anchor {
        &self.anchors[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palm_anchor_layout() {
        let anchors = Anchors::new(&[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)]);
        assert_eq!(anchors.anchor_count(), 2016);

        // Both boxes of the first cell share its center.
        assert_eq!(anchors[0], anchors[1]);
        assert_eq!(anchors[0].x_center(), 0.5 / 24.0);
        assert_eq!(anchors[2].x_center(), 1.5 / 24.0);

        let last = anchors[2015];
        assert_eq!(last.x_center(), 11.5 / 12.0);
        assert_eq!(last.y_center(), 11.5 / 12.0);
        let [x, y] = anchors[1152].position(Resolution::new(192, 192));
        approx::assert_relative_eq!(x, 8.0, epsilon = 1e-4);
        approx::assert_relative_eq!(y, 8.0, epsilon = 1e-4);
    }
}
