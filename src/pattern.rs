//! Pattern Rasterizer: turns a ContourSet into a centered, fixed-size
//! single-channel binary "contour pattern".

use image::{GrayImage, Luma};
use imageproc::drawing::draw_line_segment_mut;

use crate::contour::ContourSet;

/// Fraction of the canvas side the longer contour-set axis is scaled to fit,
/// leaving a quiet border.
const MARGIN: f64 = 0.9;

/// Centered, fixed-size single-channel binary image encoding a [`ContourSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    bitmap: GrayImage,
    side: u32,
    drawn_count: usize,
}

impl Pattern {
    pub fn side(&self) -> u32 {
        self.side
    }

    pub fn bitmap(&self) -> &GrayImage {
        &self.bitmap
    }

    pub fn drawn_count(&self) -> usize {
        self.drawn_count
    }

    pub fn is_drawn(&self, x: u32, y: u32) -> bool {
        self.bitmap.get_pixel(x, y)[0] != 0
    }

    /// Centroid of drawn pixels; `None` for an all-zero pattern. Should be
    /// within ceil(S/2) +/- 1 of (S/2, S/2) for any non-empty pattern —
    /// contours are centered by construction.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.drawn_count == 0 {
            return None;
        }
        let (mut sx, mut sy) = (0.0, 0.0);
        for (x, y, p) in self.bitmap.enumerate_pixels() {
            if p[0] != 0 {
                sx += x as f64;
                sy += y as f64;
            }
        }
        let n = self.drawn_count as f64;
        Some((sx / n, sy / n))
    }

    fn blank(side: u32) -> Self {
        Pattern {
            bitmap: GrayImage::new(side, side),
            side,
            drawn_count: 0,
        }
    }
}

/// Rasterizes `contours` onto an `side` x `side` binary canvas, centered and
/// uniformly scaled to fill it.
pub fn rasterize(contours: &ContourSet, side: u32) -> Pattern {
    let bbox = match contours.bounding_box() {
        Some(bbox) => bbox,
        None => return Pattern::blank(side),
    };

    let (bw, bh) = (bbox.width().max(1) as f64, bbox.height().max(1) as f64);
    let longer = bw.max(bh);
    let scale = if longer > 0.0 {
        (side as f64) * MARGIN / longer
    } else {
        1.0
    };
    let (cx, cy) = bbox.center();
    let half = side as f64 / 2.0;

    let project = |x: i32, y: i32| -> (f32, f32) {
        (
            (((x as f64) - cx) * scale + half) as f32,
            (((y as f64) - cy) * scale + half) as f32,
        )
    };

    let mut bitmap = GrayImage::new(side, side);

    for contour in contours.contours() {
        let points = contour.points();
        if points.is_empty() {
            continue;
        }
        if points.len() == 1 {
            let (x, y) = project(points[0].0, points[0].1);
            draw_line_segment_mut(&mut bitmap, (x, y), (x, y), Luma([255]));
            continue;
        }
        let n = points.len();
        for i in 0..n {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            draw_line_segment_mut(&mut bitmap, project(x1, y1), project(x2, y2), Luma([255]));
        }
    }

    let drawn_count = bitmap.pixels().filter(|p| p[0] != 0).count();

    Pattern {
        bitmap,
        side,
        drawn_count,
    }
}
