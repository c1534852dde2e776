//! Edge & Contour Extractor: turns a raster into a list of polygonal chains.

use imageproc::contours::BorderType;

use crate::raster::Raster;

/// Gaussian smoothing sigma; chosen so the effective kernel radius is >= 2px.
/// `image::imageops::blur` takes a sigma directly rather than a radius.
const SMOOTHING_SIGMA: f32 = 1.6;

/// Minimum contour area as a fraction of the source image area.
const MIN_AREA_FRACTION: f64 = 0.0005;

/// Minimum contour perimeter in pixels.
const MIN_PERIMETER: f64 = 150.0;

/// Axis-aligned bounding box in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) as f64 / 2.0,
            (self.min_y + self.max_y) as f64 / 2.0,
        )
    }

    fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// A closed polyline traced along the boundary of one connected edge component.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn new(points: Vec<(i32, i32)>) -> Self {
        Contour { points }
    }

    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signed polygon area via the shoelace formula; positive for
    /// counter-clockwise point order, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        if self.points.len() < 3 {
            return 0.0;
        }
        let n = self.points.len();
        let mut sum = 0.0;
        for i in 0..n {
            let (x1, y1) = self.points[i];
            let (x2, y2) = self.points[(i + 1) % n];
            sum += (x1 as f64) * (y2 as f64) - (x2 as f64) * (y1 as f64);
        }
        sum / 2.0
    }

    /// Absolute polygon area, derived from the signed shoelace area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Perimeter length, treating the contour as a closed loop.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let n = self.points.len();
        (0..n)
            .map(|i| {
                let (x1, y1) = self.points[i];
                let (x2, y2) = self.points[(i + 1) % n];
                (((x2 - x1).pow(2) + (y2 - y1).pow(2)) as f64).sqrt()
            })
            .sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox {
            min_x: i32::MAX,
            min_y: i32::MAX,
            max_x: i32::MIN,
            max_y: i32::MIN,
        };
        for &(x, y) in &self.points {
            bb.min_x = bb.min_x.min(x);
            bb.min_y = bb.min_y.min(y);
            bb.max_x = bb.max_x.max(x);
            bb.max_y = bb.max_y.max(y);
        }
        bb
    }

    /// Area-weighted polygon centroid, falling back to the arithmetic mean
    /// of points for degenerate (near-zero-area) shapes.
    pub fn centroid(&self) -> (f64, f64) {
        let area6 = self.signed_area() * 6.0;
        if area6.abs() < 1e-9 || self.points.len() < 3 {
            let n = self.points.len().max(1) as f64;
            let (sx, sy) = self
                .points
                .iter()
                .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x as f64, sy + y as f64));
            return (sx / n, sy / n);
        }
        let n = self.points.len();
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let (x1, y1) = self.points[i];
            let (x2, y2) = self.points[(i + 1) % n];
            let cross = (x1 as f64) * (y2 as f64) - (x2 as f64) * (y1 as f64);
            cx += (x1 as f64 + x2 as f64) * cross;
            cy += (y1 as f64 + y2 as f64) * cross;
        }
        (cx / area6, cy / area6)
    }

    /// Circularity = 4*pi*area / perimeter^2; 0 for degenerate contours.
    pub fn circularity(&self) -> f64 {
        let p = self.perimeter();
        if p <= 0.0 {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area() / (p * p)
    }
}

/// All contours extracted from one raster.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourSet {
    contours: Vec<Contour>,
    source_width: u32,
    source_height: u32,
}

impl ContourSet {
    pub fn empty(source_width: u32, source_height: u32) -> Self {
        ContourSet {
            contours: Vec::new(),
            source_width,
            source_height,
        }
    }

    /// Builds a set from already-traced contours. Used internally by
    /// [`extract_contours`] and by other modules' tests that need a
    /// `ContourSet` without running the full extraction pipeline.
    pub(crate) fn from_parts(contours: Vec<Contour>, source_width: u32, source_height: u32) -> Self {
        ContourSet {
            contours,
            source_width,
            source_height,
        }
    }

    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    /// Tight bounding box over every point of every contour. `None` when the
    /// set is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.contours
            .iter()
            .map(Contour::bounding_box)
            .reduce(BoundingBox::union)
    }
}

/// Runs the full extraction pipeline on `raster`: luminance, blur, Canny
/// hysteresis, contour tracing, and area/perimeter filtering. `threshold`
/// (clamped to [0,100]) drives the Canny hysteresis thresholds via
/// [`crate::config::canny_thresholds`].
///
/// An empty result is a legitimate outcome — a featureless image — not an
/// error; the raster itself was already validated by [`Raster::new`].
pub fn extract_contours(raster: &Raster, threshold: u8) -> ContourSet {
    let threshold = threshold.min(100);
    let luma = raster.to_luma();
    let blurred = image::imageops::blur(&luma, SMOOTHING_SIGMA);
    let (low, high) = crate::config::canny_thresholds(threshold);
    let edges = imageproc::edges::canny(&blurred, low, high);

    let raw_contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(&edges);

    let image_area = raster.width() as f64 * raster.height() as f64;
    let min_area = image_area * MIN_AREA_FRACTION;

    let contours: Vec<Contour> = raw_contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| Contour::new(c.points.into_iter().map(|p| (p.x, p.y)).collect()))
        .filter(|c| c.area() >= min_area && c.perimeter() >= MIN_PERIMETER)
        .collect();

    tracing::debug!(
        threshold,
        low,
        high,
        raw = contours.len(),
        "extracted contours"
    );

    ContourSet::from_parts(contours, raster.width(), raster.height())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    fn solid_raster(w: u32, h: u32, color: [u8; 3]) -> Raster {
        Raster::new(RgbImage::from_pixel(w, h, Rgb(color))).unwrap()
    }

    fn rectangle_raster(w: u32, h: u32) -> Raster {
        let mut img = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
        for _ in 0..3 {
            draw_hollow_rect_mut(
                &mut img,
                Rect::at(20, 20).of_size(w - 40, h - 40),
                Rgb([0, 0, 0]),
            );
        }
        Raster::new(img).unwrap()
    }

    #[test]
    fn featureless_image_has_no_contours() {
        let raster = solid_raster(200, 200, [128, 128, 128]);
        let set = extract_contours(&raster, 50);
        assert!(set.is_empty());
    }

    #[test]
    fn rectangle_yields_at_least_one_contour() {
        let raster = rectangle_raster(300, 300);
        let set = extract_contours(&raster, 50);
        assert!(!set.is_empty(), "expected at least one contour");
    }

    #[test]
    fn contour_count_is_non_increasing_in_threshold() {
        let raster = rectangle_raster(300, 300);
        let mut prev_count = extract_contours(&raster, 0).len();
        for t in [25, 50, 75, 100] {
            let count = extract_contours(&raster, t).len();
            assert!(
                count <= prev_count,
                "contour count grew from {prev_count} to {count} at threshold {t}"
            );
            prev_count = count;
        }
    }

    #[test]
    fn shoelace_area_matches_known_square() {
        // A 10x10 axis-aligned square traced counter-clockwise.
        let contour = Contour::new(vec![(0, 0), (0, 10), (10, 10), (10, 0)]);
        assert!((contour.area() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn centroid_of_square_is_its_center() {
        let contour = Contour::new(vec![(0, 0), (0, 10), (10, 10), (10, 0)]);
        let (cx, cy) = contour.centroid();
        assert!((cx - 5.0).abs() < 1e-6);
        assert!((cy - 5.0).abs() < 1e-6);
    }

    #[test]
    fn bounding_box_union_covers_all_points() {
        let set = ContourSet::from_parts(
            vec![
                Contour::new(vec![(0, 0), (0, 5), (5, 5), (5, 0)]),
                Contour::new(vec![(20, 20), (20, 30), (30, 30), (30, 20)]),
            ],
            100,
            100,
        );
        let bb = set.bounding_box().unwrap();
        assert_eq!((bb.min_x, bb.min_y, bb.max_x, bb.max_y), (0, 0, 30, 30));
    }

    #[test]
    fn empty_set_has_no_bounding_box() {
        let set = ContourSet::empty(100, 100);
        assert!(set.bounding_box().is_none());
    }
}
