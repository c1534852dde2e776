//! Individual-Contour Scorer: a cheaper alternative to the holistic matcher,
//! used as a fallback or optional mode (`Mode::Individual`).

use crate::contour::{Contour, ContourSet};

/// Weight of the moment-invariant term in the combined shape similarity.
const MOMENT_WEIGHT: f64 = 0.6;
const RATIO_WEIGHT: f64 = 0.4;

/// Small value preventing division by zero in ratio comparisons.
const EPS: f64 = 1e-9;

/// Computes the seven Hu moment invariants of a polygon's raw moments,
/// expressed as the spec's "log-absolute, signed-preserving" transform:
/// `sign(I) * log10(|I| + eps)`. This keeps the invariants in a comparable
/// numeric range regardless of polygon scale while preserving which
/// invariants are negative.
fn hu_moments(contour: &Contour) -> [f64; 7] {
    let (cx, cy) = contour.centroid();
    let points = contour.points();
    let n = points.len();

    // Central geometric moments up to order 3, computed by discretized
    // summation over the polygon's vertices (sufficient for shape
    // comparison; this is not pixel-exact image-moment computation).
    let mut mu = [[0.0f64; 4]; 4];
    for &(x, y) in points {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        for p in 0..4 {
            for q in 0..4 {
                if p + q <= 3 {
                    mu[p][q] += dx.powi(p as i32) * dy.powi(q as i32);
                }
            }
        }
    }
    let n_f = n.max(1) as f64;
    for row in mu.iter_mut() {
        for v in row.iter_mut() {
            *v /= n_f;
        }
    }

    let mu00 = n_f; // normalization mass (vertex count, constant across contours of same density)
    let norm = |p: usize, q: usize| -> f64 {
        let gamma = (p + q) as f64 / 2.0 + 1.0;
        mu[p][q] / mu00.powf(gamma)
    };

    let n20 = norm(2, 0);
    let n02 = norm(0, 2);
    let n11 = norm(1, 1);
    let n30 = norm(3, 0);
    let n03 = norm(0, 3);
    let n12 = norm(1, 2);
    let n21 = norm(2, 1);

    let i1 = n20 + n02;
    let i2 = (n20 - n02).powi(2) + 4.0 * n11.powi(2);
    let i3 = (n30 - 3.0 * n12).powi(2) + (3.0 * n21 - n03).powi(2);
    let i4 = (n30 + n12).powi(2) + (n21 + n03).powi(2);
    let i5 = (n30 - 3.0 * n12) * (n30 + n12) * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
        + (3.0 * n21 - n03) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));
    let i6 = (n20 - n02) * ((n30 + n12).powi(2) - (n21 + n03).powi(2))
        + 4.0 * n11 * (n30 + n12) * (n21 + n03);
    let i7 = (3.0 * n21 - n03) * (n30 + n12) * ((n30 + n12).powi(2) - 3.0 * (n21 + n03).powi(2))
        - (n30 - 3.0 * n12) * (n21 + n03) * (3.0 * (n30 + n12).powi(2) - (n21 + n03).powi(2));

    [i1, i2, i3, i4, i5, i6, i7].map(|i| i.signum() * (i.abs() + EPS).log10())
}

/// L1 distance between two moment-invariant vectors, passed through a
/// monotonically decreasing kernel mapping [0, inf) to (0, 1].
fn moment_similarity(a: &Contour, b: &Contour) -> f64 {
    let ha = hu_moments(a);
    let hb = hu_moments(b);
    let l1: f64 = ha.iter().zip(hb.iter()).map(|(x, y)| (x - y).abs()).sum();
    (-l1).exp()
}

/// |a-b| / max(a,b,eps), mapped to [0,1] by `1 - ratio`.
fn ratio_similarity(a: f64, b: f64) -> f64 {
    let denom = a.max(b).max(EPS);
    1.0 - (a - b).abs() / denom
}

/// Combines perimeter, area, and circularity ratios into a single [0,1]
/// similarity, averaged across the three.
fn ratio_bag_similarity(a: &Contour, b: &Contour) -> f64 {
    let perimeter = ratio_similarity(a.perimeter(), b.perimeter());
    let area = ratio_similarity(a.area(), b.area());
    let circularity = ratio_similarity(a.circularity(), b.circularity());
    (perimeter + area + circularity) / 3.0
}

/// Shape similarity s(q, r) in [0,1]: 60% moments, 40% ratio-bag.
fn shape_similarity(q: &Contour, r: &Contour) -> f64 {
    MOMENT_WEIGHT * moment_similarity(q, r) + RATIO_WEIGHT * ratio_bag_similarity(q, r)
}

/// For every query contour, finds the best-matching reference contour and
/// averages the per-contour best similarities, weighted by query contour
/// count (a plain mean, since every query contour carries equal weight).
/// Returns a similarity in [0, 100]. An empty query or reference set yields 0.
pub fn score_individual(query: &ContourSet, reference: &ContourSet) -> f64 {
    if query.is_empty() || reference.is_empty() {
        return 0.0;
    }

    let total: f64 = query
        .contours()
        .iter()
        .map(|q| {
            reference
                .contours()
                .iter()
                .map(|r| shape_similarity(q, r))
                .fold(f64::MIN, f64::max)
        })
        .sum();

    100.0 * total / query.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: i32, offset: i32) -> Contour {
        Contour::new(vec![
            (offset, offset),
            (offset, offset + side),
            (offset + side, offset + side),
            (offset + side, offset),
        ])
    }

    #[test]
    fn identical_contour_sets_score_near_maximum() {
        let set = ContourSet::from_parts(vec![square(80, 0), square(40, 200)], 400, 400);
        let score = score_individual(&set, &set);
        assert!(score > 95.0, "expected near-100 score, got {score}");
    }

    #[test]
    fn empty_query_scores_zero() {
        let empty = ContourSet::empty(100, 100);
        let set = ContourSet::from_parts(vec![square(50, 0)], 100, 100);
        assert_eq!(score_individual(&empty, &set), 0.0);
    }

    #[test]
    fn empty_reference_scores_zero() {
        let empty = ContourSet::empty(100, 100);
        let set = ContourSet::from_parts(vec![square(50, 0)], 100, 100);
        assert_eq!(score_individual(&set, &empty), 0.0);
    }

    #[test]
    fn very_different_shapes_score_lower_than_identical() {
        let squares = ContourSet::from_parts(vec![square(80, 0)], 200, 200);
        let sliver = Contour::new(vec![(0, 0), (0, 400), (2, 400), (2, 0)]);
        let slivers = ContourSet::from_parts(vec![sliver], 200, 400);
        let same_score = score_individual(&squares, &squares);
        let diff_score = score_individual(&squares, &slivers);
        assert!(diff_score < same_score);
    }
}
