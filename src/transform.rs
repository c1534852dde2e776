//! Transform Search / Holistic Matcher: explores a discrete grid of
//! (scale, rotation, translation) transforms of the query pattern to
//! maximize IoU against the reference pattern.

use std::sync::Arc;

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};

use crate::config::SearchParams;
use crate::pattern::Pattern;

/// A 2D similarity transform applied to the query pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    /// Rotation in degrees, in [0, 360).
    pub theta_deg: f64,
    pub tx: i32,
    pub ty: i32,
}

impl Transform {
    pub fn identity() -> Self {
        Transform {
            scale: 1.0,
            theta_deg: 0.0,
            tx: 0,
            ty: 0,
        }
    }

    /// Tie-break key: scale-closest-to-1 first, then smaller angular
    /// distance to 0, then smaller |tx|, then smaller |ty|.
    fn tie_break_key(&self) -> (u64, u64, i32, i32) {
        let scale_dev = ((self.scale - 1.0).abs() * 1e6) as u64;
        let angular = self.theta_deg.rem_euclid(360.0);
        let angular_dist = angular.min(360.0 - angular);
        let angle_dev = (angular_dist * 1e6) as u64;
        (scale_dev, angle_dev, self.tx.abs(), self.ty.abs())
    }
}

/// A cooperative "should I stop" hook, polled between (scale, rotation)
/// tiles. Absent a hook, search runs to completion.
pub type AbortHook = Arc<dyn Fn() -> bool + Send + Sync>;

fn scale_ladder(params: &SearchParams) -> Vec<f64> {
    if params.simplify {
        return vec![1.0];
    }
    if params.scale_steps == 1 {
        return vec![params.min_scale];
    }
    let step = (params.max_scale - params.min_scale) / (params.scale_steps - 1) as f64;
    (0..params.scale_steps)
        .map(|i| params.min_scale + step * i as f64)
        .collect()
}

fn angle_ladder(params: &SearchParams) -> Vec<f64> {
    if params.simplify {
        return vec![0.0];
    }
    let mut angles = Vec::new();
    let mut a = 0.0;
    while a < 360.0 {
        angles.push(a);
        a += params.angle_step_deg;
    }
    if angles.is_empty() {
        angles.push(0.0);
    }
    angles
}

fn translation_ladder(params: &SearchParams) -> Vec<i32> {
    let mut ts = Vec::new();
    let mut t = -params.trange;
    while t <= params.trange {
        ts.push(t);
        t += params.tstep;
    }
    if ts.is_empty() {
        ts.push(0);
    }
    ts
}

/// Rotates and scales `pattern` about its own center, producing an
/// S x S bitmap with out-of-bounds pre-images filled with 0. This is the
/// expensive step, hoisted out of the translation loop per (scale, theta)
/// pair — translation is cheap, rotating and scaling is not.
fn warp_pattern(pattern: &Pattern, scale: f64, theta_deg: f64) -> GrayImage {
    let side = pattern.side() as f32;
    let half = side / 2.0;
    let theta_rad = theta_deg.to_radians() as f32;

    let to_origin = Projection::translate(-half, -half);
    let scale_rotate = Projection::scale(scale as f32, scale as f32) * Projection::rotate(theta_rad);
    let back = Projection::translate(half, half);
    let projection = back * scale_rotate * to_origin;

    warp(
        pattern.bitmap(),
        &projection,
        Interpolation::Nearest,
        Luma([0u8]),
    )
}

/// Scores a translated `warped` bitmap against `reference` without
/// materializing the shifted copy: IoU(shift(warped, tx, ty), reference).
fn score_shifted(warped: &GrayImage, reference: &GrayImage, tx: i32, ty: i32) -> f64 {
    let side = warped.width() as i32;
    let mut intersection: u64 = 0;
    let mut union: u64 = 0;

    for ry in 0..side {
        let qy = ry - ty;
        let qy_in_range = qy >= 0 && qy < side;
        for rx in 0..side {
            let rp = reference.get_pixel(rx as u32, ry as u32)[0] != 0;
            let qp = if qy_in_range {
                let qx = rx - tx;
                qx >= 0 && qx < side && warped.get_pixel(qx as u32, qy as u32)[0] != 0
            } else {
                false
            };
            if qp && rp {
                intersection += 1;
            }
            if qp || rp {
                union += 1;
            }
        }
    }

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// IoU threshold above which search stops early — an effectively exact match.
const EARLY_EXIT_IOU: f64 = 0.999;

/// Searches the transform grid, returning the best [`Transform`] found and
/// the IoU it achieves. Either pattern entirely zero yields
/// `(Transform::identity(), 0.0)`.
pub fn search_best_transform(
    query: &Pattern,
    reference: &Pattern,
    params: &SearchParams,
    abort: Option<&AbortHook>,
) -> (Transform, f64) {
    if query.drawn_count() == 0 || reference.drawn_count() == 0 {
        return (Transform::identity(), 0.0);
    }

    let scales = scale_ladder(params);
    let angles = angle_ladder(params);
    let translations = translation_ladder(params);

    let tiles: Vec<(f64, f64)> = scales
        .iter()
        .flat_map(|&s| angles.iter().map(move |&a| (s, a)))
        .collect();

    #[cfg(feature = "parallel")]
    let tile_results: Vec<Option<(Transform, f64)>> = {
        use rayon::prelude::*;
        tiles
            .par_iter()
            .map(|&(s, a)| best_in_tile(query, reference, s, a, &translations, abort))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let tile_results: Vec<Option<(Transform, f64)>> = tiles
        .iter()
        .map(|&(s, a)| best_in_tile(query, reference, s, a, &translations, abort))
        .collect();

    let mut best: Option<(Transform, f64)> = None;
    for candidate in tile_results.into_iter().flatten() {
        best = Some(pick_better(best, candidate));
    }

    best.unwrap_or((Transform::identity(), 0.0))
}

/// Evaluates every translation for one hoisted (scale, theta) tile.
fn best_in_tile(
    query: &Pattern,
    reference: &Pattern,
    scale: f64,
    theta_deg: f64,
    translations: &[i32],
    abort: Option<&AbortHook>,
) -> Option<(Transform, f64)> {
    if let Some(hook) = abort {
        if hook() {
            return None;
        }
    }

    let warped = warp_pattern(query, scale, theta_deg);
    let mut best: Option<(Transform, f64)> = None;

    'outer: for &tx in translations {
        for &ty in translations {
            let iou = score_shifted(&warped, reference.bitmap(), tx, ty);
            let candidate = (
                Transform {
                    scale,
                    theta_deg,
                    tx,
                    ty,
                },
                iou,
            );
            best = Some(match best {
                None => candidate,
                Some(current) => pick_better(Some(current), candidate),
            });
            if iou >= EARLY_EXIT_IOU {
                break 'outer;
            }
        }
    }
    best
}

/// Deterministic tie-breaking: strictly higher score wins; equal scores
/// fall back to the tie-break key (smaller is better).
fn pick_better(
    current: Option<(Transform, f64)>,
    candidate: (Transform, f64),
) -> (Transform, f64) {
    match current {
        None => candidate,
        Some(cur) => {
            if candidate.1 > cur.1 {
                candidate
            } else if candidate.1 < cur.1 {
                cur
            } else if candidate.0.tie_break_key() < cur.0.tie_break_key() {
                candidate
            } else {
                cur
            }
        }
    }
}
