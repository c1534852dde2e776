//! Matcher Facade: given one query raster and N reference rasters, runs
//! extraction, rasterization, and scoring for each pair and returns a
//! ranked list of results.

use crate::config::{MatchConfig, Mode};
use crate::contour::{self, ContourSet};
use crate::error::{EngineResult, MatchError};
use crate::pattern::{self, Pattern};
use crate::raster::Raster;
use crate::scorer;
use crate::transform::{self, AbortHook, Transform};

/// Outcome of matching one query to one reference.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub transform: Transform,
    /// IoU in [0,1]. For `Mode::Individual`, this is a degenerate
    /// reinterpretation of the individual-contour score divided by 100, so
    /// every mode shares the same internal scale.
    pub iou: f64,
    /// `100 * iou`, the scale exposed to callers.
    pub score: f64,
    /// Set when the reference's `ContourSet` was empty.
    pub reference_featureless: bool,
    /// Set when this reference was omitted from scoring due to an upstream
    /// tile-fetch failure. The facade itself never raises this; it is here
    /// so a caller that plugs in a [`crate::tile::TileProvider`] can thread
    /// the flag through uniformly.
    pub fetch_error: bool,
    /// True when `score` is below `MatchConfig::min_score`.
    pub low_confidence: bool,
}

impl MatchResult {
    fn from_iou(transform: Transform, iou: f64, reference_featureless: bool, min_score: f64) -> Self {
        MatchResult {
            transform,
            iou,
            score: 100.0 * iou,
            reference_featureless,
            fetch_error: false,
            low_confidence: iou < min_score,
        }
    }

    fn fetch_failed() -> Self {
        MatchResult {
            transform: Transform::identity(),
            iou: 0.0,
            score: 0.0,
            reference_featureless: false,
            fetch_error: true,
            low_confidence: true,
        }
    }
}

/// One entry of a [`RankedMatches`] list.
#[derive(Debug, Clone, PartialEq)]
pub struct PerReference {
    pub index: usize,
    pub result: MatchResult,
}

/// Outcome of matching one query to N references.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatches {
    /// Index into the original `references` slice of the best-scoring entry.
    /// Always `Some` unless every reference was omitted by a fetch error.
    pub best_index: Option<usize>,
    pub best_score: f64,
    /// Set when the query's own `ContourSet` was empty; every reference
    /// then scores 0 and `best_index` is documented as `Some(0)` when there
    /// is at least one reference.
    pub query_featureless: bool,
    /// Sorted by `result.score` descending.
    pub per_reference: Vec<PerReference>,
}

/// Optional knobs that do not belong in the serializable [`MatchConfig`] —
/// a cooperative abort hook the caller can poll from another thread.
#[derive(Default)]
pub struct RunOptions {
    pub abort: Option<AbortHook>,
}

/// Runs the full facade procedure: extract and rasterize the query once,
/// then for each reference extract, rasterize, and score against the
/// cached query pattern, returning a ranked list.
///
/// Fatal: an invalid `query` raster, or `config` failing
/// [`MatchConfig::validate`]. Both are checked before any reference is
/// touched. Per-reference degradation (an empty or omitted reference)
/// never fails the call — it is recorded on that reference's
/// [`MatchResult`] instead.
pub fn match_query(
    query: &Raster,
    references: &[Raster],
    config: &MatchConfig,
) -> EngineResult<RankedMatches> {
    match_query_with_options(query, references, config, &RunOptions::default())
}

pub fn match_query_with_options(
    query: &Raster,
    references: &[Raster],
    config: &MatchConfig,
    options: &RunOptions,
) -> EngineResult<RankedMatches> {
    config.validate()?;

    let query_contours = contour::extract_contours(query, config.threshold);
    let query_featureless = query_contours.is_empty();
    let query_pattern = pattern::rasterize(&query_contours, config.pattern_size);

    tracing::info!(
        references = references.len(),
        query_contours = query_contours.len(),
        query_featureless,
        mode = ?config.mode,
        "starting match run"
    );

    let mut per_reference: Vec<PerReference> = Vec::with_capacity(references.len());

    for (index, reference_raster) in references.iter().enumerate() {
        let reference_contours = contour::extract_contours(reference_raster, config.threshold);
        let reference_featureless = reference_contours.is_empty();

        let result = score_one(
            &query_contours,
            &query_pattern,
            &reference_contours,
            config,
            options,
        );
        let result = MatchResult {
            reference_featureless,
            ..result
        };

        if reference_featureless {
            tracing::debug!(index, "reference produced an empty contour set");
        }

        per_reference.push(PerReference { index, result });
    }

    per_reference.sort_by(|a, b| {
        b.result
            .score
            .partial_cmp(&a.result.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let best_index = if per_reference.is_empty() {
        None
    } else if query_featureless {
        Some(0)
    } else {
        per_reference.first().map(|r| r.index)
    };
    let best_score = per_reference.first().map(|r| r.result.score).unwrap_or(0.0);

    Ok(RankedMatches {
        best_index,
        best_score,
        query_featureless,
        per_reference,
    })
}

fn score_one(
    query_contours: &ContourSet,
    query_pattern: &Pattern,
    reference_contours: &ContourSet,
    config: &MatchConfig,
    options: &RunOptions,
) -> MatchResult {
    match config.mode {
        Mode::Individual => {
            let score = scorer::score_individual(query_contours, reference_contours);
            MatchResult::from_iou(Transform::identity(), score / 100.0, false, config.min_score)
        }
        Mode::HolisticFull | Mode::HolisticSimple => {
            let mut params = config.search.clone();
            params.simplify = matches!(config.mode, Mode::HolisticSimple);
            let reference_pattern = pattern::rasterize(reference_contours, config.pattern_size);
            let (transform, iou) = transform::search_best_transform(
                query_pattern,
                &reference_pattern,
                &params,
                options.abort.as_ref(),
            );
            MatchResult::from_iou(transform, iou, false, config.min_score)
        }
    }
}

/// Never returns an error of its own; always produces a `fetch_error`-flagged
/// [`PerReference`] entry so the run can continue past a tile-fetch failure.
pub fn failed_reference(index: usize) -> PerReference {
    PerReference {
        index,
        result: MatchResult::fetch_failed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_hollow_rect_mut;
    use imageproc::rect::Rect;

    fn solid_raster(color: [u8; 3]) -> Raster {
        Raster::new(RgbImage::from_pixel(200, 200, Rgb(color))).unwrap()
    }

    fn rectangle_raster(offset: i32) -> Raster {
        let mut img = RgbImage::from_pixel(240, 240, Rgb([255, 255, 255]));
        let x = (40 + offset).max(0) as u32;
        draw_hollow_rect_mut(&mut img, Rect::at(x as i32, 40).of_size(100, 100), Rgb([0, 0, 0]));
        draw_hollow_rect_mut(&mut img, Rect::at(x as i32 + 1, 41).of_size(98, 98), Rgb([0, 0, 0]));
        Raster::new(img).unwrap()
    }

    #[test]
    fn same_image_scores_100_in_simplified_mode() {
        let reference = rectangle_raster(0);
        let config = MatchConfig::default();
        let result = match_query(&reference, &[reference.clone()], &config).unwrap();
        assert_eq!(result.best_index, Some(0));
        assert!(result.best_score > 99.0, "got {}", result.best_score);
    }

    #[test]
    fn featureless_query_scores_zero_everywhere() {
        let query = solid_raster([128, 128, 128]);
        let reference = rectangle_raster(0);
        let config = MatchConfig::default();
        let result = match_query(&query, &[reference], &config).unwrap();
        assert!(result.query_featureless);
        assert_eq!(result.best_index, Some(0));
        assert_eq!(result.per_reference[0].result.score, 0.0);
    }

    #[test]
    fn featureless_reference_is_flagged_but_run_continues() {
        let query = rectangle_raster(0);
        let blank = solid_raster([10, 10, 10]);
        let good = rectangle_raster(0);
        let config = MatchConfig::default();
        let result = match_query(&query, &[blank, good], &config).unwrap();
        assert!(result.per_reference.iter().any(|r| r.result.reference_featureless));
        assert_eq!(result.best_index, Some(1));
    }

    #[test]
    fn invalid_config_fails_before_any_reference_is_touched() {
        let mut config = MatchConfig::default();
        config.pattern_size = 4;
        let query = rectangle_raster(0);
        let err = match_query(&query, &[], &config).unwrap_err();
        assert!(matches!(err, MatchError::ConfigOutOfRange { .. }));
    }

    #[test]
    fn three_way_ranking_prefers_the_true_match() {
        let query = rectangle_raster(0);
        let distractor_a = solid_raster([200, 50, 50]);
        let distractor_b = solid_raster([50, 200, 50]);
        let true_match = rectangle_raster(0);
        let config = MatchConfig::default();
        let result = match_query(
            &query,
            &[distractor_a, distractor_b, true_match],
            &config,
        )
        .unwrap();
        assert_eq!(result.best_index, Some(2));
    }
}
