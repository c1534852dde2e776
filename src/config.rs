//! A single immutable configuration record, passed by value into
//! [`crate::matcher::match_query`]. Unlike the teacher's `Config::from_env`,
//! nothing here reads process-global state — the engine never reaches into
//! the environment or any other global.

use crate::error::{EngineResult, MatchError};

/// Which scoring path the facade runs for each reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The cheaper shape-similarity scorer — matches individual contours
    /// against each other rather than searching a transform grid.
    Individual,
    /// Full holistic search over scale x rotation x translation.
    HolisticFull,
    /// Holistic search restricted to pure translation (scale and rotation
    /// pinned to their identity values).
    HolisticSimple,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::HolisticSimple
    }
}

/// Parameters of the transform grid explored by the holistic matcher.
/// Independent of [`MatchConfig`] so [`crate::transform`] can be exercised
/// without the rest of the facade.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchParams {
    pub min_scale: f64,
    pub max_scale: f64,
    pub scale_steps: usize,
    pub angle_step_deg: f64,
    pub trange: i32,
    pub tstep: i32,
    /// When true, the scale ladder degenerates to {1.0} and the rotation
    /// set to {0deg} — only translation is searched. [`MatchConfig::validate`]
    /// derives the effective value of this flag from `mode` rather than
    /// trusting it directly, since `Mode::HolisticSimple` forces it on
    /// regardless of what is stored here.
    pub simplify: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            min_scale: 0.5,
            max_scale: 2.0,
            scale_steps: 10,
            angle_step_deg: 10.0,
            trange: 50,
            tstep: 10,
            simplify: true,
        }
    }
}

impl SearchParams {
    /// `effective_simplify` is the simplify flag the run will actually use
    /// (derived from `Mode`, not read from `self.simplify`) — the scale and
    /// angle ladders are only ever built from `self.simplify` when
    /// `HolisticFull` forces a real ladder, so that is what must be
    /// validated here, not the free-standing field.
    pub fn validate(&self, effective_simplify: bool) -> EngineResult<()> {
        if !effective_simplify && self.scale_steps < 1 {
            return Err(MatchError::ConfigOutOfRange {
                reason: "scale_steps must be at least 1".into(),
            });
        }
        if self.min_scale <= 0.0 || !self.min_scale.is_finite() {
            return Err(MatchError::ConfigOutOfRange {
                reason: "min_scale must be a positive finite value".into(),
            });
        }
        if self.max_scale < self.min_scale || !self.max_scale.is_finite() {
            return Err(MatchError::ConfigOutOfRange {
                reason: "max_scale must be finite and >= min_scale".into(),
            });
        }
        if !effective_simplify && self.angle_step_deg <= 0.0 {
            return Err(MatchError::ConfigOutOfRange {
                reason: "angle_step_deg must be positive".into(),
            });
        }
        if self.trange < 0 {
            return Err(MatchError::ConfigOutOfRange {
                reason: "trange must be non-negative".into(),
            });
        }
        if self.tstep <= 0 {
            return Err(MatchError::ConfigOutOfRange {
                reason: "tstep must be positive".into(),
            });
        }
        Ok(())
    }
}

/// Top-level configuration for one `match_query` call.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    pub mode: Mode,
    /// Extractor strength knob, 0-100.
    pub threshold: u8,
    /// Pattern side length S. Must be >= 32.
    pub pattern_size: u32,
    pub search: SearchParams,
    /// IoU floor below which a result is flagged "no confident match".
    pub min_score: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            mode: Mode::default(),
            threshold: 50,
            pattern_size: 512,
            search: SearchParams::default(),
            min_score: 0.15,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.pattern_size < 32 {
            return Err(MatchError::ConfigOutOfRange {
                reason: format!(
                    "pattern_size must be at least 32, got {}",
                    self.pattern_size
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(MatchError::ConfigOutOfRange {
                reason: format!("min_score must be in [0,1], got {}", self.min_score),
            });
        }
        // `HolisticSimple` always runs with simplify forced on (see
        // `score_one` in matcher.rs) regardless of `search.simplify`, so
        // validate against that same effective value rather than the raw
        // field — otherwise a `HolisticFull` config with a garbage ladder
        // but `search.simplify: true` would sail through here and panic
        // once the run overrides simplify to false downstream.
        let effective_simplify = matches!(self.mode, Mode::HolisticSimple);
        self.search.validate(effective_simplify)
    }
}

/// Monotone mapping from the extractor's `threshold` knob to Canny's
/// (low, high) hysteresis thresholds. Exposed as a standalone function so
/// it can be re-tuned without touching [`crate::contour`].
pub fn canny_thresholds(threshold: u8) -> (f32, f32) {
    let threshold = threshold as f64;
    let low = (30.0 + (threshold - 50.0) * 1.4).clamp(10.0, 255.0);
    let high = (2.0 * low).clamp(20.0, 255.0);
    (low as f32, high as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn pattern_size_too_small_is_rejected() {
        let mut cfg = MatchConfig::default();
        cfg.pattern_size = 16;
        assert!(matches!(
            cfg.validate(),
            Err(MatchError::ConfigOutOfRange { .. })
        ));
    }

    #[test]
    fn scale_steps_zero_is_rejected_when_not_simplified() {
        let mut cfg = MatchConfig::default();
        cfg.mode = Mode::HolisticFull;
        cfg.search.simplify = false;
        cfg.search.scale_steps = 0;
        assert!(matches!(
            cfg.validate(),
            Err(MatchError::ConfigOutOfRange { .. })
        ));
    }

    #[test]
    fn scale_steps_zero_is_rejected_even_if_search_simplify_field_says_true() {
        // search.simplify is stale/wrong here, but mode is HolisticFull, so
        // the run will actually override simplify to false and build a
        // real scale ladder from scale_steps=0 — validate() must catch
        // that using the effective value, not the raw field.
        let mut cfg = MatchConfig::default();
        cfg.mode = Mode::HolisticFull;
        cfg.search.simplify = true;
        cfg.search.scale_steps = 0;
        assert!(matches!(
            cfg.validate(),
            Err(MatchError::ConfigOutOfRange { .. })
        ));
    }

    #[test]
    fn scale_steps_zero_is_accepted_under_holistic_simple() {
        // HolisticSimple always forces simplify=true at run time, so the
        // scale ladder never reads scale_steps; zero is harmless here.
        let mut cfg = MatchConfig::default();
        cfg.mode = Mode::HolisticSimple;
        cfg.search.scale_steps = 0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn canny_threshold_mapping_is_monotone() {
        let mut prev = canny_thresholds(0);
        for t in 1..=100u8 {
            let cur = canny_thresholds(t);
            assert!(cur.0 >= prev.0, "low threshold must be non-decreasing");
            assert!(cur.1 >= prev.1, "high threshold must be non-decreasing");
            prev = cur;
        }
    }

    #[test]
    fn high_threshold_is_double_low() {
        let (low, high) = canny_thresholds(50);
        assert!((high - 2.0 * low).abs() < 1e-3 || high == 255.0);
    }
}
