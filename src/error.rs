use thiserror::Error;

/// Errors raised by the matching engine and its facade.
///
/// `InvalidRaster` and `ConfigOutOfRange` are fatal: they fail the whole
/// call before any work starts. `TileFetchFailed` is raised by a
/// [`crate::tile::TileProvider`], not the engine itself, but lives in the
/// same enum so callers can match on one error type end to end; the facade
/// turns it into a per-reference `fetch_error` flag rather than aborting
/// the run (see [`crate::matcher`]).
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid raster: {reason}")]
    InvalidRaster { reason: String },

    #[error("configuration out of range: {reason}")]
    ConfigOutOfRange { reason: String },

    #[error("failed to fetch tile for ({lat}, {lon}): {reason}")]
    TileFetchFailed {
        lat: f64,
        lon: f64,
        reason: String,
    },
}

pub type EngineResult<T> = Result<T, MatchError>;
