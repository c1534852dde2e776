//! Contour-based holistic matching engine for localizing an aerial photo
//! against a set of candidate satellite tiles.
//!
//! The pipeline is four stages, each depending only on its predecessors:
//! extraction ([`contour`]), rasterization ([`pattern`]), transform search
//! ([`transform`]), and the facade that ties them together ([`matcher`]).
//! [`scorer`] is the cheaper individual-contour alternative the facade can
//! run instead (`Mode::Individual` in [`config`]).
//!
//! The engine is synchronous and CPU-bound; it touches no filesystem or
//! network I/O itself. [`raster::Raster::open`] and [`tile`]'s
//! `TileProvider` are the only seams that do, and both are thin: decoding a
//! file, or an interface a caller implements against a real map provider.

pub mod config;
pub mod contour;
pub mod error;
pub mod matcher;
pub mod pattern;
pub mod raster;
pub mod scorer;
pub mod tile;
pub mod transform;

pub use config::{MatchConfig, Mode, SearchParams};
pub use error::{EngineResult, MatchError};
pub use matcher::{match_query, match_query_with_options, MatchResult, PerReference, RankedMatches, RunOptions};
pub use raster::Raster;
