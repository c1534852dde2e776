//! The satellite-tile collaborator: an interface the facade consumes but
//! does not implement. Fetching real imagery over HTTP is out of scope for
//! this crate — this module only defines the seam and an optional
//! disk-backed caching decorator around it.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{EngineResult, MatchError};
use crate::raster::Raster;

/// A candidate coordinate passed in by a front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateRecord {
    pub lat: f64,
    pub lon: f64,
    pub description: Option<String>,
}

impl CoordinateRecord {
    pub fn validate(&self) -> EngineResult<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(MatchError::InvalidRaster {
                reason: format!("lat {} out of range [-90, 90]", self.lat),
            });
        }
        if !(-180.0..=180.0).contains(&self.lon) {
            return Err(MatchError::InvalidRaster {
                reason: format!("lon {} out of range [-180, 180]", self.lon),
            });
        }
        Ok(())
    }
}

/// Default satellite tile width in meters, chosen so tile ground-sample
/// distance is comparable across candidates with drone imagery captured at
/// ~120m altitude.
pub const DEFAULT_TILE_WIDTH_METERS: f64 = 250.0;

/// External collaborator consumed (not defined) by the facade: turns a
/// coordinate into a raster. Implementations live outside this crate (an
/// HTTP client against a map provider, a local tile cache, a test double).
pub trait TileProvider {
    fn fetch_tile(
        &self,
        lat: f64,
        lon: f64,
        width_meters: f64,
        pixels: u32,
    ) -> EngineResult<Raster>;
}

#[derive(Serialize, Deserialize, Default)]
struct CacheIndex {
    /// cache key -> file name under the cache directory
    entries: HashMap<String, String>,
}

fn cache_key(lat: f64, lon: f64, width_meters: f64, pixels: u32) -> String {
    format!("{lat:.6}_{lon:.6}_{width_meters:.1}_{pixels}")
}

/// Decorates any [`TileProvider`] with an on-disk cache keyed by
/// `(lat, lon, width_m, pixels)`. Mirrors the teacher's JSONL-on-disk
/// logging pattern in `scanner.rs`, adapted to an image cache with a small
/// JSON index.
pub struct CachingTileProvider<P: TileProvider> {
    inner: P,
    cache_dir: PathBuf,
}

impl<P: TileProvider> CachingTileProvider<P> {
    pub fn new(inner: P, cache_dir: impl Into<PathBuf>) -> Self {
        CachingTileProvider {
            inner,
            cache_dir: cache_dir.into(),
        }
    }

    fn index_path(&self) -> PathBuf {
        self.cache_dir.join("index.json")
    }

    fn load_index(&self) -> CacheIndex {
        fs::read_to_string(self.index_path())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn save_index(&self, index: &CacheIndex) -> EngineResult<()> {
        let serialized = serde_json::to_string_pretty(index).map_err(|e| MatchError::InvalidRaster {
            reason: format!("failed to serialize tile cache index: {e}"),
        })?;
        fs::write(self.index_path(), serialized).map_err(|e| MatchError::InvalidRaster {
            reason: format!("failed to write tile cache index: {e}"),
        })
    }
}

impl<P: TileProvider> TileProvider for CachingTileProvider<P> {
    fn fetch_tile(
        &self,
        lat: f64,
        lon: f64,
        width_meters: f64,
        pixels: u32,
    ) -> EngineResult<Raster> {
        let key = cache_key(lat, lon, width_meters, pixels);
        let mut index = self.load_index();

        if let Some(file_name) = index.entries.get(&key) {
            let path = self.cache_dir.join(file_name);
            if let Ok(raster) = Raster::open(&path) {
                tracing::debug!(lat, lon, "tile cache hit");
                return Ok(raster);
            }
            tracing::warn!(lat, lon, "cached tile file missing, refetching");
        }

        let raster = self.inner.fetch_tile(lat, lon, width_meters, pixels)?;

        if fs::create_dir_all(&self.cache_dir).is_ok() {
            let file_name = format!("{key}.png");
            let path = self.cache_dir.join(&file_name);
            if raster.as_rgb8().save(&path).is_ok() {
                index.entries.insert(key, file_name);
                if let Err(e) = self.save_index(&index) {
                    tracing::warn!(error = %e, "failed to persist tile cache index");
                }
            }
        }

        Ok(raster)
    }
}

/// A provider with no imagery, useful for tests and as a placeholder until a
/// real collaborator (e.g. an HTTP client against a map provider) is wired in.
pub struct NullTileProvider;

impl TileProvider for NullTileProvider {
    fn fetch_tile(&self, lat: f64, lon: f64, _width_meters: f64, _pixels: u32) -> EngineResult<Raster> {
        Err(MatchError::TileFetchFailed {
            lat,
            lon,
            reason: "no tile provider configured".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_coordinate_passes() {
        let record = CoordinateRecord {
            lat: 37.7,
            lon: -122.4,
            description: None,
        };
        assert!(record.validate().is_ok());
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let record = CoordinateRecord {
            lat: 120.0,
            lon: 0.0,
            description: None,
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn out_of_range_longitude_is_rejected() {
        let record = CoordinateRecord {
            lat: 0.0,
            lon: -200.0,
            description: None,
        };
        assert!(record.validate().is_err());
    }

    #[test]
    fn null_provider_reports_fetch_failure() {
        let provider = NullTileProvider;
        let err = provider.fetch_tile(1.0, 2.0, 250.0, 512).unwrap_err();
        assert!(matches!(err, MatchError::TileFetchFailed { .. }));
    }

    #[test]
    fn caching_provider_hits_cache_on_second_call() {
        use image::{Rgb, RgbImage};
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingProvider {
            calls: AtomicUsize,
        }
        impl TileProvider for CountingProvider {
            fn fetch_tile(&self, _lat: f64, _lon: f64, _w: f64, _p: u32) -> EngineResult<Raster> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Raster::new(RgbImage::from_pixel(16, 16, Rgb([1, 2, 3])))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let provider = CachingTileProvider::new(
            CountingProvider {
                calls: AtomicUsize::new(0),
            },
            dir.path(),
        );

        let _ = provider.fetch_tile(1.0, 2.0, 250.0, 16).unwrap();
        let _ = provider.fetch_tile(1.0, 2.0, 250.0, 16).unwrap();

        assert_eq!(provider.inner.calls.load(Ordering::SeqCst), 1);
    }
}
