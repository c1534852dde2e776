//! `Raster`: an 8-bit RGB image in memory, immutable once built.

use image::{DynamicImage, RgbImage};

use crate::error::{EngineResult, MatchError};

/// An 8-bit RGB image in memory. Constructed on load, read-only thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    image: RgbImage,
}

impl Raster {
    /// Wraps an already-decoded RGB buffer, rejecting zero-sized input.
    pub fn new(image: RgbImage) -> EngineResult<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(MatchError::InvalidRaster {
                reason: "raster has zero width or height".into(),
            });
        }
        Ok(Raster { image })
    }

    /// Converts a decoded [`DynamicImage`] (any color type) to an 8-bit RGB raster.
    pub fn from_dynamic(image: DynamicImage) -> EngineResult<Self> {
        Self::new(image.to_rgb8())
    }

    /// Decodes an image file from disk. The CLI front end uses this;
    /// the engine itself never touches the filesystem.
    pub fn open(path: &std::path::Path) -> EngineResult<Self> {
        let image = image::open(path).map_err(|e| MatchError::InvalidRaster {
            reason: format!("failed to open {}: {e}", path.display()),
        })?;
        Self::from_dynamic(image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgb8(&self) -> &RgbImage {
        &self.image
    }

    /// Rec. 601 luminance conversion.
    pub fn to_luma(&self) -> image::GrayImage {
        DynamicImage::ImageRgb8(self.image.clone()).to_luma8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_raster_is_invalid() {
        let img = RgbImage::new(0, 10);
        assert!(matches!(
            Raster::new(img),
            Err(MatchError::InvalidRaster { .. })
        ));
    }

    #[test]
    fn well_formed_raster_reports_dimensions() {
        let img = RgbImage::new(40, 30);
        let raster = Raster::new(img).unwrap();
        assert_eq!(raster.width(), 40);
        assert_eq!(raster.height(), 30);
    }

    #[test]
    fn luma_conversion_preserves_dimensions() {
        let img = RgbImage::from_pixel(12, 8, image::Rgb([10, 200, 50]));
        let raster = Raster::new(img).unwrap();
        let gray = raster.to_luma();
        assert_eq!((gray.width(), gray.height()), (12, 8));
    }
}
