use std::{collections::HashMap, fmt, str::FromStr};

use gdal::{Dataset, Metadata as GdalMetadata};
use geo::AffineTransform;

use crate::{
    errors::Result,
    transform::affine_from_gdal,
};

/// Band storage order of a written raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interleave {
    #[default]
    Band,
    Pixel,
}

impl fmt::Display for Interleave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interleave::Band => write!(f, "BAND"),
            Interleave::Pixel => write!(f, "PIXEL"),
        }
    }
}

impl FromStr for Interleave {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BAND" => Ok(Interleave::Band),
            "PIXEL" => Ok(Interleave::Pixel),
            other => Err(format!("unknown interleave: {other}")),
        }
    }
}

/// Metadata record describing how to encode a raster: dimensions,
/// georeferencing, and encoder settings.
///
/// No validation happens at construction. A profile missing something the
/// encoder needs surfaces as the encoder's own error at write time.
#[derive(Debug, Clone, PartialEq)]
pub struct GeotiffProfile {
    pub width: usize,
    pub height: usize,
    pub nodata: Option<f64>,
    pub transform: AffineTransform,
    pub driver: String,
    pub dtype: String,
    pub count: usize,
    pub crs: String,
    pub tiled: bool,
    pub interleave: Interleave,
    pub compress: String,
    /// Extra encoder creation options, passed through as `KEY=VALUE`.
    pub extra: HashMap<String, String>,
}

impl GeotiffProfile {
    /// Profile with the default encoding: single band of `Float32`,
    /// `EPSG:4326`, nodata `-9999.0`, tiled, deflate-compressed GTiff.
    pub fn new(width: usize, height: usize, transform: AffineTransform) -> Self {
        Self {
            width,
            height,
            nodata: Some(-9999.0),
            transform,
            driver: "GTiff".to_string(),
            dtype: "Float32".to_string(),
            count: 1,
            crs: "EPSG:4326".to_string(),
            tiled: true,
            interleave: Interleave::Band,
            compress: "DEFLATE".to_string(),
            extra: HashMap::new(),
        }
    }

    /// Same as [`GeotiffProfile::new`] with the nodata sentinel up front.
    /// Call sites that set nodata per raster read better this way.
    pub fn with_nodata(
        width: usize,
        height: usize,
        nodata: f64,
        transform: AffineTransform,
    ) -> Self {
        let mut profile = Self::new(width, height, transform);
        profile.nodata = Some(nodata);
        profile
    }

    pub fn dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = dtype.into();
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn crs(mut self, crs: impl Into<String>) -> Self {
        self.crs = crs.into();
        self
    }

    pub fn tiled(mut self, tiled: bool) -> Self {
        self.tiled = tiled;
        self
    }

    pub fn interleave(mut self, interleave: Interleave) -> Self {
        self.interleave = interleave;
        self
    }

    pub fn compress(mut self, compress: impl Into<String>) -> Self {
        self.compress = compress.into();
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Render the encoder creation options for this profile.
    pub(crate) fn creation_options(&self) -> Vec<String> {
        let mut options = vec![
            format!("TILED={}", if self.tiled { "YES" } else { "NO" }),
            format!("INTERLEAVE={}", self.interleave),
            format!("COMPRESS={}", self.compress),
        ];
        options.extend(self.extra.iter().map(|(key, value)| format!("{key}={value}")));
        options
    }

    /// Extract the profile embedded in an open dataset.
    ///
    /// The CRS is reported as `AUTHORITY:CODE` when the file carries one,
    /// falling back to the raw projection definition. Tiling is inferred
    /// from the block layout (strips span the full raster width).
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let (width, height) = dataset.raster_size();
        let count = dataset.raster_count();
        let transform = affine_from_gdal(dataset.geo_transform()?);

        let crs = dataset
            .spatial_ref()
            .ok()
            .and_then(|sr| match (sr.auth_name(), sr.auth_code()) {
                (Some(name), Ok(code)) => Some(format!("{name}:{code}")),
                _ => None,
            })
            .unwrap_or_else(|| dataset.projection());

        let (dtype, nodata, tiled) = if count > 0 {
            let band = dataset.rasterband(1)?;
            let (block_width, _) = band.block_size();
            (
                format!("{}", band.band_type()),
                band.no_data_value(),
                block_width != width,
            )
        } else {
            ("Float32".to_string(), None, false)
        };

        let interleave = dataset
            .metadata_item("INTERLEAVE", "IMAGE_STRUCTURE")
            .and_then(|value| value.parse().ok())
            .unwrap_or_default();
        let compress = dataset
            .metadata_item("COMPRESSION", "IMAGE_STRUCTURE")
            .unwrap_or_else(|| "NONE".to_string());

        Ok(Self {
            width,
            height,
            nodata,
            transform,
            driver: dataset.driver().short_name(),
            dtype,
            count,
            crs,
            tiled,
            interleave,
            compress,
            extra: HashMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::create_transform;
    use rstest::rstest;

    #[rstest]
    fn defaults() {
        let profile = GeotiffProfile::new(100, 50, create_transform(10.0, 50.0, 0.1));
        assert_eq!(profile.width, 100);
        assert_eq!(profile.height, 50);
        assert_eq!(profile.nodata, Some(-9999.0));
        assert_eq!(profile.driver, "GTiff");
        assert_eq!(profile.dtype, "Float32");
        assert_eq!(profile.count, 1);
        assert_eq!(profile.crs, "EPSG:4326");
        assert!(profile.tiled);
        assert_eq!(profile.interleave, Interleave::Band);
        assert_eq!(profile.compress, "DEFLATE");
        assert!(profile.extra.is_empty());
    }

    #[rstest]
    fn nodata_first_ordering() {
        let transform = create_transform(10.0, 50.0, 0.1);
        let profile = GeotiffProfile::with_nodata(100, 50, -1.0, transform);
        assert_eq!(profile.nodata, Some(-1.0));
        assert_eq!(
            GeotiffProfile::new(100, 50, transform),
            GeotiffProfile {
                nodata: Some(-9999.0),
                ..profile
            }
        );
    }

    #[rstest]
    fn creation_options_render() {
        let profile = GeotiffProfile::new(8, 8, create_transform(0.0, 0.0, 1.0))
            .interleave(Interleave::Pixel)
            .extra("BLOCKXSIZE", "512");
        let options = profile.creation_options();
        assert!(options.contains(&"TILED=YES".to_string()));
        assert!(options.contains(&"INTERLEAVE=PIXEL".to_string()));
        assert!(options.contains(&"COMPRESS=DEFLATE".to_string()));
        assert!(options.contains(&"BLOCKXSIZE=512".to_string()));
    }

    #[rstest]
    #[case("band", Interleave::Band)]
    #[case("PIXEL", Interleave::Pixel)]
    fn interleave_parse(#[case] input: &str, #[case] expected: Interleave) {
        assert_eq!(input.parse::<Interleave>().unwrap(), expected);
    }
}
