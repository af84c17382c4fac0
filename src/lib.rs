//! Thin facade over GDAL for GeoTIFF I/O with [`ndarray`] as the pixel
//! currency.
//!
//! Three things live here:
//! - profile and geotransform construction ([`GeotiffProfile`],
//!   [`create_transform`]),
//! - eager read/write ([`read_geotiff`], [`save_geotiff`], and the
//!   Cloud-Optimized variant [`save_cog`] with its overview pyramid),
//! - a lazy, clippable handle ([`LazyRaster`]) that reads metadata up
//!   front and pixels only on demand.
//!
//! Every operation opens exactly one dataset handle and releases it
//! before returning. Codec errors from GDAL propagate unchanged.

mod errors;
mod lazy;
mod profile;
mod reader;
mod transform;
mod writer;

pub use errors::{RastioError, Result};
pub use lazy::{read_geotiff_lazy, read_geotiff_lazy_and_clip, LazyRaster};
pub use profile::{GeotiffProfile, Interleave};
pub use reader::{read_geotiff, read_geotiff_with_profile};
pub use transform::create_transform;
pub use writer::{save_cog, save_geotiff};

use std::fmt::Debug;

use gdal::raster::GdalType;
use num_traits::Zero;

/// Pixel element types that move through GDAL read/write buffers.
pub trait DataType: GdalType + Zero + Clone + Copy + Send + Sync + Debug {}

impl<T: GdalType + Zero + Clone + Copy + Send + Sync + Debug> DataType for T {}
