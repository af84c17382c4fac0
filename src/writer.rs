use std::{fs, path::Path};

use gdal::{
    raster::{Buffer, RasterCreationOptions},
    spatial_ref::SpatialRef,
    Dataset, DatasetOptions, DriverManager, GdalOpenFlags, Metadata as GdalMetadata,
};
use log::{debug, info};
use ndarray::{s, Array3};

use crate::{
    errors::{RastioError, Result},
    profile::{GeotiffProfile, Interleave},
    DataType,
};

/// Overview reduction cascade for Cloud-Optimized GeoTIFFs. Factors
/// coarser than the raster collapse to a single pixel inside GDAL.
const OVERVIEW_LEVELS: [i32; 4] = [2, 4, 8, 16];
const OVERVIEW_RESAMPLING: &str = "AVERAGE";
const COG_BLOCK_SIZE: &str = "512";

/// Domain and key of the tag recording how overviews were resampled.
const PROVENANCE_DOMAIN: &str = "overview-provenance";
const PROVENANCE_KEY: &str = "resampling-method";

/// Write a `(band, height, width)` array to `path` encoded per `profile`.
///
/// The parent directory chain of `path` is created if missing. An
/// existing file at `path` is overwritten. Encoding failures propagate
/// unchanged and may leave a truncated file behind; there is no rollback.
pub fn save_geotiff<T: DataType, P: AsRef<Path>>(
    array: &Array3<T>,
    path: P,
    profile: &GeotiffProfile,
) -> Result<()> {
    let path = path.as_ref();
    let expected = (profile.count, profile.height, profile.width);
    if array.dim() != expected {
        return Err(RastioError::ShapeMismatch {
            expected,
            got: array.dim(),
        });
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let driver = DriverManager::get_driver_by_name(&profile.driver)?;
    let creation_options = profile.creation_options();
    let options = RasterCreationOptions::from_iter(creation_options.iter().map(String::as_str));
    let mut dataset = driver.create_with_band_type_with_options::<T, _>(
        path,
        profile.width,
        profile.height,
        profile.count,
        &options,
    )?;

    dataset.set_geo_transform(&crate::transform::affine_to_gdal(&profile.transform))?;
    dataset.set_spatial_ref(&SpatialRef::from_definition(&profile.crs)?)?;

    for index in 0..profile.count {
        let mut band = dataset.rasterband(index + 1)?;
        if let Some(nodata) = profile.nodata {
            band.set_no_data_value(Some(nodata))?;
        }
        let data: Vec<T> = array.slice(s![index, .., ..]).iter().copied().collect();
        let mut buffer = Buffer::new((profile.width, profile.height), data);
        band.write((0, 0), (profile.width, profile.height), &mut buffer)?;
    }

    dataset.flush_cache()?;
    info!(
        "wrote {} band(s) of {}x{} to {}",
        profile.count,
        profile.width,
        profile.height,
        path.display()
    );
    Ok(())
}

/// Write `array` as a Cloud-Optimized GeoTIFF.
///
/// Forces pixel interleaving, 512x512 internal tiles, and deflate
/// compression on a working copy of `profile`, writes the base image via
/// [`save_geotiff`], then reopens the file in update mode to build the
/// overview pyramid at factors {2, 4, 8, 16} with average resampling. The
/// resampling method is recorded as a `resampling-method` tag in the
/// `overview-provenance` metadata domain. A failure during the overview
/// step leaves the base image on disk.
pub fn save_cog<T: DataType, P: AsRef<Path>>(
    array: &Array3<T>,
    path: P,
    profile: &GeotiffProfile,
) -> Result<()> {
    let path = path.as_ref();
    let cog_profile = profile
        .clone()
        .interleave(Interleave::Pixel)
        .tiled(true)
        .compress("DEFLATE")
        .extra("BLOCKXSIZE", COG_BLOCK_SIZE)
        .extra("BLOCKYSIZE", COG_BLOCK_SIZE);
    save_geotiff(array, path, &cog_profile)?;

    let mut dataset = Dataset::open_ex(
        path,
        DatasetOptions {
            open_flags: GdalOpenFlags::GDAL_OF_RASTER | GdalOpenFlags::GDAL_OF_UPDATE,
            ..Default::default()
        },
    )?;
    debug!(
        "building {:?} overviews for {}",
        OVERVIEW_LEVELS,
        path.display()
    );
    dataset.build_overviews(OVERVIEW_RESAMPLING, &OVERVIEW_LEVELS, &[])?;
    dataset.set_metadata_item(PROVENANCE_KEY, "average", PROVENANCE_DOMAIN)?;
    dataset.flush_cache()?;
    Ok(())
}
