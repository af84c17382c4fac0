use std::path::Path;

use gdal::Dataset;
use log::debug;
use ndarray::{s, Array2, Array3};

use crate::{
    errors::{RastioError, Result},
    profile::GeotiffProfile,
    DataType,
};

/// Read every band of a raster into a dense `(band, height, width)` array.
///
/// Fails with [`RastioError::FileNotFound`] when `path` does not exist at
/// call time. The check races with the filesystem (another process may
/// remove the file before the open); it is a best-effort precondition,
/// not a guarantee. The dataset handle is released before returning.
pub fn read_geotiff<T: DataType, P: AsRef<Path>>(path: P) -> Result<Array3<T>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RastioError::FileNotFound(path.to_path_buf()));
    }
    let dataset = Dataset::open(path)?;
    let array = read_all_bands(&dataset)?;
    debug!("read {:?} from {}", array.shape(), path.display());
    Ok(array)
}

/// As [`read_geotiff`], additionally extracting the profile embedded in
/// the file header.
pub fn read_geotiff_with_profile<T: DataType, P: AsRef<Path>>(
    path: P,
) -> Result<(Array3<T>, GeotiffProfile)> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RastioError::FileNotFound(path.to_path_buf()));
    }
    let dataset = Dataset::open(path)?;
    let array = read_all_bands(&dataset)?;
    let profile = GeotiffProfile::from_dataset(&dataset)?;
    debug!("read {:?} with profile from {}", array.shape(), path.display());
    Ok((array, profile))
}

pub(crate) fn read_all_bands<T: DataType>(dataset: &Dataset) -> Result<Array3<T>> {
    let size = dataset.raster_size();
    read_window(dataset, (0, 0), size)
}

/// Read a pixel window of every band, stacked along the band axis.
pub(crate) fn read_window<T: DataType>(
    dataset: &Dataset,
    offset: (isize, isize),
    size: (usize, usize),
) -> Result<Array3<T>> {
    let count = dataset.raster_count();
    let (width, height) = size;
    let mut array = Array3::zeros((count, height, width));
    for index in 0..count {
        let buffer = dataset
            .rasterband(index + 1)?
            .read_as::<T>(offset, size, size, None)?;
        array
            .slice_mut(s![index, .., ..])
            .assign(&Array2::from_shape_vec(
                (height, width),
                buffer.data().to_vec(),
            )?);
    }
    Ok(array)
}
