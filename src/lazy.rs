use std::{
    fmt,
    path::{Path, PathBuf},
};

use gdal::Dataset;
use geo::{AffineTransform, Coord};
use log::{debug, info};
use ndarray::{Array3, ArrayD, Axis};

use crate::{
    errors::{RastioError, Result},
    reader::read_window,
    transform::affine_from_gdal,
    DataType,
};

/// Open a raster lazily: metadata now, pixels on demand.
pub fn read_geotiff_lazy<P: AsRef<Path>>(path: P) -> Result<LazyRaster> {
    LazyRaster::open(path)
}

/// Open a raster lazily and narrow it to `bbox = (min_x, min_y, max_x,
/// max_y)` in the raster's native CRS. No pixels are read.
pub fn read_geotiff_lazy_and_clip<P: AsRef<Path>>(
    path: P,
    bbox: (f64, f64, f64, f64),
) -> Result<LazyRaster> {
    LazyRaster::open(path)?.clip_box(bbox)
}

/// Handle on a raster window with its georeferencing, but no pixel data.
///
/// Only metadata is read at open time. Each materialization reopens the
/// file for the duration of the read, so the handle holds no file
/// descriptor between calls.
pub struct LazyRaster {
    path: PathBuf,
    /// (col, row) of the window's top-left pixel in the source raster.
    offset: (usize, usize),
    /// (width, height) of the window.
    size: (usize, usize),
    band_count: usize,
    /// Geotransform anchored at the window's top-left corner.
    transform: AffineTransform,
    crs: String,
}

impl fmt::Debug for LazyRaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyRaster")
            .field("path", &self.path)
            .field("bands", &self.band_count)
            .field("shape", &self.shape())
            .field("bounds", &self.bounds())
            .finish()
    }
}

impl LazyRaster {
    /// Fails with [`RastioError::FileNotFound`] when `path` does not
    /// exist at call time (best-effort check, races with the filesystem).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RastioError::FileNotFound(path.to_path_buf()));
        }
        let dataset = Dataset::open(path)?;
        let raster = Self {
            path: path.to_path_buf(),
            offset: (0, 0),
            size: dataset.raster_size(),
            band_count: dataset.raster_count(),
            transform: affine_from_gdal(dataset.geo_transform()?),
            crs: dataset.projection(),
        };
        info!("opened {raster:?}");
        Ok(raster)
    }

    /// Narrow the window to `bbox = (min_x, min_y, max_x, max_y)` in the
    /// raster's native CRS. Lazy: only the window bookkeeping changes.
    pub fn clip_box(self, bbox: (f64, f64, f64, f64)) -> Result<Self> {
        let (min_x, min_y, max_x, max_y) = bbox;
        let inverse = self
            .transform
            .inverse()
            .ok_or(RastioError::NonInvertibleTransform)?;
        // Opposite geographic corners; pixel rows grow downward.
        let corner_a = inverse.apply(Coord { x: min_x, y: max_y });
        let corner_b = inverse.apply(Coord { x: max_x, y: min_y });

        let (width, height) = (self.size.0 as f64, self.size.1 as f64);
        let col_min = corner_a.x.min(corner_b.x).floor().clamp(0.0, width);
        let col_max = corner_a.x.max(corner_b.x).ceil().clamp(0.0, width);
        let row_min = corner_a.y.min(corner_b.y).floor().clamp(0.0, height);
        let row_max = corner_a.y.max(corner_b.y).ceil().clamp(0.0, height);
        if col_max - col_min < 1.0 || row_max - row_min < 1.0 {
            return Err(RastioError::NoIntersection);
        }

        let origin = self.transform.apply(Coord {
            x: col_min,
            y: row_min,
        });
        let transform = AffineTransform::new(
            self.transform.a(),
            self.transform.b(),
            origin.x,
            self.transform.d(),
            self.transform.e(),
            origin.y,
        );
        debug!(
            "clipped to cols {col_min}..{col_max}, rows {row_min}..{row_max} of {}",
            self.path.display()
        );
        Ok(Self {
            offset: (
                self.offset.0 + col_min as usize,
                self.offset.1 + row_min as usize,
            ),
            size: ((col_max - col_min) as usize, (row_max - row_min) as usize),
            transform,
            ..self
        })
    }

    /// Materialize the window as a dense `(band, height, width)` array.
    pub fn read<T: DataType>(&self) -> Result<Array3<T>> {
        let dataset = Dataset::open(&self.path)?;
        read_window(
            &dataset,
            (self.offset.0 as isize, self.offset.1 as isize),
            self.size,
        )
    }

    /// Materialize the window with every singleton axis collapsed, so a
    /// single-band raster comes back as a 2-d array.
    pub fn values<T: DataType>(&self) -> Result<ArrayD<T>> {
        Ok(squeeze(self.read::<T>()?.into_dyn()))
    }

    pub fn band_count(&self) -> usize {
        self.band_count
    }

    /// (height, width) of the current window.
    pub fn shape(&self) -> (usize, usize) {
        (self.size.1, self.size.0)
    }

    pub fn transform(&self) -> &AffineTransform {
        &self.transform
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// Geographic extent of the window as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let near = self.transform.apply(Coord { x: 0.0, y: 0.0 });
        let far = self.transform.apply(Coord {
            x: self.size.0 as f64,
            y: self.size.1 as f64,
        });
        (
            near.x.min(far.x),
            near.y.min(far.y),
            near.x.max(far.x),
            near.y.max(far.y),
        )
    }

    /// Pixel-center x coordinates of the window's columns.
    pub fn x_coords(&self) -> Vec<f64> {
        (0..self.size.0)
            .map(|col| {
                self.transform
                    .apply(Coord {
                        x: col as f64 + 0.5,
                        y: 0.5,
                    })
                    .x
            })
            .collect()
    }

    /// Pixel-center y coordinates of the window's rows.
    pub fn y_coords(&self) -> Vec<f64> {
        (0..self.size.1)
            .map(|row| {
                self.transform
                    .apply(Coord {
                        x: 0.5,
                        y: row as f64 + 0.5,
                    })
                    .y
            })
            .collect()
    }
}

fn squeeze<T>(mut array: ArrayD<T>) -> ArrayD<T> {
    for axis in (0..array.ndim()).rev() {
        if array.shape()[axis] == 1 {
            array = array.index_axis_move(Axis(axis), 0);
        }
    }
    array
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reader::read_geotiff,
        transform::create_transform,
        writer::save_geotiff,
        GeotiffProfile,
    };
    use ndarray::s;
    use rstest::rstest;
    use std::path::PathBuf;

    /// 10x10 single-band raster over (0, 0)..(10, 10), one unit per pixel.
    fn fixture(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("fixture.tif");
        let array = Array3::from_shape_fn((1, 10, 10), |(_, row, col)| (row * 10 + col) as f32);
        let profile = GeotiffProfile::new(10, 10, create_transform(0.0, 10.0, 1.0));
        save_geotiff(&array, &path, &profile).unwrap();
        path
    }

    #[rstest]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_geotiff_lazy(dir.path().join("absent.tif"));
        assert!(matches!(result, Err(RastioError::FileNotFound(_))));
    }

    #[test_log::test(rstest)]
    fn lazy_read_matches_eager_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir);

        let lazy = read_geotiff_lazy(&path).unwrap();
        assert_eq!(lazy.band_count(), 1);
        assert_eq!(lazy.shape(), (10, 10));
        assert_eq!(lazy.bounds(), (0.0, 0.0, 10.0, 10.0));

        let eager = read_geotiff::<f32, _>(&path).unwrap();
        assert_eq!(lazy.read::<f32>().unwrap(), eager);
        // The singleton band axis collapses on values().
        let values = lazy.values::<f32>().unwrap();
        assert_eq!(values.ndim(), 2);
        assert_eq!(values, eager.slice(s![0, .., ..]).to_owned().into_dyn());
    }

    #[test_log::test(rstest)]
    fn clip_matches_eager_sub_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir);
        let eager = read_geotiff::<f32, _>(&path).unwrap();

        let clipped = read_geotiff_lazy_and_clip(&path, (2.0, 3.0, 5.0, 7.0)).unwrap();
        // y in (3, 7) selects rows 3..7, x in (2, 5) selects cols 2..5.
        assert_eq!(clipped.shape(), (4, 3));
        assert_eq!(clipped.bounds(), (2.0, 3.0, 5.0, 7.0));
        assert_eq!(clipped.x_coords(), vec![2.5, 3.5, 4.5]);
        assert_eq!(clipped.y_coords(), vec![6.5, 5.5, 4.5, 3.5]);
        assert_eq!(
            clipped.values::<f32>().unwrap(),
            eager.slice(s![0, 3..7, 2..5]).to_owned().into_dyn()
        );
    }

    #[rstest]
    fn clip_partially_outside_is_clamped_to_the_raster() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir);

        let clipped = read_geotiff_lazy_and_clip(&path, (-5.0, 8.0, 2.0, 20.0)).unwrap();
        assert_eq!(clipped.shape(), (2, 2));
        assert_eq!(clipped.bounds(), (0.0, 8.0, 2.0, 10.0));
    }

    #[rstest]
    fn clip_outside_extent_is_no_intersection() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir);
        let result = read_geotiff_lazy_and_clip(&path, (100.0, 100.0, 110.0, 110.0));
        assert!(matches!(result, Err(RastioError::NoIntersection)));
    }
}
