use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RastioError>;

#[derive(thiserror::Error, Debug)]
pub enum RastioError {
    #[error("no file at: {0}")]
    FileNotFound(PathBuf),
    #[error(transparent)]
    GdalError(#[from] gdal::errors::GdalError),
    #[error(transparent)]
    NdarrayError(#[from] ndarray::ShapeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("clip box does not intersect raster extent")]
    NoIntersection,
    #[error("geotransform is not invertible")]
    NonInvertibleTransform,
    #[error("array shape {got:?} does not match profile (count, height, width) {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        got: (usize, usize, usize),
    },
}
