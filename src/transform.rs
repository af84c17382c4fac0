use geo::AffineTransform;

/// Build a north-up geotransform from an origin and a pixel resolution.
///
/// Column `c`, row `r` map to `(lon_min + c * resolution,
/// lat_max - r * resolution)`. The resolution sign is not checked; a
/// negative value flips the axis direction.
pub fn create_transform(lon_min: f64, lat_max: f64, resolution: f64) -> AffineTransform {
    AffineTransform::new(resolution, 0.0, lon_min, 0.0, -resolution, lat_max)
}

/// GDAL orders the coefficients `[xoff, a, b, yoff, d, e]`.
pub(crate) fn affine_from_gdal(gdal_transform: [f64; 6]) -> AffineTransform {
    AffineTransform::new(
        gdal_transform[1],
        gdal_transform[2],
        gdal_transform[0],
        gdal_transform[4],
        gdal_transform[5],
        gdal_transform[3],
    )
}

pub(crate) fn affine_to_gdal(transform: &AffineTransform) -> [f64; 6] {
    [
        transform.xoff(),
        transform.a(),
        transform.b(),
        transform.yoff(),
        transform.d(),
        transform.e(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;
    use rstest::rstest;

    #[rstest]
    #[case((0.0, 0.0), (10.0, 50.0))]
    #[case((1.0, 1.0), (10.1, 49.9))]
    #[case((10.0, 5.0), (11.0, 49.5))]
    fn maps_pixel_to_geo(#[case] pixel: (f64, f64), #[case] geo: (f64, f64)) {
        let transform = create_transform(10.0, 50.0, 0.1);
        let mapped = transform.apply(Coord {
            x: pixel.0,
            y: pixel.1,
        });
        assert!((mapped.x - geo.0).abs() < 1e-10);
        assert!((mapped.y - geo.1).abs() < 1e-10);
    }

    #[rstest]
    fn negative_resolution_flips_axes() {
        let transform = create_transform(10.0, 50.0, -0.1);
        let mapped = transform.apply(Coord { x: 1.0, y: 1.0 });
        assert!((mapped.x - 9.9).abs() < 1e-10);
        assert!((mapped.y - 50.1).abs() < 1e-10);
    }

    #[rstest]
    fn gdal_round_trip() {
        let transform = create_transform(-4.25, 61.0, 0.25);
        let round_tripped = affine_from_gdal(affine_to_gdal(&transform));
        assert_eq!(transform, round_tripped);
    }
}
