use crate::{
    config::CSA_CONVECTIVE,
    label::{cells_by_label, label_regions},
    region::{self, RegionShape},
    scene::WindowedScene,
};

/// Statistics for one convective core.
///
/// Cores are measured in window local coordinates against the composite reflectivity grid,
/// then their centroids are translated back to the full domain.
#[derive(Debug, Clone)]
pub struct CoreStats {
    /// Shape of the core.
    pub shape: RegionShape,
    /// Centroid in full domain (row, column) coordinates.
    pub centroid: (f64, f64),
    /// Reflectivity weighted centroid in full domain coordinates.
    pub weighted_centroid: Option<(f64, f64)>,
    /// Mean latitude of the member cells.
    pub lat: Option<f64>,
    /// Mean longitude of the member cells.
    pub lon: Option<f64>,
    /// Maximum echo top height over the member cells at 10, 20, 30, and 40 dBZ.
    pub max_dbz_height: [Option<f64>; 4],
    /// Mean echo top height over the member cells at 10, 20, 30, and 40 dBZ.
    pub avg_dbz_height: [Option<f64>; 4],
}

/// Find and measure every convective core inside an analysis window.
///
/// A core is a connected region of convective category cells. The returned list is in
/// discovery order, ranking into the bounded output slots happens where the results are
/// stored.
pub fn extract_cores(scene: &WindowedScene) -> Vec<CoreStats> {
    let mask = scene.csa.mapv(|v| v == CSA_CONVECTIVE);
    let (labels, count) = label_regions(&mask);

    cells_by_label(&labels, count)
        .iter()
        .map(|cells| {
            let shape = RegionShape::measure(cells, &scene.dbz);
            let centroid = scene.window.to_domain(shape.centroid.0, shape.centroid.1);
            let weighted_centroid = shape
                .weighted_centroid
                .map(|(r, c)| scene.window.to_domain(r, c));

            CoreStats {
                shape,
                centroid,
                weighted_centroid,
                lat: region::mean_present(cells, &scene.lat),
                lon: region::mean_present(cells, &scene.lon),
                max_dbz_height: std::array::from_fn(|i| {
                    region::max_present(cells, &scene.dbz_heights[i])
                }),
                avg_dbz_height: std::array::from_fn(|i| {
                    region::mean_present(cells, &scene.dbz_heights[i])
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{grid::GridWindow, FILL_VALUE};
    use ndarray::Array2;

    fn empty_window(nrows: usize, ncols: usize, row0: usize, col0: usize) -> WindowedScene {
        WindowedScene {
            window: GridWindow {
                row0,
                col0,
                nrows,
                ncols,
            },
            csa: Array2::zeros((nrows, ncols)),
            rainrate: Array2::from_elem((nrows, ncols), FILL_VALUE),
            dbz: Array2::from_elem((nrows, ncols), FILL_VALUE),
            dbz_heights: std::array::from_fn(|_| Array2::from_elem((nrows, ncols), FILL_VALUE)),
            lat: Array2::from_elem((nrows, ncols), 35.0),
            lon: Array2::from_elem((nrows, ncols), -97.0),
            quality: Array2::from_elem((nrows, ncols), 1.0),
        }
    }

    #[test]
    fn no_convective_cells_means_no_cores() {
        let scene = empty_window(6, 6, 0, 0);
        assert!(extract_cores(&scene).is_empty());
    }

    #[test]
    fn cores_are_labeled_and_measured() {
        let mut scene = empty_window(8, 8, 10, 20);

        // One two cell core and one single cell core on a diagonal, so 4-connectivity
        // keeps them apart.
        scene.csa[(1, 1)] = 6.0;
        scene.csa[(1, 2)] = 6.0;
        scene.csa[(2, 3)] = 6.0;

        scene.dbz[(1, 1)] = 40.0;
        scene.dbz[(1, 2)] = 50.0;
        scene.dbz[(2, 3)] = 45.0;

        // Echo top heights at 10 dBZ, one cell left as fill.
        scene.dbz_heights[0][(1, 1)] = 9.0;
        scene.dbz_heights[0][(1, 2)] = FILL_VALUE;
        scene.dbz_heights[0][(2, 3)] = 7.0;

        let cores = extract_cores(&scene);
        assert_eq!(cores.len(), 2);

        let first = &cores[0];
        assert_eq!(first.shape.npix, 2);
        assert_eq!(first.centroid, (11.0, 21.5));
        assert_eq!(first.lat, Some(35.0));
        assert_eq!(first.lon, Some(-97.0));

        // Fill cells stay out of the height statistics.
        assert_eq!(first.max_dbz_height[0], Some(9.0));
        assert_eq!(first.avg_dbz_height[0], Some(9.0));

        // Thresholds with no data at all yield nothing.
        assert_eq!(first.max_dbz_height[3], None);
        assert_eq!(first.avg_dbz_height[3], None);

        // The weighted centroid leans toward the stronger reflectivity.
        let (wr, wc) = first.weighted_centroid.unwrap();
        assert_eq!(wr, 11.0);
        assert!((wc - (21.0 * 40.0 + 22.0 * 50.0) / 90.0).abs() < 1.0e-12);

        let second = &cores[1];
        assert_eq!(second.shape.npix, 1);
        assert_eq!(second.centroid, (12.0, 23.0));
    }
}
