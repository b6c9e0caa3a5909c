/*!
 * Cloud system footprints on the full analysis domain.
 *
 * A tracked system at one time step is more than its focal cloud. Smaller clouds that merge
 * into it or split from it during this step belong to the same system, so the footprint is
 * the union of the focal cloud's cells with the cells of every recorded partner.
 */

use crate::grid::GridWindow;
use ndarray::Array2;
use rustc_hash::FxHashMap as HashMap;

/// An index of one time step's cloud number map, cell lists keyed by cloud identifier.
///
/// Identifiers are only meaningful within the time step the map belongs to, so an index is
/// built fresh for every analyzed scene.
#[derive(Debug, Clone)]
pub struct CloudIndex {
    cells: HashMap<u32, Vec<(usize, usize)>>,
    domain: (usize, usize),
}

impl CloudIndex {
    /// Index every positive cloud identifier in a cloud number map.
    pub fn build(map: &Array2<f64>) -> Self {
        let mut cells: HashMap<u32, Vec<(usize, usize)>> = HashMap::default();

        for ((row, col), &v) in map.indexed_iter() {
            if v > 0.0 {
                cells.entry(v as u32).or_default().push((row, col));
            }
        }

        CloudIndex {
            cells,
            domain: map.dim(),
        }
    }

    /// The shape of the indexed map.
    pub fn domain(&self) -> (usize, usize) {
        self.domain
    }

    /// Reconstruct the footprint of the system anchored at the `focal` cloud.
    ///
    /// Partner lists come straight from the track file, zero entries mark unused slots.
    /// A partner identifier missing from the map contributes nothing. Returns `None` when
    /// the focal identifier itself is absent from the map, a data consistency anomaly the
    /// caller reports and skips.
    pub fn footprint(
        &self,
        focal: u32,
        mergers: &[u32],
        splitters: &[u32],
        margin: usize,
    ) -> Option<Footprint> {
        let mut cells = self.cells.get(&focal)?.clone();

        for &partner in mergers.iter().chain(splitters.iter()) {
            if partner > 0 {
                if let Some(extra) = self.cells.get(&partner) {
                    cells.extend_from_slice(extra);
                }
            }
        }

        let mut minrow = usize::MAX;
        let mut mincol = usize::MAX;
        let mut maxrow = 0usize;
        let mut maxcol = 0usize;
        for &(row, col) in &cells {
            minrow = minrow.min(row);
            mincol = mincol.min(col);
            maxrow = maxrow.max(row);
            maxcol = maxcol.max(col);
        }

        let window = GridWindow::padded((minrow, mincol, maxrow, maxcol), margin, self.domain);

        Some(Footprint { cells, window })
    }
}

/// The full set of cells belonging to one tracked system at one time.
#[derive(Debug, Clone)]
pub struct Footprint {
    /// Member cells in full domain coordinates, the focal cloud's cells first.
    pub cells: Vec<(usize, usize)>,
    /// The padded analysis window around the cells.
    pub window: GridWindow,
}

#[cfg(test)]
mod test {
    use super::*;

    fn map_with_clouds() -> Array2<f64> {
        let mut map = Array2::zeros((30, 30));

        // Cloud 7 occupies a 2x2 block.
        map[(10, 10)] = 7.0;
        map[(10, 11)] = 7.0;
        map[(11, 10)] = 7.0;
        map[(11, 11)] = 7.0;

        // Cloud 3 sits nearby.
        map[(14, 15)] = 3.0;
        map[(14, 16)] = 3.0;

        // Cloud 9 is elsewhere.
        map[(25, 2)] = 9.0;

        map
    }

    #[test]
    fn focal_cloud_alone() {
        let index = CloudIndex::build(&map_with_clouds());

        let fp = index.footprint(7, &[0, 0, 0], &[0, 0, 0], 10).unwrap();
        assert_eq!(fp.cells.len(), 4);
        assert!(fp.cells.contains(&(10, 10)));
        assert!(fp.cells.contains(&(11, 11)));

        assert_eq!(fp.window.row0, 0);
        assert_eq!(fp.window.col0, 0);
        assert_eq!(fp.window.nrows, 22);
        assert_eq!(fp.window.ncols, 22);
    }

    #[test]
    fn merge_partner_joins_the_footprint() {
        let index = CloudIndex::build(&map_with_clouds());

        let fp = index.footprint(7, &[3, 0, 0], &[0, 0, 0], 2).unwrap();
        assert_eq!(fp.cells.len(), 6);
        assert!(fp.cells.contains(&(14, 15)));
        assert!(fp.cells.contains(&(14, 16)));

        // The window covers the partner as well.
        let win = fp.window;
        assert_eq!(win.row0, 8);
        assert_eq!(win.col0, 8);
        assert_eq!(win.nrows, 9);
        assert_eq!(win.ncols, 11);
    }

    #[test]
    fn split_partner_joins_the_footprint() {
        let index = CloudIndex::build(&map_with_clouds());

        let fp = index.footprint(7, &[0, 0, 0], &[9, 0, 0], 1).unwrap();
        assert_eq!(fp.cells.len(), 5);
        assert!(fp.cells.contains(&(25, 2)));
    }

    #[test]
    fn absent_focal_cloud_is_an_anomaly() {
        let index = CloudIndex::build(&map_with_clouds());

        assert!(index.footprint(42, &[3, 0, 0], &[0, 0, 0], 10).is_none());
    }

    #[test]
    fn absent_partner_contributes_nothing() {
        let index = CloudIndex::build(&map_with_clouds());

        let fp = index.footprint(7, &[42, 0, 0], &[0, 0, 0], 10).unwrap();
        assert_eq!(fp.cells.len(), 4);
    }
}
