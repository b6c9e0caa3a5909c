use crate::{error::CoRegistrationError, McspfResult};
use ndarray::{s, Array2};

/// A rectangular analysis window into the full radar domain.
///
/// Windows are built around a cloud footprint and carry the offset needed to
/// translate window local region coordinates back to the full domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridWindow {
    /// First domain row covered by the window.
    pub row0: usize,
    /// First domain column covered by the window.
    pub col0: usize,
    /// Number of rows in the window.
    pub nrows: usize,
    /// Number of columns in the window.
    pub ncols: usize,
}

impl GridWindow {
    /// Build a window around an inclusive bounding box, padded by `margin` cells on every side
    /// and clipped to the domain bounds.
    ///
    /// The padding keeps a halo of context around the cloud so precipitation on its edge is
    /// not cut off, while the clipping keeps the window inside the grid.
    pub fn padded(
        bbox: (usize, usize, usize, usize),
        margin: usize,
        domain: (usize, usize),
    ) -> Self {
        let (minrow, mincol, maxrow, maxcol) = bbox;
        let (domrows, domcols) = domain;

        let row0 = minrow.saturating_sub(margin);
        let col0 = mincol.saturating_sub(margin);
        let row_end = (maxrow + margin + 1).min(domrows);
        let col_end = (maxcol + margin + 1).min(domcols);

        GridWindow {
            row0,
            col0,
            nrows: row_end - row0,
            ncols: col_end - col0,
        }
    }

    /// Crop a full domain grid to this window.
    pub fn crop(&self, grid: &Array2<f64>) -> Array2<f64> {
        grid.slice(s![
            self.row0..(self.row0 + self.nrows),
            self.col0..(self.col0 + self.ncols)
        ])
        .to_owned()
    }

    /// Crop a full domain grid to this window keeping data only at the listed cells.
    ///
    /// Every other cell of the result is set to `background`. Listed cells that fall outside
    /// the window are skipped.
    pub fn crop_keeping(
        &self,
        grid: &Array2<f64>,
        cells: &[(usize, usize)],
        background: f64,
    ) -> Array2<f64> {
        let mut out = Array2::from_elem((self.nrows, self.ncols), background);

        for &(row, col) in cells {
            if row >= self.row0
                && row < self.row0 + self.nrows
                && col >= self.col0
                && col < self.col0 + self.ncols
            {
                out[(row - self.row0, col - self.col0)] = grid[(row, col)];
            }
        }

        out
    }

    /// Translate window local fractional coordinates back to the full domain.
    pub fn to_domain(&self, row: f64, col: f64) -> (f64, f64) {
        (row + self.row0 as f64, col + self.col0 as f64)
    }
}

/// Check that every grid in a bundle shares the shape of the first.
pub fn check_co_registered(shapes: &[(usize, usize)]) -> McspfResult<()> {
    if let Some((&first, rest)) = shapes.split_first() {
        for &shape in rest {
            if shape != first {
                return Err(CoRegistrationError {
                    expected: first,
                    actual: shape,
                }
                .into());
            }
        }
    }

    Ok(())
}
