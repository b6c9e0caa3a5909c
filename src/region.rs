/*!
 * Shape and intensity measurements for a single connected region of grid cells.
 *
 * The axis lengths, orientation, and eccentricity come from the eigenvalues of the region's
 * second central moment matrix, the usual best fit ellipse construction for image regions.
 * Intensity statistics skip fill valued cells so the sentinel never leaks into a mean or a
 * maximum. A statistic left with nothing to aggregate is `None`.
 */

use crate::FILL_VALUE;
use ndarray::Array2;
use rustc_hash::FxHashSet as HashSet;

/// Eigenvalues below this are treated as zero when deciding degeneracy.
const TINY: f64 = 1.0e-12;

/// Geometric description of one connected region.
///
/// Lengths are in pixel units and coordinates are local to the grid the region was labeled
/// on. Single cells and perfectly collinear regions have no defined minor axis, which also
/// leaves the aspect ratio undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionShape {
    /// Number of member cells.
    pub npix: usize,
    /// Mean (row, column) of the member cells.
    pub centroid: (f64, f64),
    /// Intensity weighted mean (row, column), skipping fill valued cells.
    pub weighted_centroid: Option<(f64, f64)>,
    /// Major axis length of the best fit ellipse.
    pub major_axis: f64,
    /// Minor axis length of the best fit ellipse.
    pub minor_axis: Option<f64>,
    /// Major axis over minor axis.
    pub aspect_ratio: Option<f64>,
    /// 0 for a circle, approaching 1 for a line.
    pub eccentricity: f64,
    /// Major axis angle in degrees from the grid vertical, in [0, 360).
    pub orientation: f64,
    /// Count of cell edges bordering non member cells.
    pub perimeter: f64,
}

impl RegionShape {
    /// Measure a region given its member cells and a co-registered intensity grid.
    ///
    /// The cell list must be non-empty and lie within the grid.
    pub fn measure(cells: &[(usize, usize)], intensity: &Array2<f64>) -> Self {
        debug_assert!(!cells.is_empty());

        let n = cells.len() as f64;

        let mut rsum = 0.0;
        let mut csum = 0.0;
        for &(r, c) in cells {
            rsum += r as f64;
            csum += c as f64;
        }
        let rbar = rsum / n;
        let cbar = csum / n;

        // Second central moments, normalized by the cell count.
        let mut mrr = 0.0;
        let mut mcc = 0.0;
        let mut mrc = 0.0;
        for &(r, c) in cells {
            let dr = r as f64 - rbar;
            let dc = c as f64 - cbar;
            mrr += dr * dr;
            mcc += dc * dc;
            mrc += dr * dc;
        }
        mrr /= n;
        mcc /= n;
        mrc /= n;

        let common = (((mrr - mcc) / 2.0).powi(2) + mrc * mrc).sqrt();
        let l1 = (mrr + mcc) / 2.0 + common;
        let l2 = ((mrr + mcc) / 2.0 - common).max(0.0);

        let major_axis = 4.0 * l1.max(0.0).sqrt();
        let minor_axis = if l2 > TINY {
            Some(4.0 * l2.sqrt())
        } else {
            None
        };

        let aspect_ratio = match minor_axis {
            Some(minor) if minor > TINY => Some(major_axis / minor),
            _ => None,
        };

        let eccentricity = if l1 > TINY {
            (1.0 - l2 / l1).sqrt()
        } else {
            0.0
        };

        let mut orientation = 0.5 * (2.0 * mrc).atan2(mrr - mcc).to_degrees();
        if orientation < 0.0 {
            orientation += 360.0;
        }

        // Weighted centroid over the cells that actually carry intensity data.
        let mut wsum = 0.0;
        let mut wrsum = 0.0;
        let mut wcsum = 0.0;
        for &(r, c) in cells {
            let v = intensity[(r, c)];
            if present(v) {
                wsum += v;
                wrsum += v * r as f64;
                wcsum += v * c as f64;
            }
        }
        let weighted_centroid = if wsum > TINY {
            Some((wrsum / wsum, wcsum / wsum))
        } else {
            None
        };

        let members: HashSet<(usize, usize)> = cells.iter().copied().collect();
        let mut exposed = 0usize;
        for &(r, c) in cells {
            if r == 0 || !members.contains(&(r - 1, c)) {
                exposed += 1;
            }
            if !members.contains(&(r + 1, c)) {
                exposed += 1;
            }
            if c == 0 || !members.contains(&(r, c - 1)) {
                exposed += 1;
            }
            if !members.contains(&(r, c + 1)) {
                exposed += 1;
            }
        }

        RegionShape {
            npix: cells.len(),
            centroid: (rbar, cbar),
            weighted_centroid,
            major_axis,
            minor_axis,
            aspect_ratio,
            eccentricity,
            orientation,
            perimeter: exposed as f64,
        }
    }
}

fn present(v: f64) -> bool {
    v != FILL_VALUE && !v.is_nan()
}

/// Mean of a grid over the member cells, skipping fill valued cells.
///
/// `None` when every member cell is fill valued.
pub fn mean_present(cells: &[(usize, usize)], grid: &Array2<f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for &(r, c) in cells {
        let v = grid[(r, c)];
        if present(v) {
            sum += v;
            count += 1;
        }
    }

    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}

/// Maximum of a grid over the member cells, skipping fill valued cells.
pub fn max_present(cells: &[(usize, usize)], grid: &Array2<f64>) -> Option<f64> {
    let mut max: Option<f64> = None;

    for &(r, c) in cells {
        let v = grid[(r, c)];
        if present(v) {
            max = Some(match max {
                Some(m) if m >= v => m,
                _ => v,
            });
        }
    }

    max
}

/// Count member cells where the grid value exceeds `threshold`.
pub fn count_above(cells: &[(usize, usize)], grid: &Array2<f64>, threshold: f64) -> usize {
    cells
        .iter()
        .filter(|&&(r, c)| {
            let v = grid[(r, c)];
            present(v) && v > threshold
        })
        .count()
}

/// Sample skewness of the grid values over the member cells, skipping fill valued cells.
///
/// Zero when the present values do not vary, `None` when nothing is present.
pub fn skewness(cells: &[(usize, usize)], grid: &Array2<f64>) -> Option<f64> {
    let values: Vec<f64> = cells
        .iter()
        .map(|&(r, c)| grid[(r, c)])
        .filter(|&v| present(v))
        .collect();

    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let mut m2 = 0.0;
    let mut m3 = 0.0;
    for &v in &values {
        let d = v - mean;
        m2 += d * d;
        m3 += d * d * d;
    }
    m2 /= n;
    m3 /= n;

    if m2 > TINY {
        Some(m3 / m2.powf(1.5))
    } else {
        Some(0.0)
    }
}
