/*!
 * Connected component labeling and binary morphology over 2-D masks.
 *
 * Both the convective core search and the precipitation feature search reduce to labeling
 * connected groups of qualifying cells inside an analysis window. Connectivity is always
 * 4-way, so cells touching only at a corner belong to separate regions.
 */

use ndarray::Array2;

/// Label connected groups of true cells with 4-connectivity.
///
/// Background cells get 0 and each connected region gets a label from 1 up to the returned
/// count, assigned in row major discovery order.
pub fn label_regions(mask: &Array2<bool>) -> (Array2<u32>, u32) {
    let (nrows, ncols) = mask.dim();
    let mut labels = Array2::<u32>::zeros((nrows, ncols));
    let mut count = 0u32;
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for row in 0..nrows {
        for col in 0..ncols {
            if !mask[(row, col)] || labels[(row, col)] != 0 {
                continue;
            }

            count += 1;
            labels[(row, col)] = count;
            stack.push((row, col));

            while let Some((r, c)) = stack.pop() {
                if r > 0 && mask[(r - 1, c)] && labels[(r - 1, c)] == 0 {
                    labels[(r - 1, c)] = count;
                    stack.push((r - 1, c));
                }
                if r + 1 < nrows && mask[(r + 1, c)] && labels[(r + 1, c)] == 0 {
                    labels[(r + 1, c)] = count;
                    stack.push((r + 1, c));
                }
                if c > 0 && mask[(r, c - 1)] && labels[(r, c - 1)] == 0 {
                    labels[(r, c - 1)] = count;
                    stack.push((r, c - 1));
                }
                if c + 1 < ncols && mask[(r, c + 1)] && labels[(r, c + 1)] == 0 {
                    labels[(r, c + 1)] = count;
                    stack.push((r, c + 1));
                }
            }
        }
    }

    (labels, count)
}

/// Grow a mask by one cell in each of the four cardinal directions.
///
/// This closes one cell gaps between nearly touching regions so a storm split by a single
/// missing pixel is still treated as one feature.
pub fn dilate_cross(mask: &Array2<bool>) -> Array2<bool> {
    let (nrows, ncols) = mask.dim();
    let mut out = mask.clone();

    for row in 0..nrows {
        for col in 0..ncols {
            if !mask[(row, col)] {
                continue;
            }

            if row > 0 {
                out[(row - 1, col)] = true;
            }
            if row + 1 < nrows {
                out[(row + 1, col)] = true;
            }
            if col > 0 {
                out[(row, col - 1)] = true;
            }
            if col + 1 < ncols {
                out[(row, col + 1)] = true;
            }
        }
    }

    out
}

/// Collect the cells carrying each positive label, indexed by label minus one.
pub fn cells_by_label(labels: &Array2<u32>, count: u32) -> Vec<Vec<(usize, usize)>> {
    let mut cells: Vec<Vec<(usize, usize)>> = vec![Vec::new(); count as usize];

    for ((row, col), &lbl) in labels.indexed_iter() {
        if lbl > 0 {
            cells[(lbl - 1) as usize].push((row, col));
        }
    }

    cells
}
