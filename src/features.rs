/*!
 * Precipitation feature extraction and cloud system level aggregation.
 *
 * A precipitation feature starts from cells that are raining hard enough and are classified
 * stratiform or convective. The seed mask is dilated by one cell so storms separated by a
 * single pixel gap stay one feature, the dilated mask is labeled, and each labeled candidate
 * is then restricted back to the qualifying categories before anything is measured. The
 * convective and stratiform cells of each feature get their own sub-statistics, and the
 * features that survive ranking feed the system wide aggregates.
 */

use crate::{
    config::{CSA_CONVECTIVE, CSA_STRATIFORM},
    label::{cells_by_label, dilate_cross, label_regions},
    region::{self, RegionShape},
    scene::WindowedScene,
};
use ndarray::Array2;

/// Rain statistics over the convective cells of one precipitation feature.
#[derive(Debug, Clone, Copy)]
pub struct ConvectiveSubset {
    /// Number of convective member cells.
    pub npix: usize,
    /// Mean rain rate over those cells.
    pub rainrate: Option<f64>,
    /// Mean echo top height over those cells at 10, 20, 30, and 40 dBZ.
    pub dbz_height: [Option<f64>; 4],
}

/// Rain statistics over the stratiform cells of one precipitation feature.
#[derive(Debug, Clone, Copy)]
pub struct StratiformSubset {
    /// Number of stratiform member cells.
    pub npix: usize,
    /// Mean rain rate over those cells.
    pub rainrate: Option<f64>,
}

/// Statistics for one precipitation feature.
#[derive(Debug, Clone)]
pub struct PfStats {
    /// Shape measured against the rain rate grid, window local coordinates.
    pub shape: RegionShape,
    /// Centroid in full domain (row, column) coordinates.
    pub centroid: (f64, f64),
    /// Rain weighted centroid in full domain coordinates.
    pub weighted_centroid: Option<(f64, f64)>,
    /// Mean latitude of the member cells.
    pub lat: Option<f64>,
    /// Mean longitude of the member cells.
    pub lon: Option<f64>,
    /// Mean rain rate over the member cells.
    pub rainrate: Option<f64>,
    /// Sample skewness of the rain rate over the member cells.
    pub skewness: Option<f64>,
    /// Member cells with an echo top above the 40, 45, and 50 dBZ thresholds.
    pub dbz_area_npix: [usize; 3],
    /// Statistics over the convective member cells, when there are any.
    pub convective: Option<ConvectiveSubset>,
    /// Statistics over the stratiform member cells, when there are any.
    pub stratiform: Option<StratiformSubset>,
}

/// Everything the precipitation feature search found in one window.
#[derive(Debug, Clone)]
pub struct SceneFeatures {
    /// Count of labeled candidate regions, reported as the feature count even when it
    /// exceeds the output capacity.
    pub candidate_count: usize,
    /// The measured features in discovery order.
    pub features: Vec<PfStats>,
}

fn qualifying(csa: f64) -> bool {
    csa == CSA_STRATIFORM || csa == CSA_CONVECTIVE
}

/// Find and measure every precipitation feature inside an analysis window.
pub fn extract_features(scene: &WindowedScene, rr_min: f64) -> SceneFeatures {
    let seed = Array2::from_shape_fn(scene.csa.dim(), |idx| {
        qualifying(scene.csa[idx]) && scene.rainrate[idx] > rr_min
    });

    let (labels, count) = label_regions(&dilate_cross(&seed));
    let candidates = cells_by_label(&labels, count);

    let mut features = Vec::with_capacity(candidates.len());
    for cells in &candidates {
        // The dilation halo may cover cells outside the qualifying categories. They bound
        // the feature but are excluded from every statistic.
        let members: Vec<(usize, usize)> = cells
            .iter()
            .copied()
            .filter(|&(r, c)| qualifying(scene.csa[(r, c)]))
            .collect();

        if members.is_empty() {
            continue;
        }

        let shape = RegionShape::measure(&members, &scene.rainrate);
        let centroid = scene.window.to_domain(shape.centroid.0, shape.centroid.1);
        let weighted_centroid = shape
            .weighted_centroid
            .map(|(r, c)| scene.window.to_domain(r, c));

        let convective_cells: Vec<(usize, usize)> = members
            .iter()
            .copied()
            .filter(|&(r, c)| scene.csa[(r, c)] == CSA_CONVECTIVE)
            .collect();
        let convective = if convective_cells.is_empty() {
            None
        } else {
            Some(ConvectiveSubset {
                npix: convective_cells.len(),
                rainrate: region::mean_present(&convective_cells, &scene.rainrate),
                dbz_height: std::array::from_fn(|i| {
                    region::mean_present(&convective_cells, &scene.dbz_heights[i])
                }),
            })
        };

        let stratiform_cells: Vec<(usize, usize)> = members
            .iter()
            .copied()
            .filter(|&(r, c)| scene.csa[(r, c)] == CSA_STRATIFORM)
            .collect();
        let stratiform = if stratiform_cells.is_empty() {
            None
        } else {
            Some(StratiformSubset {
                npix: stratiform_cells.len(),
                rainrate: region::mean_present(&stratiform_cells, &scene.rainrate),
            })
        };

        features.push(PfStats {
            shape,
            centroid,
            weighted_centroid,
            lat: region::mean_present(&members, &scene.lat),
            lon: region::mean_present(&members, &scene.lon),
            rainrate: region::mean_present(&members, &scene.rainrate),
            skewness: region::skewness(&members, &scene.rainrate),
            dbz_area_npix: [
                region::count_above(&members, &scene.dbz_heights[3], 0.0),
                region::count_above(&members, &scene.dbz_heights[4], 0.0),
                region::count_above(&members, &scene.dbz_heights[5], 0.0),
            ],
            convective,
            stratiform,
        });
    }

    SceneFeatures {
        candidate_count: count as usize,
        features,
    }
}

/// Cloud system level aggregates over the precipitation features stored in the output slots.
///
/// A system with zero stored features, or with no stored feature carrying a given subset,
/// has no value for the corresponding aggregates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAggregates {
    /// Total convective cells over the stored features.
    pub cc_npix: Option<usize>,
    /// Mean convective rain rate over the stored features that have one.
    pub cc_rainrate: Option<f64>,
    /// Mean convective echo top height at 10, 20, 30, and 40 dBZ.
    pub cc_dbz_height: [Option<f64>; 4],
    /// Total stratiform cells over the stored features.
    pub sf_npix: Option<usize>,
    /// Mean stratiform rain rate over the stored features that have one.
    pub sf_rainrate: Option<f64>,
}

impl SystemAggregates {
    /// Aggregate over the features that made it into the output slots.
    pub fn over_stored(stored: &[&PfStats]) -> Self {
        let mut agg = SystemAggregates::default();

        let convective: Vec<&ConvectiveSubset> = stored
            .iter()
            .filter_map(|pf| pf.convective.as_ref())
            .collect();
        if !convective.is_empty() {
            agg.cc_npix = Some(convective.iter().map(|s| s.npix).sum());
            agg.cc_rainrate = mean_of(convective.iter().filter_map(|s| s.rainrate));
            for i in 0..4 {
                agg.cc_dbz_height[i] = mean_of(convective.iter().filter_map(|s| s.dbz_height[i]));
            }
        }

        let stratiform: Vec<&StratiformSubset> = stored
            .iter()
            .filter_map(|pf| pf.stratiform.as_ref())
            .collect();
        if !stratiform.is_empty() {
            agg.sf_npix = Some(stratiform.iter().map(|s| s.npix).sum());
            agg.sf_rainrate = mean_of(stratiform.iter().filter_map(|s| s.rainrate));
        }

        agg
    }
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for v in values {
        sum += v;
        count += 1;
    }

    if count > 0 {
        Some(sum / count as f64)
    } else {
        None
    }
}
