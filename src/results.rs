/*!
 * The dense output arrays the assembler fills, one row per track.
 *
 * Every array is pre-sized and initialized to the fill sentinel, so a track and time the
 * state machine never processed reads as "not computed" without any extra bookkeeping.
 * Values cross from the `Option` world to the sentinel world here and nowhere else.
 */

use crate::{
    config::{MAX_CORE_SLOTS, MAX_PF_SLOTS},
    cores::CoreStats,
    features::{SceneFeatures, SystemAggregates},
    rank::rank_and_bound,
    FILL_VALUE,
};
use ndarray::{Array2, Array3};

/// Computed precipitation statistics for every track, time, and slot.
#[derive(Debug, Clone)]
pub struct ResultsTable {
    ntracks: usize,
    ntimes: usize,

    /// Fraction of the analysis window covered by good radar data.
    pub coverage: Array2<f64>,
    /// True precipitation feature count.
    pub npf: Array2<f64>,
    /// True convective core count.
    pub ncores: Array2<f64>,

    /// System total of convective cells over the stored features.
    pub cc_npix: Array2<f64>,
    /// System mean convective rain rate.
    pub cc_rainrate: Array2<f64>,
    /// System mean convective echo top height at 10, 20, 30, and 40 dBZ.
    pub cc_dbz_height: [Array2<f64>; 4],
    /// System total of stratiform cells over the stored features.
    pub sf_npix: Array2<f64>,
    /// System mean stratiform rain rate.
    pub sf_rainrate: Array2<f64>,

    /// Per slot precipitation feature statistics.
    pub pf_npix: Array3<f64>,
    pub pf_lon: Array3<f64>,
    pub pf_lat: Array3<f64>,
    pub pf_rainrate: Array3<f64>,
    pub pf_skewness: Array3<f64>,
    pub pf_major_axis: Array3<f64>,
    pub pf_minor_axis: Array3<f64>,
    pub pf_aspect_ratio: Array3<f64>,
    pub pf_eccentricity: Array3<f64>,
    pub pf_orientation: Array3<f64>,
    /// Cells above the 40, 45, and 50 dBZ echo top thresholds per slot.
    pub pf_dbz_area_npix: [Array3<f64>; 3],

    /// Per slot convective core statistics.
    pub core_npix: Array3<f64>,
    pub core_lon: Array3<f64>,
    pub core_lat: Array3<f64>,
    pub core_major_axis: Array3<f64>,
    pub core_minor_axis: Array3<f64>,
    pub core_aspect_ratio: Array3<f64>,
    pub core_eccentricity: Array3<f64>,
    pub core_orientation: Array3<f64>,
    /// Maximum echo top height at 10, 20, 30, and 40 dBZ per slot.
    pub core_max_dbz_height: [Array3<f64>; 4],
    /// Mean echo top height at 10, 20, 30, and 40 dBZ per slot.
    pub core_avg_dbz_height: [Array3<f64>; 4],
}

fn fill_or(v: Option<f64>) -> f64 {
    v.unwrap_or(FILL_VALUE)
}

impl ResultsTable {
    /// A table of the given shape with every cell at the fill value.
    pub fn new(ntracks: usize, ntimes: usize) -> Self {
        let scalar = || Array2::from_elem((ntracks, ntimes), FILL_VALUE);
        let per_pf = || Array3::from_elem((ntracks, ntimes, MAX_PF_SLOTS), FILL_VALUE);
        let per_core = || Array3::from_elem((ntracks, ntimes, MAX_CORE_SLOTS), FILL_VALUE);

        ResultsTable {
            ntracks,
            ntimes,
            coverage: scalar(),
            npf: scalar(),
            ncores: scalar(),
            cc_npix: scalar(),
            cc_rainrate: scalar(),
            cc_dbz_height: std::array::from_fn(|_| scalar()),
            sf_npix: scalar(),
            sf_rainrate: scalar(),
            pf_npix: per_pf(),
            pf_lon: per_pf(),
            pf_lat: per_pf(),
            pf_rainrate: per_pf(),
            pf_skewness: per_pf(),
            pf_major_axis: per_pf(),
            pf_minor_axis: per_pf(),
            pf_aspect_ratio: per_pf(),
            pf_eccentricity: per_pf(),
            pf_orientation: per_pf(),
            pf_dbz_area_npix: std::array::from_fn(|_| per_pf()),
            core_npix: per_core(),
            core_lon: per_core(),
            core_lat: per_core(),
            core_major_axis: per_core(),
            core_minor_axis: per_core(),
            core_aspect_ratio: per_core(),
            core_eccentricity: per_core(),
            core_orientation: per_core(),
            core_max_dbz_height: std::array::from_fn(|_| per_core()),
            core_avg_dbz_height: std::array::from_fn(|_| per_core()),
        }
    }

    pub fn ntracks(&self) -> usize {
        self.ntracks
    }

    pub fn ntimes(&self) -> usize {
        self.ntimes
    }

    /// Record the radar coverage fraction for one processed track and time.
    pub fn store_coverage(&mut self, track: usize, time: usize, coverage: Option<f64>) {
        self.coverage[(track, time)] = fill_or(coverage);
    }

    /// Rank the cores by size and record the largest into the bounded slots.
    ///
    /// The true count is recorded even when it exceeds the capacity, surplus cores are
    /// silently dropped.
    pub fn store_cores(&mut self, track: usize, time: usize, cores: &[CoreStats]) {
        self.ncores[(track, time)] = cores.len() as f64;

        let order = rank_and_bound(cores, MAX_CORE_SLOTS, |c| c.shape.npix);
        for (slot, &idx) in order.iter().enumerate() {
            let core = &cores[idx];
            let at = (track, time, slot);

            self.core_npix[at] = core.shape.npix as f64;
            self.core_lon[at] = fill_or(core.lon);
            self.core_lat[at] = fill_or(core.lat);
            self.core_major_axis[at] = core.shape.major_axis;
            self.core_minor_axis[at] = fill_or(core.shape.minor_axis);
            self.core_aspect_ratio[at] = fill_or(core.shape.aspect_ratio);
            self.core_eccentricity[at] = core.shape.eccentricity;
            self.core_orientation[at] = core.shape.orientation;
            for i in 0..4 {
                self.core_max_dbz_height[i][at] = fill_or(core.max_dbz_height[i]);
                self.core_avg_dbz_height[i][at] = fill_or(core.avg_dbz_height[i]);
            }
        }
    }

    /// Rank the features by size, record the largest into the bounded slots, and derive
    /// the system aggregates from exactly the stored set.
    pub fn store_features(&mut self, track: usize, time: usize, found: &SceneFeatures) {
        self.npf[(track, time)] = found.candidate_count as f64;

        let order = rank_and_bound(&found.features, MAX_PF_SLOTS, |pf| pf.shape.npix);
        for (slot, &idx) in order.iter().enumerate() {
            let pf = &found.features[idx];
            let at = (track, time, slot);

            self.pf_npix[at] = pf.shape.npix as f64;
            self.pf_lon[at] = fill_or(pf.lon);
            self.pf_lat[at] = fill_or(pf.lat);
            self.pf_rainrate[at] = fill_or(pf.rainrate);
            self.pf_skewness[at] = fill_or(pf.skewness);
            self.pf_major_axis[at] = pf.shape.major_axis;
            self.pf_minor_axis[at] = fill_or(pf.shape.minor_axis);
            self.pf_aspect_ratio[at] = fill_or(pf.shape.aspect_ratio);
            self.pf_eccentricity[at] = pf.shape.eccentricity;
            self.pf_orientation[at] = pf.shape.orientation;
            for i in 0..3 {
                self.pf_dbz_area_npix[i][at] = pf.dbz_area_npix[i] as f64;
            }
        }

        let stored: Vec<_> = order.iter().map(|&idx| &found.features[idx]).collect();
        let agg = SystemAggregates::over_stored(&stored);

        let at = (track, time);
        self.cc_npix[at] = fill_or(agg.cc_npix.map(|n| n as f64));
        self.cc_rainrate[at] = fill_or(agg.cc_rainrate);
        for i in 0..4 {
            self.cc_dbz_height[i][at] = fill_or(agg.cc_dbz_height[i]);
        }
        self.sf_npix[at] = fill_or(agg.sf_npix.map(|n| n as f64));
        self.sf_rainrate[at] = fill_or(agg.sf_rainrate);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        features::{ConvectiveSubset, PfStats, StratiformSubset},
        region::RegionShape,
    };

    fn shape_of(npix: usize) -> RegionShape {
        RegionShape {
            npix,
            centroid: (1.0, 1.0),
            weighted_centroid: None,
            major_axis: 3.0,
            minor_axis: Some(1.5),
            aspect_ratio: Some(2.0),
            eccentricity: 0.5,
            orientation: 10.0,
            perimeter: 8.0,
        }
    }

    fn core_of(npix: usize) -> CoreStats {
        CoreStats {
            shape: shape_of(npix),
            centroid: (1.0, 1.0),
            weighted_centroid: None,
            lat: Some(35.0),
            lon: Some(-97.0),
            max_dbz_height: [Some(8.0), None, None, None],
            avg_dbz_height: [Some(6.0), None, None, None],
        }
    }

    fn pf_of(npix: usize) -> PfStats {
        PfStats {
            shape: shape_of(npix),
            centroid: (1.0, 1.0),
            weighted_centroid: None,
            lat: Some(35.0),
            lon: Some(-97.0),
            rainrate: Some(4.0),
            skewness: Some(0.0),
            dbz_area_npix: [1, 0, 0],
            convective: Some(ConvectiveSubset {
                npix: 1,
                rainrate: Some(9.0),
                dbz_height: [Some(7.0), None, None, None],
            }),
            stratiform: Some(StratiformSubset {
                npix: npix - 1,
                rainrate: Some(2.0),
            }),
        }
    }

    #[test]
    fn fresh_table_is_all_fill() {
        let table = ResultsTable::new(3, 4);

        assert_eq!(table.ntracks(), 3);
        assert_eq!(table.ntimes(), 4);
        assert!(table.npf.iter().all(|&v| v == FILL_VALUE));
        assert!(table.pf_npix.iter().all(|&v| v == FILL_VALUE));
        assert!(table.core_npix.iter().all(|&v| v == FILL_VALUE));
        assert!(table.cc_rainrate.iter().all(|&v| v == FILL_VALUE));
    }

    #[test]
    fn surplus_cores_are_truncated_largest_first() {
        let mut table = ResultsTable::new(1, 1);

        let cores: Vec<CoreStats> = (1..=25).map(core_of).collect();
        table.store_cores(0, 0, &cores);

        // True count survives truncation.
        assert_eq!(table.ncores[(0, 0)], 25.0);

        // Slots hold the largest cores in descending order.
        assert_eq!(table.core_npix[(0, 0, 0)], 25.0);
        assert_eq!(table.core_npix[(0, 0, 1)], 24.0);
        assert_eq!(table.core_npix[(0, 0, MAX_CORE_SLOTS - 1)], 6.0);

        assert_eq!(table.core_lat[(0, 0, 0)], 35.0);
        assert_eq!(table.core_max_dbz_height[0][(0, 0, 0)], 8.0);
        assert_eq!(table.core_max_dbz_height[1][(0, 0, 0)], FILL_VALUE);
    }

    #[test]
    fn surplus_features_are_truncated_and_aggregated_over_stored() {
        let mut table = ResultsTable::new(1, 2);

        let found = SceneFeatures {
            candidate_count: 7,
            features: (2..=8).map(pf_of).collect(),
        };
        table.store_features(0, 1, &found);

        assert_eq!(table.npf[(0, 1)], 7.0);

        assert_eq!(table.pf_npix[(0, 1, 0)], 8.0);
        assert_eq!(table.pf_npix[(0, 1, 4)], 4.0);
        assert_eq!(table.pf_rainrate[(0, 1, 0)], 4.0);
        assert_eq!(table.pf_minor_axis[(0, 1, 0)], 1.5);
        assert_eq!(table.pf_dbz_area_npix[0][(0, 1, 0)], 1.0);

        // One convective cell per stored feature, five stored.
        assert_eq!(table.cc_npix[(0, 1)], 5.0);
        assert_eq!(table.cc_rainrate[(0, 1)], 9.0);
        assert_eq!(table.cc_dbz_height[0][(0, 1)], 7.0);
        assert_eq!(table.cc_dbz_height[1][(0, 1)], FILL_VALUE);

        // Stratiform totals cover the stored five: (8-1)+(7-1)+...+(4-1).
        assert_eq!(table.sf_npix[(0, 1)], 25.0);
        assert_eq!(table.sf_rainrate[(0, 1)], 2.0);

        // The other time column is untouched.
        assert_eq!(table.npf[(0, 0)], FILL_VALUE);
        assert_eq!(table.pf_npix[(0, 0, 0)], FILL_VALUE);
    }

    #[test]
    fn zero_counts_are_recorded_when_processed() {
        let mut table = ResultsTable::new(1, 1);

        table.store_cores(0, 0, &[]);
        table.store_features(
            0,
            0,
            &SceneFeatures {
                candidate_count: 0,
                features: Vec::new(),
            },
        );

        assert_eq!(table.ncores[(0, 0)], 0.0);
        assert_eq!(table.npf[(0, 0)], 0.0);

        // No stored features leaves every slot and aggregate at fill.
        assert_eq!(table.pf_npix[(0, 0, 0)], FILL_VALUE);
        assert_eq!(table.cc_npix[(0, 0)], FILL_VALUE);
        assert_eq!(table.sf_rainrate[(0, 0)], FILL_VALUE);
    }
}
