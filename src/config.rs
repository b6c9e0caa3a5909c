/*! Constants and tunable parameters for the precipitation feature analysis. */

use static_assertions::const_assert;

/// Maximum number of precipitation features remembered per track and time.
pub const MAX_PF_SLOTS: usize = 5;

/// Maximum number of convective cores remembered per track and time.
pub const MAX_CORE_SLOTS: usize = 20;

// The output catalog assumes at least one slot of each kind.
const_assert!(MAX_PF_SLOTS > 0);
const_assert!(MAX_CORE_SLOTS > 0);

/// Category code for stratiform rain in the radar classification grid.
pub const CSA_STRATIFORM: f64 = 5.0;

/// Category code for convective rain in the radar classification grid.
pub const CSA_CONVECTIVE: f64 = 6.0;

/// Which time steps of a track are accepted for radar matching.
///
/// The radar mosaics are produced on the hour, so by default only track times
/// that fall within the first ten minutes of an hour are matched. Tracks built
/// from higher rate imagery can request every time step instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeAlignment {
    /// Accept minutes 00 through 09 of each hour.
    TopOfHour,
    /// Accept every time step.
    Every,
}

impl TimeAlignment {
    /// Does a time step with this minute of the hour pass the filter?
    pub fn accepts(self, minute: u32) -> bool {
        match self {
            TimeAlignment::TopOfHour => minute < 10,
            TimeAlignment::Every => true,
        }
    }
}

/// The scientific knobs for one analysis run.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisParams {
    /// Radar pixel size in kilometers. Pixel counts scale to areas with the square of this.
    pub pixel_radius_km: f64,
    /// Minimum rain rate in mm/hr for a cell to seed a precipitation feature.
    pub rr_min: f64,
    /// Cells of padding added around a footprint bounding box to form the analysis window.
    pub window_margin: usize,
    /// Which time steps are matched against radar data.
    pub alignment: TimeAlignment,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            pixel_radius_km: 10.0,
            rr_min: 1.0,
            window_margin: 10,
            alignment: TimeAlignment::TopOfHour,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn top_of_hour_accepts_first_ten_minutes() {
        let ta = TimeAlignment::TopOfHour;

        for minute in 0..10 {
            assert!(ta.accepts(minute));
        }

        for minute in 10..60 {
            assert!(!ta.accepts(minute));
        }

        for minute in 0..60 {
            assert!(TimeAlignment::Every.accepts(minute));
        }
    }
}
