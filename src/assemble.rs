/*!
 * The track by time state machine that drives the whole analysis.
 *
 * For every valid time step of every track the assembler reconstructs the cloud footprint,
 * crops the analysis window, and hands the windowed grids to the core and feature
 * extractors. Every examined cell lands in exactly one terminal state, and the tally of
 * those states is the operator's picture of how much of a run produced data.
 */

use crate::{
    config::AnalysisParams,
    cores, features,
    footprint::CloudIndex,
    results::ResultsTable,
    scene::SceneProvider,
    track::TrackTable,
};
use chrono::Timelike;
use log::{info, warn};
use std::fmt::{self, Display};
use strum::EnumIter;

/// The terminal state of one examined track and time step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum CellState {
    /// The observation time failed the configured time alignment.
    Unaligned,
    /// An input for the time step was missing or unreadable.
    NoData,
    /// The focal cloud was absent from the cloud-id grid.
    NoCloudMatch,
    /// Statistics were computed and stored.
    Processed,
}

impl CellState {
    /// Get a string representing the name of the state.
    pub fn name(&self) -> &'static str {
        use CellState::*;

        match self {
            Unaligned => "unaligned",
            NoData => "no data",
            NoCloudMatch => "no cloud match",
            Processed => "processed",
        }
    }
}

impl Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name())
    }
}

/// Counts of how every examined track and time step terminated.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssemblySummary {
    pub unaligned: u64,
    pub no_data: u64,
    pub no_cloud_match: u64,
    pub processed: u64,
}

impl AssemblySummary {
    fn tally(&mut self, state: CellState) {
        use CellState::*;

        match state {
            Unaligned => self.unaligned += 1,
            NoData => self.no_data += 1,
            NoCloudMatch => self.no_cloud_match += 1,
            Processed => self.processed += 1,
        }
    }

    /// The count recorded for one state.
    pub fn count(&self, state: CellState) -> u64 {
        use CellState::*;

        match state {
            Unaligned => self.unaligned,
            NoData => self.no_data,
            NoCloudMatch => self.no_cloud_match,
            Processed => self.processed,
        }
    }

    /// Total number of examined track and time steps.
    pub fn total(&self) -> u64 {
        self.unaligned + self.no_data + self.no_cloud_match + self.processed
    }
}

/// Runs the full analysis over every track and valid time step.
#[derive(Debug)]
pub struct StatsAssembler<'a, P> {
    tracks: &'a TrackTable,
    provider: &'a P,
    params: AnalysisParams,
}

impl<'a, P: SceneProvider> StatsAssembler<'a, P> {
    pub fn new(tracks: &'a TrackTable, provider: &'a P, params: AnalysisParams) -> Self {
        StatsAssembler {
            tracks,
            provider,
            params,
        }
    }

    /// Compute statistics for every track and valid time step.
    ///
    /// Skips never abort the run. A time step that cannot be processed is logged, counted
    /// in the summary, and left at the fill value in the results.
    pub fn run(&self) -> (ResultsTable, AssemblySummary) {
        let mut results = ResultsTable::new(self.tracks.ntracks, self.tracks.ntimes);
        let mut summary = AssemblySummary::default();

        for track in 0..self.tracks.ntracks {
            let times = self.tracks.valid_times(track);
            info!(
                "processing track {} of {} with {} valid time steps",
                track + 1,
                self.tracks.ntracks,
                times.len()
            );

            for time in times {
                let state = self.process_cell(track, time, &mut results);
                summary.tally(state);
            }
        }

        (results, summary)
    }

    fn process_cell(&self, track: usize, time: usize, results: &mut ResultsTable) -> CellState {
        let when = match self.tracks.time_at(track, time) {
            Some(when) => when,
            None => {
                warn!("track {} step {} has an unusable base time", track + 1, time);
                return CellState::NoData;
            }
        };

        if !self.params.alignment.accepts(when.minute()) {
            warn!("track {} step {} at {} is not time aligned", track + 1, time, when);
            return CellState::Unaligned;
        }

        let scene = match self.provider.scene_at(when) {
            Ok(Some(scene)) => scene,
            Ok(None) => {
                warn!("track {} step {} at {} has no input data", track + 1, time, when);
                return CellState::NoData;
            }
            Err(err) => {
                warn!(
                    "track {} step {} at {} failed to load: {}",
                    track + 1,
                    time,
                    when,
                    err
                );
                return CellState::NoData;
            }
        };

        let focal = self.tracks.cloud_number[(track, time)];
        if focal <= 0.0 {
            warn!("track {} step {} names no cloud", track + 1, time);
            return CellState::NoCloudMatch;
        }
        let focal = focal as u32;

        let index = CloudIndex::build(&scene.cloud.cloud_number);
        let mergers = self.tracks.merge_partners(track, time);
        let splitters = self.tracks.split_partners(track, time);

        let footprint =
            match index.footprint(focal, &mergers, &splitters, self.params.window_margin) {
                Some(footprint) => footprint,
                None => {
                    warn!(
                        "track {} step {} cloud {} is absent from the cloud-id grid",
                        track + 1,
                        time,
                        focal
                    );
                    return CellState::NoCloudMatch;
                }
            };

        let windowed = scene.window_around(&footprint);

        results.store_coverage(track, time, windowed.coverage_fraction());
        results.store_cores(track, time, &cores::extract_cores(&windowed));
        results.store_features(
            track,
            time,
            &features::extract_features(&windowed, self.params.rr_min),
        );

        CellState::Processed
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn summary_tallies_every_state() {
        let mut summary = AssemblySummary::default();

        summary.tally(CellState::Processed);
        summary.tally(CellState::Processed);
        summary.tally(CellState::Unaligned);
        summary.tally(CellState::NoData);

        assert_eq!(summary.count(CellState::Processed), 2);
        assert_eq!(summary.count(CellState::Unaligned), 1);
        assert_eq!(summary.count(CellState::NoData), 1);
        assert_eq!(summary.count(CellState::NoCloudMatch), 0);
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn states_have_distinct_names() {
        let names: Vec<&str> = CellState::iter().map(|state| state.name()).collect();

        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();

        assert_eq!(names.len(), deduped.len());
    }
}
