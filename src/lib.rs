pub use assemble::{AssemblySummary, CellState, StatsAssembler};
pub use config::{AnalysisParams, TimeAlignment, MAX_CORE_SLOTS, MAX_PF_SLOTS};
pub use cores::{extract_cores, CoreStats};
pub use error::{CoRegistrationError, TrackPfError};
pub use features::{
    extract_features, ConvectiveSubset, PfStats, SceneFeatures, StratiformSubset, SystemAggregates,
};
pub use footprint::{CloudIndex, Footprint};
pub use grid::GridWindow;
pub use output::{write_statistics_file, OutputMeta};
pub use region::RegionShape;
pub use results::ResultsTable;
pub use scene::{
    load_accumulation, load_cloudid, load_radar, CloudIdScene, MemoryScenes, RadarScene, Scene,
    SceneProvider, WindowedScene, DBZ_THRESHOLDS,
};
pub use track::{TrackFileAttrs, TrackTable};

/// A general purpose result type for the crate.
pub type McspfResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync + 'static>>;

/// The sentinel marking "not computed / not applicable" in all output arrays.
pub const FILL_VALUE: f64 = -9999.0;

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod assemble;
mod config;
mod cores;
mod error;
mod features;
mod footprint;
mod grid;
mod label;
mod output;
mod rank;
mod region;
mod results;
mod scene;
mod track;
