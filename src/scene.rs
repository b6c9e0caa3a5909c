/*!
 * Per time step input data and the providers that supply it.
 *
 * A scene bundles the cloud identification grids and the radar grids for one accepted time
 * step, checked once for co-registration when it is assembled. The statistics pipeline never
 * touches files itself, it asks a [SceneProvider] for scenes so the same engine runs against
 * netCDF inputs in production and against in-memory grids in tests.
 */

use crate::{
    error::TrackPfError,
    footprint::Footprint,
    grid::{check_co_registered, GridWindow},
    McspfResult, FILL_VALUE,
};
use chrono::{DateTime, Utc};
use log::debug;
use ndarray::Array2;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap as HashMap;
use std::path::Path;

/// Echo top height thresholds carried by each radar file, in dBZ.
pub const DBZ_THRESHOLDS: [u32; 6] = [10, 20, 30, 40, 45, 50];

static DBZ_HEIGHT_VARS: Lazy<[String; 6]> =
    Lazy::new(|| DBZ_THRESHOLDS.map(|t| format!("dbz{}_height", t)));

/// The cloud identification grids for one time step.
#[derive(Debug, Clone)]
pub struct CloudIdScene {
    /// Latitude of each grid cell.
    pub lat: Array2<f64>,
    /// Longitude of each grid cell.
    pub lon: Array2<f64>,
    /// Brightness temperature.
    pub tb: Array2<f64>,
    /// Cloud identifier per cell, zero where no cloud was identified.
    pub cloud_number: Array2<f64>,
}

/// The radar derived grids for one time step.
#[derive(Debug, Clone)]
pub struct RadarScene {
    /// Latitude of each grid cell.
    pub lat: Array2<f64>,
    /// Longitude of each grid cell.
    pub lon: Array2<f64>,
    /// Composite reflectivity.
    pub dbz: Array2<f64>,
    /// Echo top heights, one grid per entry of [DBZ_THRESHOLDS].
    pub dbz_heights: [Array2<f64>; 6],
    /// Categorical precipitation classification.
    pub csa: Array2<f64>,
    /// Rain rate in mm/hr.
    pub rainrate: Array2<f64>,
    /// Data quality mask, 1 where the radar mosaic has good data and 0 where it has none.
    pub quality: Array2<f64>,
    /// Grid spacing in the x direction, kilometers.
    pub x_spacing: f64,
    /// Grid spacing in the y direction, kilometers.
    pub y_spacing: f64,
}

/// All input grids for one accepted time step, co-registered on one domain.
#[derive(Debug, Clone)]
pub struct Scene {
    pub cloud: CloudIdScene,
    pub radar: RadarScene,
    /// Rain accumulation, an all fill grid when the optional companion file was absent.
    pub accumulation: Array2<f64>,
}

impl Scene {
    /// Bundle the grids for one time step, checking co-registration once.
    ///
    /// A missing accumulation grid is substituted with an all fill grid of the shared
    /// domain shape.
    pub fn new(
        cloud: CloudIdScene,
        radar: RadarScene,
        accumulation: Option<Array2<f64>>,
    ) -> McspfResult<Self> {
        let domain = cloud.cloud_number.dim();
        let accumulation =
            accumulation.unwrap_or_else(|| Array2::from_elem(domain, FILL_VALUE));

        let mut shapes = vec![
            cloud.lat.dim(),
            cloud.lon.dim(),
            cloud.tb.dim(),
            cloud.cloud_number.dim(),
            radar.lat.dim(),
            radar.lon.dim(),
            radar.dbz.dim(),
            radar.csa.dim(),
            radar.rainrate.dim(),
            radar.quality.dim(),
            accumulation.dim(),
        ];
        for grid in &radar.dbz_heights {
            shapes.push(grid.dim());
        }
        check_co_registered(&shapes)?;

        Ok(Scene {
            cloud,
            radar,
            accumulation,
        })
    }

    /// The shared grid shape.
    pub fn domain(&self) -> (usize, usize) {
        self.cloud.cloud_number.dim()
    }

    /// Crop the radar fields to a footprint's analysis window.
    ///
    /// Radar data outside the footprint is replaced with fill, and the category grid with
    /// the background class, so region statistics only ever see the tracked system. The
    /// latitude, longitude, and quality grids keep their full window content.
    pub fn window_around(&self, footprint: &Footprint) -> WindowedScene {
        let win = footprint.window;
        let cells = &footprint.cells;

        WindowedScene {
            window: win,
            csa: win.crop_keeping(&self.radar.csa, cells, 0.0),
            rainrate: win.crop_keeping(&self.radar.rainrate, cells, FILL_VALUE),
            dbz: win.crop_keeping(&self.radar.dbz, cells, FILL_VALUE),
            dbz_heights: std::array::from_fn(|i| {
                win.crop_keeping(&self.radar.dbz_heights[i], cells, FILL_VALUE)
            }),
            lat: win.crop(&self.radar.lat),
            lon: win.crop(&self.radar.lon),
            quality: win.crop(&self.radar.quality),
        }
    }
}

/// The footprint filtered radar fields cropped to one analysis window.
#[derive(Debug, Clone)]
pub struct WindowedScene {
    /// Where the window sits in the full domain.
    pub window: GridWindow,
    /// Categorical classification, 0 outside the footprint.
    pub csa: Array2<f64>,
    /// Rain rate, fill outside the footprint.
    pub rainrate: Array2<f64>,
    /// Composite reflectivity, fill outside the footprint.
    pub dbz: Array2<f64>,
    /// Echo top heights per threshold, fill outside the footprint.
    pub dbz_heights: [Array2<f64>; 6],
    /// Latitude, full window content.
    pub lat: Array2<f64>,
    /// Longitude, full window content.
    pub lon: Array2<f64>,
    /// Radar quality mask, full window content.
    pub quality: Array2<f64>,
}

impl WindowedScene {
    /// Fraction of the window covered by good radar data.
    ///
    /// Counts cells flagged good (1) against cells flagged bad (0). Cells with any other
    /// flag belong to neither count, and a window with no flagged cells at all has no
    /// defined coverage.
    pub fn coverage_fraction(&self) -> Option<f64> {
        let mut good = 0usize;
        let mut bad = 0usize;

        for &q in self.quality.iter() {
            if q == 1.0 {
                good += 1;
            } else if q == 0.0 {
                bad += 1;
            }
        }

        if good + bad > 0 {
            Some(good as f64 / (good + bad) as f64)
        } else {
            None
        }
    }
}

/// Source of co-registered scenes for the assembler.
pub trait SceneProvider {
    /// Load the scene for one accepted time step.
    ///
    /// `Ok(None)` means a required input for that time step does not exist, which the
    /// assembler records as a skipped cell rather than an error.
    fn scene_at(&self, time: DateTime<Utc>) -> McspfResult<Option<Scene>>;
}

/// Scenes held in memory, keyed by time step.
///
/// This is how the integration tests drive the assembler without touching the filesystem,
/// and it doubles as a cache for library callers that already hold their grids.
#[derive(Debug, Clone, Default)]
pub struct MemoryScenes {
    scenes: HashMap<i64, Scene>,
}

impl MemoryScenes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the scene for a time step, replacing any previous one.
    pub fn add(&mut self, time: DateTime<Utc>, scene: Scene) {
        self.scenes.insert(time.timestamp(), scene);
    }
}

impl SceneProvider for MemoryScenes {
    fn scene_at(&self, time: DateTime<Utc>) -> McspfResult<Option<Scene>> {
        Ok(self.scenes.get(&time.timestamp()).cloned())
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                      NetCDF Loading
 *-----------------------------------------------------------------------------------------------*/

/// Load the cloud identification grids from a cloud-id file.
pub fn load_cloudid(path: &Path) -> McspfResult<CloudIdScene> {
    debug!("loading cloud-id grids from {}", path.display());
    let file = netcdf::open(path)?;

    Ok(CloudIdScene {
        lat: grid_from_var(&require_variable(&file, "latitude")?)?,
        lon: grid_from_var(&require_variable(&file, "longitude")?)?,
        tb: grid_from_var(&require_variable(&file, "tb")?)?,
        cloud_number: grid_from_var(&require_variable(&file, "cloudnumber")?)?,
    })
}

/// Load the radar grids from a radar classification file.
pub fn load_radar(path: &Path) -> McspfResult<RadarScene> {
    debug!("loading radar grids from {}", path.display());
    let file = netcdf::open(path)?;

    let mut dbz_heights: Vec<Array2<f64>> = Vec::with_capacity(DBZ_HEIGHT_VARS.len());
    for name in DBZ_HEIGHT_VARS.iter() {
        let var = file
            .variable(name)
            .ok_or_else(|| format!("missing required variable {}", name))?;
        dbz_heights.push(grid_from_var(&var)?);
    }
    let dbz_heights: [Array2<f64>; 6] = match dbz_heights.try_into() {
        Ok(heights) => heights,
        Err(_) => {
            return Err(TrackPfError {
                msg: "wrong number of echo top height grids",
            }
            .into())
        }
    };

    Ok(RadarScene {
        lat: grid_from_var(&require_variable(&file, "lat2d")?)?,
        lon: grid_from_var(&require_variable(&file, "lon2d")?)?,
        dbz: grid_from_var(&require_variable(&file, "dbz_convsf")?)?,
        dbz_heights,
        csa: grid_from_var(&require_variable(&file, "csa")?)?,
        rainrate: grid_from_var(&require_variable(&file, "rainrate")?)?,
        quality: grid_from_var(&require_variable(&file, "mask")?)?,
        x_spacing: scalar_from_var(&require_variable(&file, "x_spacing")?)?,
        y_spacing: scalar_from_var(&require_variable(&file, "y_spacing")?)?,
    })
}

/// Load the rain accumulation grid from its companion file.
pub fn load_accumulation(path: &Path) -> McspfResult<Array2<f64>> {
    debug!("loading rain accumulation from {}", path.display());
    let file = netcdf::open(path)?;
    grid_from_var(&require_variable(&file, "precipitation")?)
}

pub(crate) fn require_variable<'f>(
    file: &'f netcdf::File,
    name: &str,
) -> McspfResult<netcdf::Variable<'f>> {
    file.variable(name)
        .ok_or_else(|| format!("missing required variable {}", name).into())
}

/// Read a 2-D grid, tolerating a leading singleton time dimension.
///
/// Values equal to the variable's own fill value are rewritten to the shared sentinel so
/// every grid in the system speaks one fill convention.
pub(crate) fn grid_from_var(var: &netcdf::Variable) -> McspfResult<Array2<f64>> {
    let dims = var.dimensions();

    let (nrows, ncols) = match dims.len() {
        2 => (dims[0].len(), dims[1].len()),
        3 if dims[0].len() == 1 => (dims[1].len(), dims[2].len()),
        _ => {
            return Err(TrackPfError {
                msg: "grid variable is not 2-D",
            }
            .into())
        }
    };

    let mut values = var.get_values::<f64, _>(..)?;

    if let Some(file_fill) = var.fill_value::<f64>()? {
        if file_fill != FILL_VALUE {
            for v in values.iter_mut() {
                if *v == file_fill {
                    *v = FILL_VALUE;
                }
            }
        }
    }

    Ok(Array2::from_shape_vec((nrows, ncols), values)?)
}

pub(crate) fn scalar_from_var(var: &netcdf::Variable) -> McspfResult<f64> {
    let values = var.get_values::<f64, _>(..)?;

    values.first().copied().ok_or_else(|| {
        TrackPfError {
            msg: "scalar variable holds no data",
        }
        .into()
    })
}
