/*!
 * Writer for the precipitation statistics artifact.
 *
 * One netCDF file per run holds the track metadata copied through from the track
 * statistics input plus every computed statistic, dimensioned track by time by slot.
 * Pixel counts that represent areas are converted to km^2 on the way out; a fill value
 * is never converted, it crosses into the artifact exactly as the sentinel.
 */

use crate::{
    config::{AnalysisParams, MAX_CORE_SLOTS, MAX_PF_SLOTS},
    error::TrackPfError,
    results::ResultsTable,
    scene::DBZ_THRESHOLDS,
    track::TrackTable,
    McspfResult, FILL_VALUE,
};
use chrono::Utc;
use log::info;
use ndarray::{Array, Array2, Array3, Dimension};
use std::path::Path;

const STATUS_VALUES: &str = "-9999 = missing cloud or cloud removed due to short track, \
                             0 = track ends here, 1 = cloud continues as one cloud in next file, \
                             2 = biggest cloud in merger, 21 = smaller cloud(s) in merger, \
                             13 = cloud that splits, \
                             3 = biggest cloud from a split that stops after the split, \
                             31 = smaller cloud(s) from a split that stop after the split. \
                             The last seven classifications are added together in different \
                             combinations to describe situations.";

const CLOUD_NUMBER_USAGE: &str = "to link this tracking statistics file with pixel-level \
                                  cloudid files, use the cloudidfile and cloudnumber together \
                                  to identify which cloud this current track and time is \
                                  associated with";

/// Run identification stamped into the artifact's global attributes.
#[derive(Debug, Clone)]
pub struct OutputMeta {
    /// Name of the radar data source, also part of the output file name.
    pub radar_source: String,
    /// First date of the run in yyyymmdd form.
    pub startdate: String,
    /// Last date of the run in yyyymmdd form.
    pub enddate: String,
}

/// Write the full statistics artifact for one run.
pub fn write_statistics_file(
    path: &Path,
    tracks: &TrackTable,
    results: &ResultsTable,
    meta: &OutputMeta,
    params: &AnalysisParams,
) -> McspfResult<()> {
    if results.ntracks() != tracks.ntracks || results.ntimes() != tracks.ntimes {
        return Err(TrackPfError {
            msg: "results do not match the track table shape",
        }
        .into());
    }

    info!("writing statistics file {}", path.display());

    let mut file = netcdf::create(path)?;

    file.add_unlimited_dimension("track")?;
    file.add_dimension("time", tracks.ntimes)?;
    file.add_dimension("pfs", MAX_PF_SLOTS)?;
    file.add_dimension("cores", MAX_CORE_SLOTS)?;
    file.add_dimension("mergesplit", tracks.nmergers)?;

    file.add_attribute(
        "title",
        "File containing ir and precipitation statistics for each track",
    )?;
    file.add_attribute("source1", tracks.attrs.source.as_str())?;
    file.add_attribute("source2", meta.radar_source.as_str())?;
    file.add_attribute("description", tracks.attrs.description.as_str())?;
    file.add_attribute("startdate", meta.startdate.as_str())?;
    file.add_attribute("enddate", meta.enddate.as_str())?;
    file.add_attribute("_FillValue", (FILL_VALUE as i64).to_string().as_str())?;
    file.add_attribute(
        "time_resolution_hour",
        tracks.attrs.time_resolution_hour.as_str(),
    )?;
    file.add_attribute("mergdir_pixel_radius", params.pixel_radius_km)?;
    file.add_attribute("MCS_IR_area_thresh_km2", tracks.attrs.area_thresh_km2.as_str())?;
    file.add_attribute(
        "MCS_IR_duration_thresh_hr",
        tracks.attrs.duration_thresh_hr.as_str(),
    )?;
    file.add_attribute(
        "MCS_IR_eccentricity_thres",
        tracks.attrs.eccentricity_thresh.as_str(),
    )?;
    file.add_attribute("max_number_pfs", MAX_PF_SLOTS.to_string().as_str())?;
    file.add_attribute("created_on", Utc::now().to_rfc3339().as_str())?;

    put_coordinate(
        &mut file,
        "track",
        1,
        tracks.ntracks,
        "Total number of tracked features",
    )?;
    put_coordinate(
        &mut file,
        "time",
        0,
        tracks.ntimes,
        "Maximum number of features in a given track",
    )?;
    put_coordinate(
        &mut file,
        "pfs",
        0,
        MAX_PF_SLOTS,
        "Maximum number of precipitation features in one cloud feature",
    )?;
    put_coordinate(
        &mut file,
        "cores",
        0,
        MAX_CORE_SLOTS,
        "Maximum number of convective cores in a precipitation feature at one time",
    )?;
    put_coordinate(
        &mut file,
        "mergesplit",
        0,
        tracks.nmergers,
        "Maximum number of mergers / splits at one time",
    )?;

    write_inherited(&mut file, tracks)?;
    write_computed(&mut file, results, params)?;

    Ok(())
}

/// Track metadata copied through from the track statistics input, unchanged.
fn write_inherited(file: &mut netcdf::FileMut, tracks: &TrackTable) -> McspfResult<()> {
    let time_units = "temporal resolution of the original data";

    put_track(
        file,
        "mcs_length",
        &tracks.mcs_length,
        VarAttrs::new("Length of each MCS in each track", time_units),
    )?;
    put_track(
        file,
        "length",
        &tracks.track_length,
        VarAttrs::new("Length of track containing each MCS", time_units),
    )?;
    put_track(
        file,
        "mcs_type",
        &tracks.mcs_type,
        VarAttrs::new("Type of MCS", "unitless").values("1 = MCS, 2 = Squall line"),
    )?;
    put_grid(
        file,
        "status",
        &tracks.status,
        VarAttrs::new("Flag indicating the status of each feature in MCS", "unitless")
            .values(STATUS_VALUES)
            .range(0.0, 52.0),
    )?;
    put_track(
        file,
        "startstatus",
        &tracks.start_status,
        VarAttrs::new(
            "Flag indicating the status of the first feature in each MCS track",
            "unitless",
        )
        .values(STATUS_VALUES)
        .range(0.0, 52.0),
    )?;
    put_track(
        file,
        "endstatus",
        &tracks.end_status,
        VarAttrs::new(
            "Flag indicating the status of the last feature in each MCS track",
            "unitless",
        )
        .values(STATUS_VALUES)
        .range(0.0, 52.0),
    )?;
    put_track(
        file,
        "interruptions",
        &tracks.interruptions,
        VarAttrs::new("Flag indicating if the track is incomplete", "unitless")
            .values(
                "0 = full track available, good data. \
                 1 = track starts at first file, track cut short by data availability. \
                 2 = track ends at last file, track cut short by data availability",
            )
            .range(0.0, 2.0),
    )?;
    put_track(
        file,
        "boundary",
        &tracks.boundary,
        VarAttrs::new(
            "Flag indicating whether the core + cold anvil touches one of the domain edges",
            "unitless",
        )
        .values("0 = away from edge. 1 = touches edge.")
        .range(0.0, 1.0),
    )?;
    put_grid(
        file,
        "basetime",
        &tracks.basetime,
        VarAttrs::new(
            "basetime of cloud at the given time",
            "seconds since 01/01/1970 00:00",
        )
        .standard("time"),
    )?;
    put_grid(
        file,
        "meanlat",
        &tracks.mean_lat,
        VarAttrs::new(
            "mean latitude of the core + cold anvil for each feature at the given time",
            "degrees",
        )
        .standard("latitude")
        .range(-90.0, 90.0),
    )?;
    put_grid(
        file,
        "meanlon",
        &tracks.mean_lon,
        VarAttrs::new(
            "mean longitude of the core + cold anvil for each feature at the given time",
            "degrees",
        )
        .standard("longitude")
        .range(-180.0, 180.0),
    )?;
    put_grid(
        file,
        "core_area",
        &tracks.core_area,
        VarAttrs::new("area of the cold core at the given time", "km^2"),
    )?;
    put_grid(
        file,
        "ccs_area",
        &tracks.ccs_area,
        VarAttrs::new("area of the cold core and cold anvil at the given time", "km^2"),
    )?;
    put_grid(
        file,
        "cloudnumber",
        &tracks.cloud_number,
        VarAttrs::new(
            "cloud number in the corresponding cloudid file of clouds in the mcs",
            "unitless",
        )
        .usage(CLOUD_NUMBER_USAGE),
    )?;
    put_cube(
        file,
        "mergecloudnumber",
        "mergesplit",
        &tracks.merge_cloud_number,
        VarAttrs::new(
            "cloud number of small, short-lived clouds merging into the MCS",
            "unitless",
        )
        .usage(CLOUD_NUMBER_USAGE),
    )?;
    put_cube(
        file,
        "splitcloudnumber",
        "mergesplit",
        &tracks.split_cloud_number,
        VarAttrs::new(
            "cloud number of small, short-lived clouds splitting from the MCS",
            "unitless",
        )
        .usage(CLOUD_NUMBER_USAGE),
    )?;

    Ok(())
}

/// Everything this crate computed, with pixel counts converted to areas.
fn write_computed(
    file: &mut netcdf::FileMut,
    results: &ResultsTable,
    params: &AnalysisParams,
) -> McspfResult<()> {
    let radius = params.pixel_radius_km;

    put_grid(
        file,
        "nmq_frac",
        &results.coverage,
        VarAttrs::new(
            "fraction of the analysis window covered by good radar data",
            "unitless",
        )
        .range(0.0, 1.0),
    )?;
    put_grid(
        file,
        "npf",
        &results.npf,
        VarAttrs::new("number of precipitation features at a given time", "unitless"),
    )?;
    put_cube(
        file,
        "pf_area",
        "pfs",
        &scaled_area(&results.pf_npix, radius),
        VarAttrs::new(
            "area of each precipitation feature at a given time",
            "km^2",
        ),
    )?;
    put_cube(
        file,
        "pf_lon",
        "pfs",
        &results.pf_lon,
        VarAttrs::new(
            "mean longitude of each precipitation feature at a given time",
            "degrees",
        )
        .standard("longitude"),
    )?;
    put_cube(
        file,
        "pf_lat",
        "pfs",
        &results.pf_lat,
        VarAttrs::new(
            "mean latitude of each precipitation feature at a given time",
            "degrees",
        )
        .standard("latitude"),
    )?;
    put_cube(
        file,
        "pf_rainrate",
        "pfs",
        &results.pf_rainrate,
        VarAttrs::new(
            "mean rain rate of each precipitation feature at a given time",
            "mm/hr",
        ),
    )?;
    put_cube(
        file,
        "pf_skewness",
        "pfs",
        &results.pf_skewness,
        VarAttrs::new(
            "rain rate skewness of each precipitation feature at a given time",
            "unitless",
        ),
    )?;
    put_cube(
        file,
        "pf_majoraxislength",
        "pfs",
        &results.pf_major_axis,
        VarAttrs::new(
            "major axis length of each precipitation feature at a given time",
            "pixels",
        ),
    )?;
    put_cube(
        file,
        "pf_minoraxislength",
        "pfs",
        &results.pf_minor_axis,
        VarAttrs::new(
            "minor axis length of each precipitation feature at a given time",
            "pixels",
        ),
    )?;
    put_cube(
        file,
        "pf_aspectratio",
        "pfs",
        &results.pf_aspect_ratio,
        VarAttrs::new(
            "aspect ratio (major axis / minor axis) of each precipitation feature at a given time",
            "unitless",
        ),
    )?;
    put_cube(
        file,
        "pf_eccentricity",
        "pfs",
        &results.pf_eccentricity,
        VarAttrs::new(
            "eccentricity of each precipitation feature at a given time",
            "unitless",
        )
        .range(0.0, 1.0),
    )?;
    put_cube(
        file,
        "pf_orientation",
        "pfs",
        &results.pf_orientation,
        VarAttrs::new(
            "orientation of the major axis of each precipitation feature at a given time",
            "degrees clockwise from vertical",
        )
        .range(0.0, 360.0),
    )?;

    for (i, threshold) in DBZ_THRESHOLDS[3..].iter().enumerate() {
        let name = format!("pf_dbz{}area", threshold);
        let long_name = format!(
            "area of the precipitation feature with column maximum reflectivity >= {} dBZ at a given time",
            threshold
        );
        put_cube(
            file,
            &name,
            "pfs",
            &scaled_area(&results.pf_dbz_area_npix[i], radius),
            VarAttrs::new(&long_name, "km^2"),
        )?;
    }

    put_grid(
        file,
        "pf_ccrainrate",
        &results.cc_rainrate,
        VarAttrs::new(
            "mean rain rate of the convective parts of the largest precipitation features at a given time",
            "mm/hr",
        ),
    )?;
    put_grid(
        file,
        "pf_sfrainrate",
        &results.sf_rainrate,
        VarAttrs::new(
            "mean rain rate of the stratiform parts of the largest precipitation features at a given time",
            "mm/hr",
        ),
    )?;
    put_grid(
        file,
        "pf_ccarea",
        &scaled_area(&results.cc_npix, radius),
        VarAttrs::new(
            "total convective area of the largest precipitation features at a given time",
            "km^2",
        ),
    )?;
    put_grid(
        file,
        "pf_sfarea",
        &scaled_area(&results.sf_npix, radius),
        VarAttrs::new(
            "total stratiform area of the largest precipitation features at a given time",
            "km^2",
        ),
    )?;

    for (i, threshold) in DBZ_THRESHOLDS[..4].iter().enumerate() {
        let name = format!("pf_ccdbz{}", threshold);
        let long_name = format!(
            "mean {} dBZ echo top height of the convective parts of the largest precipitation features at a given time",
            threshold
        );
        put_grid(file, &name, &results.cc_dbz_height[i], VarAttrs::new(&long_name, "km"))?;
    }

    put_grid(
        file,
        "pf_ncores",
        &results.ncores,
        VarAttrs::new("number of convective cores at a given time", "unitless"),
    )?;
    put_cube(
        file,
        "pf_corelon",
        "cores",
        &results.core_lon,
        VarAttrs::new(
            "mean longitude of each convective core at the given time",
            "degrees",
        )
        .standard("longitude"),
    )?;
    put_cube(
        file,
        "pf_corelat",
        "cores",
        &results.core_lat,
        VarAttrs::new(
            "mean latitude of each convective core at the given time",
            "degrees",
        )
        .standard("latitude"),
    )?;
    put_cube(
        file,
        "pf_corearea",
        "cores",
        &scaled_area(&results.core_npix, radius),
        VarAttrs::new("area of each convective core at the given time", "km^2"),
    )?;
    put_cube(
        file,
        "pf_coremajoraxislength",
        "cores",
        &results.core_major_axis,
        VarAttrs::new(
            "major axis length of each convective core at a given time",
            "pixels",
        ),
    )?;
    put_cube(
        file,
        "pf_coreminoraxislength",
        "cores",
        &results.core_minor_axis,
        VarAttrs::new(
            "minor axis length of each convective core at a given time",
            "pixels",
        ),
    )?;
    put_cube(
        file,
        "pf_coreaspectratio",
        "cores",
        &results.core_aspect_ratio,
        VarAttrs::new(
            "aspect ratio (major axis / minor axis) of each convective core at a given time",
            "unitless",
        ),
    )?;
    put_cube(
        file,
        "pf_coreeccentricity",
        "cores",
        &results.core_eccentricity,
        VarAttrs::new(
            "eccentricity of each convective core at a given time",
            "unitless",
        )
        .range(0.0, 1.0),
    )?;
    put_cube(
        file,
        "pf_coreorientation",
        "cores",
        &results.core_orientation,
        VarAttrs::new(
            "orientation of the major axis of each convective core at a given time",
            "degrees clockwise from vertical",
        )
        .range(0.0, 360.0),
    )?;

    for (i, threshold) in DBZ_THRESHOLDS[..4].iter().enumerate() {
        let name = format!("pf_coremaxdbz{}", threshold);
        let long_name = format!(
            "maximum {} dBZ echo top height in each convective core at a given time",
            threshold
        );
        put_cube(
            file,
            &name,
            "cores",
            &results.core_max_dbz_height[i],
            VarAttrs::new(&long_name, "km"),
        )?;
    }

    for (i, threshold) in DBZ_THRESHOLDS[..4].iter().enumerate() {
        let name = format!("pf_coreavgdbz{}", threshold);
        let long_name = format!(
            "mean {} dBZ echo top height in each convective core at a given time",
            threshold
        );
        put_cube(
            file,
            &name,
            "cores",
            &results.core_avg_dbz_height[i],
            VarAttrs::new(&long_name, "km"),
        )?;
    }

    Ok(())
}

/// Descriptive attributes shared by every data variable.
#[derive(Debug, Clone, Copy)]
struct VarAttrs<'a> {
    long_name: &'a str,
    units: &'a str,
    standard_name: Option<&'a str>,
    values: Option<&'a str>,
    usage: Option<&'a str>,
    range: Option<(f64, f64)>,
}

impl<'a> VarAttrs<'a> {
    fn new(long_name: &'a str, units: &'a str) -> Self {
        VarAttrs {
            long_name,
            units,
            standard_name: None,
            values: None,
            usage: None,
            range: None,
        }
    }

    fn standard(mut self, name: &'a str) -> Self {
        self.standard_name = Some(name);
        self
    }

    fn values(mut self, values: &'a str) -> Self {
        self.values = Some(values);
        self
    }

    fn usage(mut self, usage: &'a str) -> Self {
        self.usage = Some(usage);
        self
    }

    fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

fn put_attrs(var: &mut netcdf::VariableMut, attrs: &VarAttrs) -> McspfResult<()> {
    if let Some(standard_name) = attrs.standard_name {
        var.put_attribute("standard_name", standard_name)?;
    }
    var.put_attribute("long_name", attrs.long_name)?;
    if let Some(values) = attrs.values {
        var.put_attribute("values", values)?;
    }
    if let Some(usage) = attrs.usage {
        var.put_attribute("usage", usage)?;
    }
    if let Some((min, max)) = attrs.range {
        var.put_attribute("min_value", min)?;
        var.put_attribute("max_value", max)?;
    }
    var.put_attribute("units", attrs.units)?;

    Ok(())
}

fn put_coordinate(
    file: &mut netcdf::FileMut,
    name: &str,
    start: usize,
    len: usize,
    long_name: &str,
) -> McspfResult<()> {
    let mut var = file.add_variable::<f64>(name, &[name])?;
    var.put_attribute("long_name", long_name)?;
    var.put_attribute("units", "unitless")?;

    let values: Vec<f64> = (0..len).map(|i| (start + i) as f64).collect();
    var.put_values(&values, (&[0], &[len]))?;

    Ok(())
}

fn put_track(
    file: &mut netcdf::FileMut,
    name: &str,
    data: &[f64],
    attrs: VarAttrs,
) -> McspfResult<()> {
    let mut var = file.add_variable::<f64>(name, &["track"])?;
    var.set_compression(9, true)?;
    var.set_fill_value(FILL_VALUE)?;
    put_attrs(&mut var, &attrs)?;

    var.put_values(data, (&[0], &[data.len()]))?;

    Ok(())
}

fn put_grid(
    file: &mut netcdf::FileMut,
    name: &str,
    data: &Array2<f64>,
    attrs: VarAttrs,
) -> McspfResult<()> {
    let (ntracks, ntimes) = data.dim();

    let mut var = file.add_variable::<f64>(name, &["track", "time"])?;
    var.set_compression(9, true)?;
    var.set_fill_value(FILL_VALUE)?;
    put_attrs(&mut var, &attrs)?;

    let flat: Vec<f64> = data.iter().copied().collect();
    var.put_values(&flat, (&[0, 0], &[ntracks, ntimes]))?;

    Ok(())
}

fn put_cube(
    file: &mut netcdf::FileMut,
    name: &str,
    slot_dim: &str,
    data: &Array3<f64>,
    attrs: VarAttrs,
) -> McspfResult<()> {
    let (ntracks, ntimes, nslots) = data.dim();

    let mut var = file.add_variable::<f64>(name, &["track", "time", slot_dim])?;
    var.set_compression(9, true)?;
    var.set_fill_value(FILL_VALUE)?;
    put_attrs(&mut var, &attrs)?;

    let flat: Vec<f64> = data.iter().copied().collect();
    var.put_values(&flat, (&[0, 0, 0], &[ntracks, ntimes, nslots]))?;

    Ok(())
}

/// Convert a pixel count grid to areas, leaving fill values untouched.
fn scaled_area<D: Dimension>(npix: &Array<f64, D>, pixel_radius_km: f64) -> Array<f64, D> {
    let factor = pixel_radius_km * pixel_radius_km;

    npix.mapv(|v| if v == FILL_VALUE { FILL_VALUE } else { v * factor })
}
