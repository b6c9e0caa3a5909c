/*!
 * Loader for the satellite track statistics file that drives the analysis.
 *
 * The track file is the product of the upstream infrared tracking stages. Each row is one
 * tracked system, each column one time step, and columns past the end of a track hold the
 * fill value. Everything loaded here is either consumed by the assembler (the base times,
 * cloud numbers, and merge/split partners) or copied through to the output artifact
 * unchanged by the writer.
 */

use crate::{scene, McspfResult, FILL_VALUE};
use chrono::{DateTime, TimeZone, Utc};
use log::debug;
use ndarray::{Array2, Array3};
use std::path::Path;

/// Global attributes copied out of the track statistics file.
///
/// These describe the upstream infrared tracking run. They are kept as the text the file
/// carries and flow into the output artifact without reinterpretation.
#[derive(Debug, Clone)]
pub struct TrackFileAttrs {
    pub description: String,
    pub source: String,
    pub time_resolution_hour: String,
    pub pixel_radius_km: String,
    pub area_thresh_km2: String,
    pub duration_thresh_hr: String,
    pub eccentricity_thresh: String,
}

/// The per-track and per-time contents of the track statistics file.
#[derive(Debug, Clone)]
pub struct TrackTable {
    pub ntracks: usize,
    pub ntimes: usize,
    pub nmergers: usize,

    /// Seconds since the epoch for each track and time, non-positive where the track
    /// carries no observation.
    pub basetime: Array2<f64>,
    /// Cloud number keying each track and time into that time's cloud-id grid.
    pub cloud_number: Array2<f64>,
    pub status: Array2<f64>,
    pub mean_lat: Array2<f64>,
    pub mean_lon: Array2<f64>,
    pub core_area: Array2<f64>,
    pub ccs_area: Array2<f64>,

    /// Cloud numbers of smaller clouds that merge into the track, fill padded.
    pub merge_cloud_number: Array3<f64>,
    /// Cloud numbers of smaller clouds that split from the track, fill padded.
    pub split_cloud_number: Array3<f64>,

    pub track_length: Vec<f64>,
    pub mcs_length: Vec<f64>,
    pub mcs_type: Vec<f64>,
    pub start_status: Vec<f64>,
    pub end_status: Vec<f64>,
    pub boundary: Vec<f64>,
    pub interruptions: Vec<f64>,

    pub attrs: TrackFileAttrs,
}

impl TrackTable {
    /// Load a track statistics file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> McspfResult<Self> {
        let path = path.as_ref();
        debug!("loading track statistics from {}", path.display());
        let file = netcdf::open(path)?;

        let ntracks = dim_len(&file, "ntracks")?;
        let ntimes = dim_len(&file, "ntimes")?;
        let nmergers = dim_len(&file, "nmergers")?;

        let attrs = TrackFileAttrs {
            description: attr_string(&file, "description")?,
            source: attr_string(&file, "source")?,
            time_resolution_hour: attr_string(&file, "time_resolution_hour")?,
            pixel_radius_km: attr_string(&file, "pixel_radius_km")?,
            area_thresh_km2: attr_string(&file, "MCS_area_km**2")?,
            duration_thresh_hr: attr_string(&file, "MCS_duration_hour")?,
            eccentricity_thresh: attr_string(&file, "MCS_eccentricity")?,
        };

        Ok(TrackTable {
            ntracks,
            ntimes,
            nmergers,
            basetime: grid_for(&file, "mcs_basetime", ntracks, ntimes)?,
            cloud_number: grid_for(&file, "mcs_cloudnumber", ntracks, ntimes)?,
            status: grid_for(&file, "mcs_status", ntracks, ntimes)?,
            mean_lat: grid_for(&file, "mcs_meanlat", ntracks, ntimes)?,
            mean_lon: grid_for(&file, "mcs_meanlon", ntracks, ntimes)?,
            core_area: grid_for(&file, "mcs_corearea", ntracks, ntimes)?,
            ccs_area: grid_for(&file, "mcs_ccsarea", ntracks, ntimes)?,
            merge_cloud_number: cube_for(&file, "mcs_mergecloudnumber", ntracks, ntimes, nmergers)?,
            split_cloud_number: cube_for(&file, "mcs_splitcloudnumber", ntracks, ntimes, nmergers)?,
            track_length: values_for(&file, "track_length", ntracks)?,
            mcs_length: values_for(&file, "mcs_length", ntracks)?,
            mcs_type: values_for(&file, "mcs_type", ntracks)?,
            start_status: values_for(&file, "mcs_startstatus", ntracks)?,
            end_status: values_for(&file, "mcs_endstatus", ntracks)?,
            boundary: values_for(&file, "mcs_boundary", ntracks)?,
            interruptions: values_for(&file, "mcs_trackinterruptions", ntracks)?,
            attrs,
        })
    }

    /// The time step indexes of a track that hold a real observation.
    pub fn valid_times(&self, track: usize) -> Vec<usize> {
        (0..self.ntimes)
            .filter(|&time| self.basetime[(track, time)] > 0.0)
            .collect()
    }

    /// The observation time at a track and time step, absent where the cell is unused.
    pub fn time_at(&self, track: usize, time: usize) -> Option<DateTime<Utc>> {
        let seconds = self.basetime[(track, time)];
        if seconds <= 0.0 {
            return None;
        }

        Utc.timestamp_opt(seconds as i64, 0).single()
    }

    /// Cloud numbers merging into the track at one time step, empty entries dropped.
    pub fn merge_partners(&self, track: usize, time: usize) -> Vec<u32> {
        partners(&self.merge_cloud_number, track, time, self.nmergers)
    }

    /// Cloud numbers splitting from the track at one time step, empty entries dropped.
    pub fn split_partners(&self, track: usize, time: usize) -> Vec<u32> {
        partners(&self.split_cloud_number, track, time, self.nmergers)
    }
}

fn partners(cube: &Array3<f64>, track: usize, time: usize, layers: usize) -> Vec<u32> {
    (0..layers)
        .map(|layer| cube[(track, time, layer)])
        .filter(|&v| v > 0.0)
        .map(|v| v as u32)
        .collect()
}

fn dim_len(file: &netcdf::File, name: &str) -> McspfResult<usize> {
    file.dimension(name)
        .map(|dim| dim.len())
        .ok_or_else(|| format!("track statistics file is missing the {} dimension", name).into())
}

fn attr_string(file: &netcdf::File, name: &str) -> McspfResult<String> {
    let attr = file.attribute(name).ok_or_else(|| {
        format!("track statistics file is missing the {} attribute", name)
    })?;

    match attr.value()? {
        netcdf::AttributeValue::Str(text) => Ok(text),
        value => match f64::try_from(value) {
            Ok(v) => Ok(v.to_string()),
            Err(_) => {
                Err(format!("track statistics attribute {} has an unusable type", name).into())
            }
        },
    }
}

/// Read a variable as a flat buffer with the expected element count, remapping the
/// variable's own fill value to the shared sentinel.
fn values_for(file: &netcdf::File, name: &str, expected: usize) -> McspfResult<Vec<f64>> {
    let var = scene::require_variable(file, name)?;
    let mut values = var.get_values::<f64, _>(..)?;

    if values.len() != expected {
        return Err(format!(
            "variable {} holds {} values where {} were expected",
            name,
            values.len(),
            expected
        )
        .into());
    }

    if let Some(file_fill) = var.fill_value::<f64>()? {
        if file_fill != FILL_VALUE {
            for v in values.iter_mut() {
                if *v == file_fill {
                    *v = FILL_VALUE;
                }
            }
        }
    }

    Ok(values)
}

fn grid_for(file: &netcdf::File, name: &str, rows: usize, cols: usize) -> McspfResult<Array2<f64>> {
    let values = values_for(file, name, rows * cols)?;
    Ok(Array2::from_shape_vec((rows, cols), values)?)
}

fn cube_for(
    file: &netcdf::File,
    name: &str,
    rows: usize,
    cols: usize,
    layers: usize,
) -> McspfResult<Array3<f64>> {
    let values = values_for(file, name, rows * cols * layers)?;
    Ok(Array3::from_shape_vec((rows, cols, layers), values)?)
}

#[cfg(test)]
mod test {
    use super::*;

    fn little_table() -> TrackTable {
        let (ntracks, ntimes, nmergers) = (2, 3, 2);

        let mut basetime = Array2::from_elem((ntracks, ntimes), FILL_VALUE);
        basetime[(0, 0)] = 1_180_663_200.0; // 2007-06-01 02:00:00 UTC
        basetime[(0, 1)] = 1_180_666_800.0; // 2007-06-01 03:00:00 UTC
        basetime[(1, 0)] = 1_180_663_200.0;

        let mut merge_cloud_number = Array3::from_elem((ntracks, ntimes, nmergers), FILL_VALUE);
        merge_cloud_number[(0, 0, 0)] = 12.0;
        merge_cloud_number[(0, 0, 1)] = 0.0;

        TrackTable {
            ntracks,
            ntimes,
            nmergers,
            basetime,
            cloud_number: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
            status: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
            mean_lat: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
            mean_lon: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
            core_area: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
            ccs_area: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
            merge_cloud_number,
            split_cloud_number: Array3::from_elem((ntracks, ntimes, nmergers), FILL_VALUE),
            track_length: vec![2.0, 1.0],
            mcs_length: vec![2.0, 1.0],
            mcs_type: vec![1.0, 1.0],
            start_status: vec![1.0, 1.0],
            end_status: vec![0.0, 0.0],
            boundary: vec![0.0, 0.0],
            interruptions: vec![0.0, 0.0],
            attrs: TrackFileAttrs {
                description: "test tracks".to_string(),
                source: "test-ir".to_string(),
                time_resolution_hour: "1".to_string(),
                pixel_radius_km: "4".to_string(),
                area_thresh_km2: "60000".to_string(),
                duration_thresh_hr: "6".to_string(),
                eccentricity_thresh: "0.7".to_string(),
            },
        }
    }

    #[test]
    fn valid_times_skip_unused_columns() {
        let table = little_table();

        assert_eq!(table.valid_times(0), vec![0, 1]);
        assert_eq!(table.valid_times(1), vec![0]);
    }

    #[test]
    fn time_at_converts_epoch_seconds() {
        let table = little_table();

        let expected = Utc.with_ymd_and_hms(2007, 6, 1, 2, 0, 0).unwrap();
        assert_eq!(table.time_at(0, 0), Some(expected));
        assert_eq!(table.time_at(0, 2), None);
        assert_eq!(table.time_at(1, 1), None);
    }

    #[test]
    fn partner_lists_drop_zero_and_fill_entries() {
        let table = little_table();

        assert_eq!(table.merge_partners(0, 0), vec![12]);
        assert!(table.merge_partners(0, 1).is_empty());
        assert!(table.split_partners(0, 0).is_empty());
    }
}
