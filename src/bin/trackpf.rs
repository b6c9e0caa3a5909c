use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use log::{debug, error, info, trace, warn, LevelFilter};
use mcspf::{
    load_accumulation, load_cloudid, load_radar, write_statistics_file, AnalysisParams, CellState,
    McspfResult, OutputMeta, Scene, SceneProvider, StatsAssembler, TimeAlignment, TrackTable,
};
use rustc_hash::FxHashMap as HashMap;
use simple_logger::SimpleLogger;
use std::{
    fmt::{self, Display},
    path::{Path, PathBuf},
};
use strum::IntoEnumIterator;

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Compute radar precipitation statistics for satellite tracked convective systems.
///
/// For every track and time step in the track statistics file this program reconstructs the
/// cloud footprint, matches it against the radar grids for that time, and writes the ranked
/// precipitation feature and convective core statistics to a new netCDF file.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "trackpf")]
#[clap(author, version, about)]
struct TrackPfOptionsInit {
    /// The path to the track statistics file.
    ///
    /// If this is not specified, then the program will check for it in the
    /// "TRACK_STATS_FILE" environment variable.
    #[clap(short, long)]
    #[clap(env = "TRACK_STATS_FILE")]
    track_stats_file: PathBuf,

    /// The directory holding the cloud-id files.
    ///
    /// If this is not specified, then the program will check for it in the "CLOUDID_DIR"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "CLOUDID_DIR")]
    cloudid_dir: PathBuf,

    /// The directory holding the radar classification files.
    ///
    /// If this is not specified, then the program will check for it in the "RADAR_DIR"
    /// environment variable.
    #[clap(short, long)]
    #[clap(env = "RADAR_DIR")]
    radar_dir: PathBuf,

    /// The directory holding the rain accumulation files.
    ///
    /// If this is not specified, then the program will check for it in the
    /// "RAIN_ACCUMULATION_DIR" environment variable. Without a directory the statistics
    /// are computed with an all-fill accumulation grid.
    #[clap(long)]
    #[clap(env = "RAIN_ACCUMULATION_DIR")]
    rain_accumulation_dir: Option<PathBuf>,

    /// The directory to write the statistics file into.
    ///
    /// If this is not specified, then the output lands next to the track statistics file.
    #[clap(short, long)]
    output_dir: Option<PathBuf>,

    /// The file name prefix of the cloud-id files.
    #[clap(long, default_value = "cloudid_")]
    cloudid_base: String,

    /// The file name prefix of the radar classification files.
    #[clap(long, default_value = "csa4km_")]
    radar_base: String,

    /// The file name prefix of the rain accumulation files.
    #[clap(long, default_value = "regrid_q2_")]
    accumulation_base: String,

    /// The name of the radar data source.
    ///
    /// This becomes part of the output file name and the source2 attribute of the output.
    #[clap(long, default_value = "nmq")]
    radar_source: String,

    /// The first date of the run in yyyymmdd form.
    #[clap(parse(try_from_str=parse_date))]
    start: String,

    /// The last date of the run in yyyymmdd form.
    #[clap(parse(try_from_str=parse_date))]
    end: String,

    /// Match every time step instead of only those near the top of an hour.
    #[clap(long)]
    all_times: bool,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

/// Validate a yyyymmdd date argument.
fn parse_date(date_str: &str) -> McspfResult<String> {
    NaiveDate::parse_from_str(date_str, "%Y%m%d")?;
    Ok(date_str.to_string())
}

#[derive(Debug)]
struct TrackPfOptionsChecked {
    /// The path to the track statistics file.
    track_stats_file: PathBuf,

    /// The directory holding the cloud-id files.
    cloudid_dir: PathBuf,

    /// The directory holding the radar classification files.
    radar_dir: PathBuf,

    /// The directory holding the rain accumulation files.
    rain_accumulation_dir: Option<PathBuf>,

    /// The full path of the statistics file to write.
    output_file: PathBuf,

    /// File name prefixes of the three per-time input kinds.
    cloudid_base: String,
    radar_base: String,
    accumulation_base: String,

    /// The name of the radar data source.
    radar_source: String,

    /// The run date range in yyyymmdd form.
    start: String,
    end: String,

    /// Which time steps are matched against radar data.
    alignment: TimeAlignment,
}

impl Display for TrackPfOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let accumulation = match &self.rain_accumulation_dir {
            Some(dir) => dir.display().to_string(),
            None => "(none)".to_string(),
        };
        let alignment = match self.alignment {
            TimeAlignment::TopOfHour => "top of hour",
            TimeAlignment::Every => "every time step",
        };

        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "  Track Statistics: {}", self.track_stats_file.display())?;
        writeln!(f, "    Cloud-id Files: {}", self.cloudid_dir.display())?;
        writeln!(f, "       Radar Files: {}", self.radar_dir.display())?;
        writeln!(f, "Accumulation Files: {}", accumulation)?;
        writeln!(f, "            Output: {}", self.output_file.display())?;
        writeln!(f, "      Radar Source: {}", self.radar_source)?;
        writeln!(f, "             Start: {}", self.start)?;
        writeln!(f, "               End: {}", self.end)?;
        writeln!(f, "         Alignment: {}", alignment)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
///
/// If there is missing data, try to fill it in with environment variables.
fn parse_args() -> McspfResult<TrackPfOptionsChecked> {
    let TrackPfOptionsInit {
        track_stats_file,
        cloudid_dir,
        radar_dir,
        rain_accumulation_dir,
        output_dir,
        cloudid_base,
        radar_base,
        accumulation_base,
        radar_source,
        start,
        end,
        all_times,
        verbose,
    } = TrackPfOptionsInit::parse();

    let output_dir = match output_dir {
        Some(dir) => dir,
        None => track_stats_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let output_file = output_dir.join(format!(
        "mcs_tracks_{}_{}_{}.nc",
        radar_source, start, end
    ));

    let alignment = if all_times {
        TimeAlignment::Every
    } else {
        TimeAlignment::TopOfHour
    };

    let checked = TrackPfOptionsChecked {
        track_stats_file,
        cloudid_dir,
        radar_dir,
        rain_accumulation_dir,
        output_file,
        cloudid_base,
        radar_base,
        accumulation_base,
        radar_source,
        start,
        end,
        alignment,
    };

    if verbose {
        info!("{}", checked);
    }

    Ok(checked)
}

/*-------------------------------------------------------------------------------------------------
 *                                    Finding Input Files
 *-----------------------------------------------------------------------------------------------*/
/// A scene provider that finds input files on disk by their time stamp.
///
/// Each input directory is surveyed once up front. A time step whose cloud-id or radar
/// file is absent yields no scene, a missing rain accumulation file only costs the
/// accumulation grid.
struct FileScenes {
    cloudid: HashMap<String, PathBuf>,
    radar: HashMap<String, PathBuf>,
    accumulation: HashMap<String, PathBuf>,
    expect_accumulation: bool,
}

impl FileScenes {
    fn survey(opts: &TrackPfOptionsChecked) -> Self {
        let cloudid = index_files(&opts.cloudid_dir, |fname| {
            fname
                .strip_prefix(opts.cloudid_base.as_str())
                .and_then(|rest| rest.strip_suffix(".nc"))
                .map(str::to_string)
        });

        let radar = index_files(&opts.radar_dir, |fname| {
            fname
                .strip_prefix(opts.radar_base.as_str())
                .and_then(|rest| rest.strip_suffix("00.nc"))
                .map(str::to_string)
        });

        let accumulation = match &opts.rain_accumulation_dir {
            Some(dir) => index_files(dir, |fname| {
                fname
                    .strip_prefix(opts.accumulation_base.as_str())
                    .and_then(|rest| rest.strip_suffix("00.nc"))
                    .map(|stamp| stamp.replacen('.', "_", 1))
            }),
            None => HashMap::default(),
        };

        FileScenes {
            cloudid,
            radar,
            accumulation,
            expect_accumulation: opts.rain_accumulation_dir.is_some(),
        }
    }
}

/// Map every matching netCDF file in a directory to its yyyymmdd_hhmm key.
fn index_files<F>(dir: &Path, key_of: F) -> HashMap<String, PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let mut index = HashMap::default();

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|res| res.ok())
        // Ignore directory entries.
        .filter(|entry| entry.file_type().is_file())
    {
        let fname = entry.file_name().to_string_lossy();

        if !fname.ends_with(".nc") {
            continue;
        }

        if let Some(key) = key_of(&fname) {
            index.insert(key, entry.path().to_path_buf());
        }
    }

    index
}

impl SceneProvider for FileScenes {
    fn scene_at(&self, time: DateTime<Utc>) -> McspfResult<Option<Scene>> {
        let key = time.format("%Y%m%d_%H%M").to_string();

        let (cloudid_path, radar_path) = match (self.cloudid.get(&key), self.radar.get(&key)) {
            (Some(cloudid), Some(radar)) => (cloudid, radar),
            _ => return Ok(None),
        };

        let cloud = load_cloudid(cloudid_path)?;
        let radar = load_radar(radar_path)?;

        let accumulation = match self.accumulation.get(&key) {
            Some(path) => Some(load_accumulation(path)?),
            None => {
                if self.expect_accumulation {
                    warn!("no rain accumulation file for {}", key);
                }
                None
            }
        };

        Scene::new(cloud, radar, accumulation).map(Some)
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> McspfResult<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("mcspf", LevelFilter::Debug)
        .init()?;

    trace!("Trace messages enabled.");
    debug!("Debug messages enabled.");
    info!("Info messages enabled.");
    warn!("Warn messages enabled.");
    error!("Error messages enabled.");

    let opts = parse_args()?;

    let tracks = TrackTable::from_file(&opts.track_stats_file)?;
    info!(
        "loaded {} tracks with up to {} time steps each",
        tracks.ntracks, tracks.ntimes
    );

    let provider = FileScenes::survey(&opts);
    info!(
        "found {} cloud-id, {} radar, and {} rain accumulation files",
        provider.cloudid.len(),
        provider.radar.len(),
        provider.accumulation.len()
    );

    let params = AnalysisParams {
        alignment: opts.alignment,
        ..AnalysisParams::default()
    };

    let assembler = StatsAssembler::new(&tracks, &provider, params);
    let (results, summary) = assembler.run();

    info!("");
    info!("Track and time steps examined:");
    for state in CellState::iter() {
        info!("{:>16} - {:>8}", state.name(), summary.count(state));
    }
    info!("{:>16} - {:>8}", "total", summary.total());
    info!("");

    let meta = OutputMeta {
        radar_source: opts.radar_source.clone(),
        startdate: opts.start.clone(),
        enddate: opts.end.clone(),
    };
    write_statistics_file(&opts.output_file, &tracks, &results, &meta, &params)?;

    info!("statistics written to {}", opts.output_file.display());

    Ok(())
}
