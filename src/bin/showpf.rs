use clap::Parser;
use log::info;
use mcspf::{McspfResult, FILL_VALUE};
use simple_logger::SimpleLogger;
use std::{
    fmt::{self, Display},
    path::PathBuf,
};

/*-------------------------------------------------------------------------------------------------
 *                               Parse Command Line Arguments
 *-----------------------------------------------------------------------------------------------*/
///
/// Display summary statistics about the tracks in a statistics file.
///
/// For each track this prints how many time steps carry radar statistics, the largest
/// precipitation feature area seen over the track, the peak feature mean rain rate, and
/// the worst radar coverage over the processed time steps.
///
#[derive(Debug, Parser)]
#[clap(bin_name = "showpf")]
#[clap(author, version, about)]
struct ShowPfOptionsInit {
    /// The path to the statistics file written by trackpf.
    ///
    /// If this is not specified, then the program will check for it in the
    /// "PF_STATS_FILE" environment variable.
    #[clap(short, long)]
    #[clap(env = "PF_STATS_FILE")]
    stats_file: PathBuf,

    /// Only show tracks with at least this many processed time steps.
    #[clap(long, default_value_t = 1)]
    min_times: usize,

    /// Verbose output
    #[clap(short, long)]
    verbose: bool,
}

#[derive(Debug)]
struct ShowPfOptionsChecked {
    /// The path to the statistics file.
    stats_file: PathBuf,

    /// Minimum number of processed time steps for a track to show.
    min_times: usize,

    /// Verbose output
    verbose: bool,
}

impl Display for ShowPfOptionsChecked {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        writeln!(f, "\n")?; // yes, two blank lines.
        writeln!(f, "  Statistics File: {}", self.stats_file.display())?;
        writeln!(f, "    Minimum Times: {}", self.min_times)?;
        writeln!(f, "\n")?; // yes, two blank lines.

        Ok(())
    }
}

/// Get the command line arguments and check them.
///
/// If there is missing data, try to fill it in with environment variables.
fn parse_args() -> McspfResult<ShowPfOptionsChecked> {
    let ShowPfOptionsInit {
        stats_file,
        min_times,
        verbose,
    } = ShowPfOptionsInit::parse();

    let checked = ShowPfOptionsChecked {
        stats_file,
        min_times,
        verbose,
    };

    if verbose {
        info!("{}", checked);
    }

    Ok(checked)
}

/*-------------------------------------------------------------------------------------------------
 *                                   Summarizing the Tracks
 *-----------------------------------------------------------------------------------------------*/
struct TrackSummary {
    /// Track number as it appears in the file's track coordinate.
    track: usize,
    /// Time steps with radar statistics, including those that found nothing to rank.
    times_processed: usize,
    /// Largest precipitation feature area over the track, km^2.
    peak_area: Option<f64>,
    /// Highest feature mean rain rate over the track, mm/hr.
    peak_rainrate: Option<f64>,
    /// Worst radar coverage over the processed time steps.
    min_coverage: Option<f64>,
}

fn dim_len(file: &netcdf::File, name: &str) -> McspfResult<usize> {
    file.dimension(name)
        .map(|dim| dim.len())
        .ok_or_else(|| format!("missing required dimension {}", name).into())
}

fn flat_values(file: &netcdf::File, name: &str) -> McspfResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| format!("missing required variable {}", name))?;
    Ok(var.get_values::<f64, _>(..)?)
}

fn max_present(acc: Option<f64>, value: f64) -> Option<f64> {
    if value == FILL_VALUE {
        return acc;
    }

    match acc {
        Some(best) if best >= value => Some(best),
        _ => Some(value),
    }
}

fn min_present(acc: Option<f64>, value: f64) -> Option<f64> {
    if value == FILL_VALUE {
        return acc;
    }

    match acc {
        Some(best) if best <= value => Some(best),
        _ => Some(value),
    }
}

fn show(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

/*-------------------------------------------------------------------------------------------------
 *                                             MAIN
 *-----------------------------------------------------------------------------------------------*/
fn main() -> McspfResult<()> {
    SimpleLogger::new().init()?;

    let opts = parse_args()?;

    let file = netcdf::open(&opts.stats_file)?;

    let ntracks = dim_len(&file, "track")?;
    let ntimes = dim_len(&file, "time")?;
    let npfs = dim_len(&file, "pfs")?;

    let npf = flat_values(&file, "npf")?;
    let coverage = flat_values(&file, "nmq_frac")?;
    let pf_area = flat_values(&file, "pf_area")?;
    let pf_rainrate = flat_values(&file, "pf_rainrate")?;

    let mut summaries = Vec::with_capacity(ntracks);
    for track in 0..ntracks {
        let mut times_processed = 0;
        let mut peak_area = None;
        let mut peak_rainrate = None;
        let mut min_coverage = None;

        for time in 0..ntimes {
            let cell = track * ntimes + time;

            // A cell that was processed has a true feature count even when it is zero.
            if npf[cell] != FILL_VALUE {
                times_processed += 1;
            }
            min_coverage = min_present(min_coverage, coverage[cell]);

            for slot in 0..npfs {
                peak_area = max_present(peak_area, pf_area[cell * npfs + slot]);
                peak_rainrate = max_present(peak_rainrate, pf_rainrate[cell * npfs + slot]);
            }
        }

        summaries.push(TrackSummary {
            track: track + 1,
            times_processed,
            peak_area,
            peak_rainrate,
            min_coverage,
        });
    }

    summaries.retain(|summary| summary.times_processed >= opts.min_times);

    println!(
        "{:>6} {:>6} {:>14} {:>12} {:>9}",
        "track", "times", "peak area", "peak rain", "coverage"
    );
    println!(
        "{:>6} {:>6} {:>14} {:>12} {:>9}",
        "", "", "km^2", "mm/hr", "min"
    );
    for summary in &summaries {
        println!(
            "{:>6} {:>6} {:>14} {:>12} {:>9}",
            summary.track,
            summary.times_processed,
            show(summary.peak_area, 1),
            show(summary.peak_rainrate, 1),
            show(summary.min_coverage, 2),
        );
    }

    if opts.verbose {
        info!("printed {} of {} tracks", summaries.len(), ntracks);
    }

    Ok(())
}
