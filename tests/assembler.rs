use chrono::{TimeZone, Utc};
use mcspf::{
    write_statistics_file, AnalysisParams, CellState, CloudIdScene, MemoryScenes, OutputMeta,
    RadarScene, Scene, StatsAssembler, TrackFileAttrs, TrackTable, FILL_VALUE, MAX_CORE_SLOTS,
    MAX_PF_SLOTS,
};
use ndarray::{Array2, Array3};

const DOMAIN: (usize, usize) = (30, 30);

/// A scene with no clouds, no rain, and full radar coverage.
///
/// Latitude climbs a quarter degree per row and longitude a quarter degree per column so
/// centroid means come out exact.
fn clear_scene() -> (CloudIdScene, RadarScene) {
    let lat = Array2::from_shape_fn(DOMAIN, |(r, _)| 30.0 + r as f64 * 0.25);
    let lon = Array2::from_shape_fn(DOMAIN, |(_, c)| -100.0 + c as f64 * 0.25);

    let cloud = CloudIdScene {
        lat: lat.clone(),
        lon: lon.clone(),
        tb: Array2::from_elem(DOMAIN, 210.0),
        cloud_number: Array2::zeros(DOMAIN),
    };

    let radar = RadarScene {
        lat,
        lon,
        dbz: Array2::from_elem(DOMAIN, FILL_VALUE),
        dbz_heights: std::array::from_fn(|_| Array2::from_elem(DOMAIN, FILL_VALUE)),
        csa: Array2::zeros(DOMAIN),
        rainrate: Array2::from_elem(DOMAIN, FILL_VALUE),
        quality: Array2::from_elem(DOMAIN, 1.0),
        x_spacing: 10.0,
        y_spacing: 10.0,
    };

    (cloud, radar)
}

/// A track table of the given shape with every cell unused.
fn empty_tracks(ntracks: usize, ntimes: usize) -> TrackTable {
    let nmergers = 2;

    TrackTable {
        ntracks,
        ntimes,
        nmergers,
        basetime: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
        cloud_number: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
        status: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
        mean_lat: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
        mean_lon: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
        core_area: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
        ccs_area: Array2::from_elem((ntracks, ntimes), FILL_VALUE),
        merge_cloud_number: Array3::from_elem((ntracks, ntimes, nmergers), FILL_VALUE),
        split_cloud_number: Array3::from_elem((ntracks, ntimes, nmergers), FILL_VALUE),
        track_length: vec![1.0; ntracks],
        mcs_length: vec![1.0; ntracks],
        mcs_type: vec![1.0; ntracks],
        start_status: vec![1.0; ntracks],
        end_status: vec![0.0; ntracks],
        boundary: vec![0.0; ntracks],
        interruptions: vec![0.0; ntracks],
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
fn a_processed_cell_records_features_cores_and_coverage() {
    let (mut cloud, mut radar) = clear_scene();

    // A four cell cloud, the north row convective and the south row stratiform.
    for &cell in &[(10, 10), (10, 11), (11, 10), (11, 11)] {
        cloud.cloud_number[cell] = 7.0;
    }
    radar.csa[(10, 10)] = 6.0;
    radar.csa[(10, 11)] = 6.0;
    radar.csa[(11, 10)] = 5.0;
    radar.csa[(11, 11)] = 5.0;
    radar.rainrate[(10, 10)] = 10.0;
    radar.rainrate[(10, 11)] = 10.0;
    radar.rainrate[(11, 10)] = 2.0;
    radar.rainrate[(11, 11)] = 2.0;
    radar.dbz_heights[0][(10, 10)] = 8.0;
    radar.dbz_heights[0][(10, 11)] = 6.0;

    let when = Utc.with_ymd_and_hms(2011, 5, 20, 6, 0, 0).unwrap();
    let mut provider = MemoryScenes::new();
    provider.add(when, Scene::new(cloud, radar, None).unwrap());

    let mut tracks = empty_tracks(1, 2);
    tracks.basetime[(0, 0)] = when.timestamp() as f64;
    tracks.cloud_number[(0, 0)] = 7.0;

    let assembler = StatsAssembler::new(&tracks, &provider, AnalysisParams::default());
    let (results, summary) = assembler.run();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.total(), 1);

    assert_eq!(results.coverage[(0, 0)], 1.0);

    // All four rainy cells connect into one feature.
    assert_eq!(results.npf[(0, 0)], 1.0);
    assert_eq!(results.pf_npix[(0, 0, 0)], 4.0);
    assert_eq!(results.pf_rainrate[(0, 0, 0)], 6.0);
    assert_eq!(results.pf_npix[(0, 0, 1)], FILL_VALUE);

    assert_eq!(results.pf_lat[(0, 0, 0)], 32.625);
    assert_eq!(results.pf_lon[(0, 0, 0)], -97.375);

    // Convective and stratiform splits over the stored feature.
    assert_eq!(results.cc_npix[(0, 0)], 2.0);
    assert_eq!(results.cc_rainrate[(0, 0)], 10.0);
    assert_eq!(results.sf_npix[(0, 0)], 2.0);
    assert_eq!(results.sf_rainrate[(0, 0)], 2.0);
    assert_eq!(results.cc_dbz_height[0][(0, 0)], 7.0);
    assert_eq!(results.cc_dbz_height[1][(0, 0)], FILL_VALUE);

    // The convective row is one core of two cells.
    assert_eq!(results.ncores[(0, 0)], 1.0);
    assert_eq!(results.core_npix[(0, 0, 0)], 2.0);
    assert_eq!(results.core_max_dbz_height[0][(0, 0, 0)], 8.0);
    assert_eq!(results.core_avg_dbz_height[0][(0, 0, 0)], 7.0);

    // The second time step was never valid, it stays at fill.
    assert_eq!(results.npf[(0, 1)], FILL_VALUE);
    assert_eq!(results.coverage[(0, 1)], FILL_VALUE);
}

#[test]
fn merge_partners_extend_the_footprint() {
    let (mut cloud, mut radar) = clear_scene();

    // Focal cloud 7 with a smaller cloud 9 jammed against its east edge, raining
    // across both.
    for &cell in &[(10, 10), (10, 11), (11, 10), (11, 11)] {
        cloud.cloud_number[cell] = 7.0;
    }
    for &cell in &[(10, 12), (10, 13), (11, 12), (11, 13)] {
        cloud.cloud_number[cell] = 9.0;
    }
    for row in 10..=11 {
        for col in 10..=13 {
            radar.csa[(row, col)] = 5.0;
            radar.rainrate[(row, col)] = 5.0;
        }
    }

    let when = Utc.with_ymd_and_hms(2011, 5, 20, 6, 0, 0).unwrap();
    let mut provider = MemoryScenes::new();
    provider.add(when, Scene::new(cloud, radar, None).unwrap());

    // Track 0 absorbs cloud 9 as a merger, track 1 follows cloud 7 alone.
    let mut tracks = empty_tracks(2, 1);
    for track in 0..2 {
        tracks.basetime[(track, 0)] = when.timestamp() as f64;
        tracks.cloud_number[(track, 0)] = 7.0;
    }
    tracks.merge_cloud_number[(0, 0, 0)] = 9.0;

    let assembler = StatsAssembler::new(&tracks, &provider, AnalysisParams::default());
    let (results, summary) = assembler.run();

    assert_eq!(summary.processed, 2);

    assert_eq!(results.npf[(0, 0)], 1.0);
    assert_eq!(results.pf_npix[(0, 0, 0)], 8.0);

    // Without the merger, rain over cloud 9 sits outside the footprint.
    assert_eq!(results.npf[(1, 0)], 1.0);
    assert_eq!(results.pf_npix[(1, 0, 0)], 4.0);
}

#[test]
fn skipped_cells_keep_their_fill_and_are_tallied() {
    let (mut cloud, mut radar) = clear_scene();
    cloud.cloud_number[(5, 5)] = 3.0;
    radar.csa[(5, 5)] = 5.0;
    radar.rainrate[(5, 5)] = 4.0;

    let seen = Utc.with_ymd_and_hms(2011, 5, 20, 6, 0, 0).unwrap();
    let off_hour = Utc.with_ymd_and_hms(2011, 5, 20, 7, 30, 0).unwrap();
    let missing = Utc.with_ymd_and_hms(2011, 5, 20, 9, 0, 0).unwrap();

    let mut provider = MemoryScenes::new();
    provider.add(seen, Scene::new(cloud, radar, None).unwrap());

    // Step 0 is off the top of the hour, step 1 has no input data, and step 2 names a
    // cloud the grid does not contain.
    let mut tracks = empty_tracks(1, 3);
    tracks.basetime[(0, 0)] = off_hour.timestamp() as f64;
    tracks.cloud_number[(0, 0)] = 3.0;
    tracks.basetime[(0, 1)] = missing.timestamp() as f64;
    tracks.cloud_number[(0, 1)] = 3.0;
    tracks.basetime[(0, 2)] = seen.timestamp() as f64;
    tracks.cloud_number[(0, 2)] = 44.0;

    let assembler = StatsAssembler::new(&tracks, &provider, AnalysisParams::default());
    let (results, summary) = assembler.run();

    assert_eq!(summary.count(CellState::Unaligned), 1);
    assert_eq!(summary.count(CellState::NoData), 1);
    assert_eq!(summary.count(CellState::NoCloudMatch), 1);
    assert_eq!(summary.count(CellState::Processed), 0);
    assert_eq!(summary.total(), 3);

    assert!(results.npf.iter().all(|&v| v == FILL_VALUE));
    assert!(results.coverage.iter().all(|&v| v == FILL_VALUE));
    assert!(results.pf_npix.iter().all(|&v| v == FILL_VALUE));
}

#[test]
fn a_dry_footprint_still_counts_as_processed() {
    let (mut cloud, mut radar) = clear_scene();
    for &cell in &[(20, 20), (20, 21)] {
        cloud.cloud_number[cell] = 2.0;
    }
    // Drizzle below the feature threshold and nothing convective.
    radar.rainrate[(20, 20)] = 0.5;
    radar.csa[(20, 20)] = 5.0;

    let when = Utc.with_ymd_and_hms(2011, 5, 20, 12, 0, 0).unwrap();
    let mut provider = MemoryScenes::new();
    provider.add(when, Scene::new(cloud, radar, None).unwrap());

    let mut tracks = empty_tracks(1, 1);
    tracks.basetime[(0, 0)] = when.timestamp() as f64;
    tracks.cloud_number[(0, 0)] = 2.0;

    let (results, summary) =
        StatsAssembler::new(&tracks, &provider, AnalysisParams::default()).run();

    // A true zero count is not the same as never processed.
    assert_eq!(summary.processed, 1);
    assert_eq!(results.npf[(0, 0)], 0.0);
    assert_eq!(results.ncores[(0, 0)], 0.0);
    assert_eq!(results.coverage[(0, 0)], 1.0);
    assert_eq!(results.pf_npix[(0, 0, 0)], FILL_VALUE);
    assert_eq!(results.cc_npix[(0, 0)], FILL_VALUE);
}

#[test]
fn the_statistics_file_round_trips() {
    let (mut cloud, mut radar) = clear_scene();
    for &cell in &[(10, 10), (10, 11), (11, 10), (11, 11)] {
        cloud.cloud_number[cell] = 7.0;
        radar.csa[cell] = 5.0;
        radar.rainrate[cell] = 5.0;
    }

    let when = Utc.with_ymd_and_hms(2011, 5, 20, 6, 0, 0).unwrap();
    let mut provider = MemoryScenes::new();
    provider.add(when, Scene::new(cloud, radar, None).unwrap());

    let mut tracks = empty_tracks(1, 2);
    tracks.basetime[(0, 0)] = when.timestamp() as f64;
    tracks.cloud_number[(0, 0)] = 7.0;

    let params = AnalysisParams::default();
    let (results, _summary) = StatsAssembler::new(&tracks, &provider, params).run();

    let path = std::env::temp_dir().join(format!("mcspf_roundtrip_{}.nc", std::process::id()));
    let meta = OutputMeta {
        radar_source: "nmq".to_string(),
        startdate: "20110520".to_string(),
        enddate: "20110520".to_string(),
    };
    write_statistics_file(&path, &tracks, &results, &meta, &params).unwrap();

    let file = netcdf::open(&path).unwrap();

    assert_eq!(file.dimension("track").unwrap().len(), 1);
    assert_eq!(file.dimension("time").unwrap().len(), 2);
    assert_eq!(file.dimension("pfs").unwrap().len(), MAX_PF_SLOTS);
    assert_eq!(file.dimension("cores").unwrap().len(), MAX_CORE_SLOTS);
    assert_eq!(file.dimension("mergesplit").unwrap().len(), 2);

    match file.attribute("startdate").unwrap().value().unwrap() {
        netcdf::AttributeValue::Str(text) => assert_eq!(text, "20110520"),
        other => panic!("unexpected attribute type: {:?}", other),
    }

    let track_coord: Vec<f64> = file.variable("track").unwrap().get_values(..).unwrap();
    assert_eq!(track_coord, vec![1.0]);

    let npf: Vec<f64> = file.variable("npf").unwrap().get_values(..).unwrap();
    assert_eq!(npf, vec![1.0, FILL_VALUE]);

    // Pixel counts leave the file as areas, fill crosses untouched.
    let pf_area: Vec<f64> = file.variable("pf_area").unwrap().get_values(..).unwrap();
    assert_eq!(pf_area[0], 400.0);
    assert!(pf_area[1..].iter().all(|&v| v == FILL_VALUE));

    let basetime: Vec<f64> = file.variable("basetime").unwrap().get_values(..).unwrap();
    assert_eq!(basetime[0], tracks.basetime[(0, 0)]);
    assert_eq!(basetime[1], FILL_VALUE);

    drop(file);
    let _ = std::fs::remove_file(&path);
}
