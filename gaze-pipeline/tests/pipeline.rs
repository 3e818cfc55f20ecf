// End-to-end tests: pixels -> degrees -> velocities -> events -> properties

use approx::assert_relative_eq;
use gaze_pipeline::{
    microsaccades, ChannelKind, EventFrame, EventGazeProcessor, EventProcessor, Experiment,
    EyeSelection, GazeFrame, MicrosaccadeParams, Origin, SavitzkyGolayConfig, Screen, Value,
    VelocityConfig, VelocityMethod,
};
use std::collections::BTreeMap;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn experiment() -> Experiment {
    let screen = Screen::new(1280.0, 1024.0, 38.0, 30.0, 68.0, Origin::Center).unwrap();
    Experiment::new(screen, 1000.0).unwrap()
}

/// Fixation at 0 px, a 100 px step over samples 101..=110, fixation at 100 px
fn step(i: usize) -> f64 {
    (10.0 * (i as f64 - 100.0)).clamp(0.0, 100.0)
}

fn recording(eyes: &[&str]) -> GazeFrame {
    let n = 200;
    let mut columns = BTreeMap::new();
    for eye in eyes {
        columns.insert(format!("x{}_pix", eye), (0..n).map(step).collect::<Vec<_>>());
        columns.insert(format!("y{}_pix", eye), vec![0.0; n]);
    }
    GazeFrame::new((0..n as i64).map(|i| 5000 + i).collect(), columns)
        .unwrap()
        .with_experiment(experiment())
        .with_identifier("subject_id", 3)
}

fn detect(gaze: &GazeFrame, params: &MicrosaccadeParams) -> EventFrame {
    let positions = gaze.eye_columns(EyeSelection::Auto, ChannelKind::Position).unwrap();
    let velocities = gaze.eye_columns(EyeSelection::Auto, ChannelKind::Velocity).unwrap();
    microsaccades(
        gaze.select(&positions.to_vec()).unwrap().view(),
        gaze.select(&velocities.to_vec()).unwrap().view(),
        Some(gaze.time()),
        params,
    )
    .unwrap()
}

#[test]
fn test_step_is_detected_and_measured() {
    init_logging();

    let mut gaze = recording(&[""]);
    gaze.pix2deg().unwrap();
    gaze.pos2vel(&VelocityMethod::Preceding).unwrap();

    let params = MicrosaccadeParams::new().with_threshold([5.0, 5.0]);
    let events = detect(&gaze, &params).with_column("subject_id", 3);

    let intervals: Vec<(i64, i64)> = events.iter().map(|e| (e.onset(), e.offset())).collect();
    assert_eq!(intervals, vec![(5101, 5110)]);

    let durations = EventProcessor::new(&["duration"]).unwrap().process(&events).unwrap();
    assert_eq!(durations.column("duration").unwrap(), vec![&Value::Integer(9)]);

    let processor = EventGazeProcessor::new(&["amplitude", "disposition", "peak_velocity"]).unwrap();
    let properties = processor.process(&events, &gaze, &["subject_id"]).unwrap();
    assert_eq!(properties.len(), 1);

    let x_pos = gaze.column("x_pos").unwrap();
    let expected = x_pos[110] - x_pos[101];
    let row = &properties.events()[0];
    assert_relative_eq!(row.get("amplitude").unwrap().as_f64().unwrap(), expected, epsilon = 1e-12);
    assert_relative_eq!(row.get("disposition").unwrap().as_f64().unwrap(), expected, epsilon = 1e-12);

    let x_vel = gaze.column("x_vel").unwrap();
    let peak = x_vel[101..=110].iter().cloned().fold(f64::MIN, f64::max);
    assert_relative_eq!(row.get("peak_velocity").unwrap().as_f64().unwrap(), peak);
}

#[test]
fn test_binocular_recording_with_savitzky_golay() {
    init_logging();

    let mut gaze = recording(&["_left", "_right"]);
    gaze.pix2deg().unwrap();

    let velocity = VelocityConfig {
        method: "savitzky_golay".to_string(),
        savitzky_golay: Some(SavitzkyGolayConfig::new(5, 2)),
    };
    gaze.pos2vel(&velocity.resolve().unwrap()).unwrap();
    assert_eq!(gaze.columns_of(ChannelKind::Velocity).len(), 4);

    let params = MicrosaccadeParams::new()
        .with_threshold([5.0, 5.0])
        .with_minimum_duration(0);
    let events = detect(&gaze, &params);
    assert_eq!(events.len(), 1);
    let event = &events.events()[0];
    assert!(event.onset() >= 5098 && event.onset() <= 5101);
    assert!(event.offset() >= 5110 && event.offset() <= 5113);
}

#[test]
fn test_repeated_detection_merges_diagonally() {
    let mut gaze = recording(&["_right"]);
    gaze.pix2deg().unwrap();
    gaze.pos2vel(&VelocityMethod::Smooth).unwrap();

    let params = MicrosaccadeParams::new().with_threshold([5.0, 5.0]);
    let first = detect(&gaze, &params).with_column("subject_id", 3);

    let processor = EventGazeProcessor::new(&["dispersion"]).unwrap();
    let mut first_with_properties = first.clone();
    let dispersion = processor.process(&first, &gaze, &["subject_id"]).unwrap();
    first_with_properties.join_columns(&dispersion, &["dispersion".to_string()]);

    let second = detect(&gaze, &params.with_minimum_duration(100));
    assert!(second.is_empty());

    let merged = first_with_properties.concat_diagonal(detect(&gaze, &params));
    assert_eq!(merged.len(), 2);
    assert_eq!(merged.schema(), &["subject_id".to_string(), "dispersion".to_string()]);
    assert_eq!(merged.events()[1].get("dispersion"), Some(&Value::Null));
    assert!(merged.events()[0].get("dispersion").unwrap().as_f64().unwrap() > 0.0);
}
