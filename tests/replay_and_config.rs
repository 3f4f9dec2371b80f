use stamina::config::EngineConfig;
use stamina::replay::{ReplayEvent, SessionReplay};
use stamina::{
    ActivitySample, ExerciseType, HeartRateSample, QuestionnaireAnswers, StaminaError, User,
    UserProfileParams, UserRegistry,
};
use std::fmt::Write as _;
use std::fs;
use tempfile::{tempdir, NamedTempFile};

/// File-backed workflows: configuration, CSV replay and the handle registry

fn steady_run_csv(seconds: i64, bpm: u16, speed_kmph: f64) -> String {
    let mut csv = String::from("kind,time,heart_rate,quality,distance_km,speed_kmph,exercise\n");
    for t in 0..=seconds {
        let distance = speed_kmph * t as f64 / 3600.0;
        writeln!(csv, "hr,{},{},3,,,", t, bpm).unwrap();
        writeln!(csv, "activity,{},,,{:.5},{},run", t, distance, speed_kmph).unwrap();
    }
    csv
}

#[test]
fn test_replay_file_matches_direct_updates() {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), steady_run_csv(90, 150, 11.0)).unwrap();

    let replay = SessionReplay::from_path(file.path()).unwrap();
    assert_eq!(replay.events().len(), 182);

    let mut replayed = User::new();
    let summary = replay.run(&mut replayed);
    assert_eq!(summary.accepted_heart_rate, 91);
    assert_eq!(summary.accepted_activity, 91);
    assert_eq!(summary.rejected(), 0);

    let mut direct = User::new();
    for event in replay.events() {
        match event {
            ReplayEvent::HeartRate(sample) => {
                direct.update_heart_rate(sample.clone()).unwrap();
            }
            ReplayEvent::Activity(sample) => {
                direct.update_physical_status(sample.clone()).unwrap();
            }
        }
    }
    assert_eq!(summary.metrics, direct.snapshot());
    assert_eq!(summary.metrics.physic_d_time, Some(90));
    assert!(summary.metrics.session_distance_km > 0.2);
}

#[test]
fn test_replay_summary_serializes_to_json() {
    let replay = SessionReplay::from_reader(steady_run_csv(20, 140, 9.0).as_bytes()).unwrap();
    let summary = replay.run_traced(&mut User::new(), Some(10));

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["events"], 42);
    assert_eq!(json["trace"].as_array().unwrap().len(), 3);
    assert_eq!(json["metrics"]["zones"].as_array().unwrap().len(), 13);
}

#[test]
fn test_replay_reports_unknown_kind() {
    let csv = "kind,time,heart_rate\nswim,0,120\n";
    let err = SessionReplay::from_reader(csv.as_bytes()).unwrap_err();
    assert!(matches!(err, StaminaError::Csv(_)));
    assert_eq!(err.status_code(), 4);
}

#[test]
fn test_replay_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = SessionReplay::from_path(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, StaminaError::Io(_)));
}

#[test]
fn test_config_profile_and_coefficients_drive_user() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stamina").join("config.toml");

    let mut config = EngineConfig::default();
    config.profile.bio_rest_hr = 48;
    config.profile.bio_max_hr = 200;
    config.coefficients.prediction.refresh_interval_secs = 30;
    config.save_to_file(&path).unwrap();

    let loaded = EngineConfig::load_from_file(&path).unwrap();
    let mut user = User::with_coefficients(loaded.profile.clone(), loaded.coefficients.clone()).unwrap();
    assert_eq!(user.profile().bio_rest_hr(), 48);
    assert_eq!(user.zone_table().last().map(|row| row.heart_rate), Some(200));

    for t in 0..40 {
        user.update_heart_rate(HeartRateSample::new(t, 140, 3)).unwrap();
    }
    // first refresh at t=0, next not due until t=30
    assert_eq!(user.predicted_burn_time(), Some(30));
}

#[test]
fn test_config_rejects_invalid_coefficients_file() {
    let file = NamedTempFile::new().unwrap();
    fs::write(
        file.path(),
        "[coefficients.prediction]\nrefresh_interval_secs = -1\n",
    )
    .unwrap();

    let err = EngineConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, StaminaError::Configuration(_)));
}

#[test]
fn test_registry_session_with_questionnaire() {
    let mut registry = UserRegistry::new();
    let handle = registry.create_with(UserProfileParams {
        age: 28,
        weight_kg: 60.0,
        ..Default::default()
    });

    let user = registry.get_mut(handle).unwrap();
    let baseline = user.anaerobic_fraction();
    let err = user
        .update_aerobic_anaerobic_by_questionnaire(QuestionnaireAnswers {
            first_time: true,
            breath: 9,
            muscle: 3,
            rpe: 5,
        })
        .unwrap_err();
    assert_eq!(err.status_code(), 3);
    assert_eq!(user.anaerobic_fraction(), baseline);

    let outcome = user
        .update_aerobic_anaerobic_by_questionnaire(QuestionnaireAnswers {
            first_time: true,
            breath: 5,
            muscle: 5,
            rpe: 10,
        })
        .unwrap();
    assert!(outcome.anaerobic_baseline > 0.0);

    for t in 0..30 {
        user.update_physical_status(ActivitySample::new(t, t as f64 * 0.003, 10.8, ExerciseType::Run))
            .unwrap();
    }
    assert!(registry.get(handle).unwrap().session_exercise_kcal() > 0.0);

    assert!(registry.destroy(handle));
    assert!(registry.is_empty());
}
