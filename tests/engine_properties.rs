use proptest::prelude::*;
use stamina::coefficients::KineticsCoefficients;
use stamina::energy_system::EnergySystemModel;
use stamina::{
    ActivitySample, ExerciseType, HeartRateSample, HrrZone, HrrZoneCalculator, User, UserProfile,
    UserProfileParams,
};

/// Property tests over whole sessions fed through the user facade

#[derive(Debug, Clone)]
enum Event {
    HeartRate { dt: i64, bpm: u16, quality: u8, rr: Option<u16> },
    Activity { dt: i64, speed: f64 },
}

/// Mostly dense samples with the occasional dropout
fn gap_strategy() -> impl Strategy<Value = i64> {
    prop_oneof![8 => -2i64..4, 1 => 10i64..60]
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        (gap_strategy(), 50u16..200, 0u8..4, prop::option::of(330u16..1200))
            .prop_map(|(dt, bpm, quality, rr)| Event::HeartRate { dt, bpm, quality, rr }),
        (gap_strategy(), 0.0f64..20.0).prop_map(|(dt, speed)| Event::Activity { dt, speed }),
    ]
}

fn heart_rate_sample(time: i64, bpm: u16, quality: u8, rr: Option<u16>) -> HeartRateSample {
    let sample = HeartRateSample::new(time, bpm, quality);
    match rr {
        Some(rr) => sample.with_rr_intervals(&[rr, rr, rr]),
        None => sample,
    }
}

/// Apply one event relative to a running clock; returns whether it was accepted
fn apply(user: &mut User, clock: &mut i64, distance: &mut f64, event: &Event) -> bool {
    match *event {
        Event::HeartRate { dt, bpm, quality, rr } => {
            let time = *clock + dt;
            let accepted = user.update_heart_rate(heart_rate_sample(time, bpm, quality, rr)).is_ok();
            if accepted {
                *clock = time;
            }
            accepted
        }
        Event::Activity { dt, speed } => {
            let time = *clock + dt;
            let next_distance = *distance + speed * dt.max(0) as f64 / 3600.0;
            let accepted = user
                .update_physical_status(ActivitySample::new(time, next_distance, speed, ExerciseType::Run))
                .is_ok();
            if accepted {
                *clock = time;
                *distance = next_distance;
            }
            accepted
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_calories_never_decrease(events in prop::collection::vec(event_strategy(), 1..40)) {
        let mut user = User::new();
        let (mut clock, mut distance) = (0i64, 0.0f64);
        let mut previous = user.session_total_kcal();

        for event in &events {
            apply(&mut user, &mut clock, &mut distance, event);
            let total = user.session_total_kcal();
            prop_assert!(total >= previous);
            prop_assert!(user.session_exercise_kcal() >= 0.0);
            prop_assert!(user.session_bmr_kcal() >= 0.0);
            previous = total;
        }
    }

    #[test]
    fn test_fractions_stay_in_unit_interval(events in prop::collection::vec(event_strategy(), 1..40)) {
        let mut user = User::new();
        let (mut clock, mut distance) = (0i64, 0.0f64);

        for event in &events {
            apply(&mut user, &mut clock, &mut distance, event);
            for value in [user.stamina(), user.aerobic_fraction(), user.anaerobic_fraction()] {
                prop_assert!((0.0..=1.0).contains(&value));
            }
            prop_assert!(user.aerobic_fraction() + user.anaerobic_fraction() <= 1.0 + 1e-9);
            prop_assert!(user.lactate() >= 0.0);
        }
    }

    #[test]
    fn test_rejected_samples_leave_readers_unchanged(
        events in prop::collection::vec(event_strategy(), 1..30),
        back in 1i64..30,
        bpm in 50u16..200,
    ) {
        let mut user = User::new();
        let (mut clock, mut distance) = (0i64, 0.0f64);
        for event in &events {
            apply(&mut user, &mut clock, &mut distance, event);
        }
        prop_assume!(user.last_time().is_some());

        let before = user.snapshot();
        let stale = user.last_time().unwrap_or(0) - back;
        let hr = user.update_heart_rate(HeartRateSample::new(stale, bpm, 3));
        let activity = user.update_physical_status(ActivitySample::new(stale, 0.0, 10.0, ExerciseType::Run));

        prop_assert_eq!(hr.unwrap_err().status_code(), 1);
        prop_assert_eq!(activity.unwrap_err().status_code(), 1);
        prop_assert_eq!(before, user.snapshot());
    }

    #[test]
    fn test_getters_are_idempotent(events in prop::collection::vec(event_strategy(), 1..30)) {
        let mut user = User::new();
        let (mut clock, mut distance) = (0i64, 0.0f64);
        for event in &events {
            apply(&mut user, &mut clock, &mut distance, event);
        }

        prop_assert_eq!(user.snapshot(), user.snapshot());
        prop_assert_eq!(user.stamina(), user.stamina());
        prop_assert_eq!(
            user.predicted_last_pace_max_conti_burn(),
            user.predicted_last_pace_max_conti_burn()
        );
    }

    #[test]
    fn test_distance_readers_follow_projection(events in prop::collection::vec(event_strategy(), 1..60)) {
        let mut user = User::new();
        let (mut clock, mut distance) = (0i64, 0.0f64);

        for event in &events {
            apply(&mut user, &mut clock, &mut distance, event);
            if user.predicted_dist_time().is_none() || user.stamina() <= 0.5 {
                continue;
            }
            for prediction in [user.avg_prediction(), user.last_prediction()] {
                prop_assert!(prediction.max_conti_time_secs > 0.0);
                prop_assert!(prediction.stamina_left_time_secs > 0.0);
                if prediction.max_conti_speed_kmph > 0.0 {
                    prop_assert!(prediction.max_conti_dist_km > 0.0);
                }
                if prediction.stamina_left_speed_kmph > 0.0 {
                    prop_assert!(prediction.stamina_left_dist_km > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_rr_rate_only_from_samples_carrying_beats(
        samples in prop::collection::vec(
            (gap_strategy(), 60u16..190, prop::option::of(330u16..1200)),
            1..60,
        ),
    ) {
        let mut user = User::new();
        let mut clock = 0i64;

        for (dt, bpm, rr) in samples {
            let time = clock + dt.max(1);
            let reading = user.update_heart_rate(heart_rate_sample(time, bpm, 3, rr)).unwrap();
            clock = time;

            if rr.is_none() {
                prop_assert!(!reading.from_rr);
                prop_assert_eq!(reading.heart_rate, f64::from(bpm));
            }
        }
    }

    #[test]
    fn test_zone_heart_rates_are_monotone(rest in 30i32..90, span in 40i32..150) {
        let profile = UserProfile::from_params(UserProfileParams {
            bio_rest_hr: rest,
            bio_max_hr: rest + span,
            ..Default::default()
        });

        let anchors: Vec<u16> = [
            HrrZone::Hrr0,
            HrrZone::Hrr50,
            HrrZone::Hrr60,
            HrrZone::Hrr70,
            HrrZone::Hrr80,
            HrrZone::Hrr90,
            HrrZone::Hrr100,
        ]
        .iter()
        .map(|zone| HrrZoneCalculator::hr_at(&profile, *zone))
        .collect();

        prop_assert!(anchors.windows(2).all(|pair| pair[0] <= pair[1]));
        prop_assert_eq!(anchors[0], profile.bio_rest_hr());
        prop_assert_eq!(anchors[6], profile.bio_max_hr());
    }
}

#[test]
fn test_identical_heart_rate_timestamp_rejected() {
    let mut user = User::new();
    user.update_heart_rate(HeartRateSample::new(100, 140, 3)).unwrap();

    let before = user.snapshot();
    let err = user
        .update_heart_rate(HeartRateSample::new(100, 150, 3))
        .unwrap_err();

    assert_eq!(err.status_code(), 1);
    assert_eq!(before, user.snapshot());
    assert_eq!(user.heart_d_time(), Some(100));
}

#[test]
fn test_reference_zone_values() {
    let profile = UserProfile::from_params(UserProfileParams {
        bio_rest_hr: 60,
        bio_max_hr: 180,
        ..Default::default()
    });

    assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::Hrr0), 60);
    assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::Hrr50), 120);
    assert_eq!(HrrZoneCalculator::hr_at(&profile, HrrZone::Hrr100), 180);
}

#[test]
fn test_threshold_intensity_holds_stamina() {
    let kinetics = KineticsCoefficients::default();
    let mut system = EnergySystemModel::new(&UserProfile::default(), &kinetics);
    let threshold = system.threshold(&kinetics);

    system.integrate(threshold, 1800.0, &kinetics);

    assert!((system.stamina() - 1.0).abs() < 0.01);
    assert!(system.lactate() < kinetics.lactate_baseline + 0.2);
}

#[test]
fn test_hard_effort_then_rest_recovers() {
    let mut user = User::new();
    let mut distance = 0.0;
    for t in 0..=120 {
        distance += 18.0 / 3600.0;
        user.update_heart_rate(HeartRateSample::new(t, 185, 3)).unwrap();
        user.update_physical_status(ActivitySample::new(t, distance, 18.0, ExerciseType::Run))
            .unwrap();
    }
    let spent = user.stamina();
    let lactate_peak = user.lactate();
    assert!(spent < 1.0);
    assert!(lactate_peak > 1.0);

    for t in (180..=2400).step_by(30) {
        user.update_heart_rate(HeartRateSample::new(t, 70, 3)).unwrap();
    }
    assert!(user.stamina() > spent);
    assert!(user.lactate() < lactate_peak);
}
