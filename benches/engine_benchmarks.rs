use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stamina::coefficients::{KineticsCoefficients, PredictionCoefficients};
use stamina::energy_system::EnergySystemModel;
use stamina::prediction::{BurnPoint, PredictiveEnduranceModel};
use stamina::replay::{ReplayEvent, SessionReplay};
use stamina::{ActivitySample, ExerciseType, HeartRateSample, HrrZoneCalculator, User, UserProfile};

/// Benchmarks for the per-sample engine path
///
/// Session lengths mirror typical recordings from a few minutes to an hour
/// at one sample per second on each stream.

fn create_session(seconds: i64) -> Vec<ReplayEvent> {
    let mut events = Vec::with_capacity(seconds as usize * 2);
    for t in 0..seconds {
        // alternate easy and hard minutes
        let hard = (t / 60) % 2 == 1;
        let (bpm, speed) = if hard { (172, 15.0) } else { (138, 10.5) };
        let rr: u16 = 60_000 / bpm;
        events.push(ReplayEvent::HeartRate(
            HeartRateSample::new(t, bpm, 3).with_rr_intervals(&[rr, rr + 4]),
        ));
        events.push(ReplayEvent::Activity(ActivitySample::new(
            t,
            t as f64 * speed / 3600.0,
            speed,
            ExerciseType::Run,
        )));
    }
    events
}

fn bench_session_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("Session Ingest");
    group.sample_size(10);

    for &seconds in &[300i64, 1200, 3600] {
        let replay = SessionReplay::new(create_session(seconds));

        group.throughput(Throughput::Elements(replay.events().len() as u64));
        group.bench_with_input(BenchmarkId::new("replay", seconds), &replay, |b, replay| {
            b.iter(|| {
                let mut user = User::new();
                black_box(replay.run(&mut user))
            });
        });
    }

    group.finish();
}

fn bench_prediction_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("Prediction Refresh");

    let kinetics = KineticsCoefficients::default();
    let coefficients = PredictionCoefficients::default();
    let system = EnergySystemModel::new(&UserProfile::default(), &kinetics);

    for &points in &[10usize, 60, 600] {
        let mut model = PredictiveEnduranceModel::default();
        for i in 0..points {
            let speed = 8.0 + (i % 10) as f64;
            model.record_burn(
                BurnPoint {
                    time: i as i64,
                    speed_kmph: speed,
                    intensity: 0.3 + speed / 40.0,
                    kcal_per_min: speed,
                },
                &coefficients,
            );
        }

        group.bench_with_input(BenchmarkId::new("refresh", points), &model, |b, model| {
            b.iter(|| {
                let mut model = model.clone();
                black_box(model.refresh(0, &system, &kinetics, &coefficients, 20.0))
            });
        });
    }

    group.finish();
}

fn bench_energy_system(c: &mut Criterion) {
    let kinetics = KineticsCoefficients::default();
    let system = EnergySystemModel::new(&UserProfile::default(), &kinetics);

    c.bench_function("time_to_exhaustion_threshold", |b| {
        let threshold = system.threshold(&kinetics);
        b.iter(|| black_box(system.time_to_exhaustion(threshold, 10.0, 6.0 * 3600.0, &kinetics)));
    });

    c.bench_function("zone_table", |b| {
        let profile = UserProfile::default();
        b.iter(|| black_box(HrrZoneCalculator::zone_table(&profile)));
    });
}

criterion_group!(
    benches,
    bench_session_ingest,
    bench_prediction_refresh,
    bench_energy_system
);
criterion_main!(benches);
