//! Per-spill cooldown, cancellation and batch runs
//!
//! Run tests with: cargo test --test `rate_limiting`

mod common;

use dispersion_core::{
    simulation::{CooldownTracker, ManualClock, SimulationJob},
    CancellationToken, ChemicalProfile, DispersionEngine, DispersionError, EngineConfig,
    EnvironmentalSeries, SimulationResult, SpillId, SpillSnapshot,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn engine_with_clock(window: Duration) -> (DispersionEngine, Arc<ManualClock>) {
    let mut config = EngineConfig::default();
    config.grid.size = 21;
    config.cooldown = window;
    let clock = Arc::new(ManualClock::new());
    let engine = DispersionEngine::with_clock(config, clock.clone()).expect("valid configuration");
    (engine, clock)
}

fn spill(id: &str) -> SpillSnapshot {
    SpillSnapshot::new(id, 51.5, -0.12, 500.0, 6.0, "methanol")
}

fn run_once(
    engine: &DispersionEngine,
    spill: &SpillSnapshot,
) -> Result<SimulationResult, DispersionError> {
    let profile = ChemicalProfile::methanol();
    engine.run(spill, Some(&profile), &EnvironmentalSeries::empty(), 0.25)
}

#[test]
fn test_second_run_inside_window_is_rate_limited() {
    let (engine, clock) = engine_with_clock(Duration::from_secs(5));
    let spill = spill("rl-window");

    assert!(run_once(&engine, &spill).is_ok());

    clock.advance(Duration::from_secs(4));
    let err = run_once(&engine, &spill).expect_err("inside the cooldown window");
    assert!(err.is_transient());
    assert_eq!(
        err,
        DispersionError::RateLimited {
            spill_id: spill.id.clone(),
            retry_after: Duration::from_secs(1),
        }
    );

    clock.advance(Duration::from_secs(1));
    assert!(run_once(&engine, &spill).is_ok());
}

#[test]
fn test_different_spills_do_not_share_a_window() {
    let (engine, _clock) = engine_with_clock(Duration::from_secs(60));
    assert!(run_once(&engine, &spill("rl-a")).is_ok());
    assert!(run_once(&engine, &spill("rl-b")).is_ok());
    assert!(run_once(&engine, &spill("rl-a")).is_err());
    assert_eq!(engine.cooldown().len(), 2);
}

#[test]
fn test_cancelled_run_does_not_start_the_window() {
    let (engine, _clock) = engine_with_clock(Duration::from_secs(60));
    let spill = spill("rl-cancel");
    let profile = ChemicalProfile::methanol();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = engine.run_cancellable(
        &spill,
        Some(&profile),
        &EnvironmentalSeries::empty(),
        1.0,
        &cancel,
    );
    assert_eq!(
        err,
        Err(DispersionError::Cancelled {
            completed_steps: 0,
            total_steps: 12
        })
    );
    assert_eq!(engine.cooldown().remaining(&spill.id), Some(Duration::ZERO));
    assert!(run_once(&engine, &spill).is_ok());
}

#[test]
fn test_concurrent_requests_admit_exactly_one() {
    let (engine, _clock) = engine_with_clock(Duration::from_secs(60));
    let engine = Arc::new(engine);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                run_once(&engine, &spill("rl-race")).is_ok()
            })
        })
        .collect();

    let admitted = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread panicked"))
        .filter(|&ok| ok)
        .count();
    assert_eq!(admitted, 1);
    assert!(!engine.cooldown().is_in_flight(&SpillId::from("rl-race")));
}

#[test]
fn test_run_many_keeps_job_order() {
    let (engine, _clock) = engine_with_clock(Duration::from_secs(60));
    let profile = ChemicalProfile::diesel();
    let jobs: Vec<_> = (0..6)
        .map(|n| SimulationJob {
            spill: SpillSnapshot::new(
                format!("batch-{n}"),
                10.0,
                10.0,
                100.0 * f64::from(n + 1),
                5.0,
                "diesel",
            ),
            profile: Some(profile.clone()),
            environment: EnvironmentalSeries::empty(),
            simulation_hours: 0.5,
        })
        .collect();

    let results = engine.run_many(&jobs, &CancellationToken::new());
    assert_eq!(results.len(), jobs.len());
    for (job, result) in jobs.iter().zip(&results) {
        let result = result.as_ref().expect("independent spills all run");
        assert_eq!(result.spill_id, job.spill.id);
        assert_eq!(result.initial_mass, profile.released_mass_kg(job.spill.volume_liters));
    }

    // Re-submitting the batch inside the window rejects every job
    let again = engine.run_many(&jobs, &CancellationToken::new());
    assert!(again
        .iter()
        .all(|r| matches!(r, Err(DispersionError::RateLimited { .. }))));
}

#[test]
fn test_duplicate_ids_in_a_batch_run_once() {
    let (engine, _clock) = engine_with_clock(Duration::from_secs(60));
    let job = SimulationJob {
        spill: spill("batch-dup"),
        profile: None,
        environment: EnvironmentalSeries::empty(),
        simulation_hours: 0.25,
    };
    let jobs = vec![job.clone(), job.clone(), job];

    let results = engine.run_many(&jobs, &CancellationToken::new());
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .all(|r| r.defaults_used.chemical));
}

#[test]
fn test_expired_spills_are_forgotten_by_later_runs() {
    let (engine, clock) = engine_with_clock(Duration::from_secs(5));
    let tracked = CooldownTracker::DEFAULT_PRUNE_THRESHOLD;
    for n in 0..tracked {
        assert!(run_once(&engine, &spill(&format!("sched-{n}"))).is_ok());
    }
    assert_eq!(engine.cooldown().len(), tracked);

    // Every earlier window has expired by the next scheduling pass
    clock.advance(Duration::from_secs(6));
    assert!(run_once(&engine, &spill("sched-next")).is_ok());
    assert_eq!(engine.cooldown().len(), 1);
}
