use orbital_mission_engine::core::StateVector;
use orbital_mission_engine::core::constants::MU_EARTH;
use orbital_mission_engine::propagate::{
    ExponentialAtmosphere, GravityWithDrag, MachDragTable, PointMassGravity, PropagationError,
    RungeKutta4,
};

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn specific_energy(state: &StateVector) -> f64 {
    let v2 = state.velocity_km_s.iter().map(|c| c * c).sum::<f64>();
    v2 / 2.0 - MU_EARTH / norm(&state.position_km)
}

#[test]
fn energy_is_conserved_over_a_full_orbit() {
    let r = 7_000.0;
    let v = (MU_EARTH / r).sqrt();
    let state = StateVector::new([r, 0.0, 0.0], [0.0, v, 0.0]);
    let period = std::f64::consts::TAU * (r.powi(3) / MU_EARTH).sqrt();

    let mut gravity = PointMassGravity { mu_km3_s2: MU_EARTH };
    let integrator = RungeKutta4::default();
    let result = integrator
        .propagate_for(&mut gravity, 0.0, &state, period)
        .expect("propagation completes");

    let drift = (specific_energy(&result.state) - specific_energy(&state)).abs()
        / specific_energy(&state).abs();
    assert!(drift < 1e-6, "relative energy drift {drift}");
    assert!((norm(&result.state.position_km) - r).abs() / r < 1e-4);
}

#[test]
fn termination_predicate_stops_at_a_radius_crossing() {
    // Elliptical orbit started at periapsis; terminate on the way out.
    let rp = 6_800.0;
    let vp = (MU_EARTH * (2.0 / rp - 1.0 / 10_000.0)).sqrt();
    let state = StateVector::new([rp, 0.0, 0.0], [0.0, vp, 0.0]);
    let target = 9_000.0;

    let mut gravity = PointMassGravity { mu_km3_s2: MU_EARTH };
    let integrator = RungeKutta4::default();
    let result = integrator
        .propagate_until(&mut gravity, 0.0, &state, &mut |_, s| {
            norm(&s.position_km) >= target
        })
        .expect("crossing reached");

    let r = norm(&result.state.position_km);
    // Overshoot is bounded by one accepted step.
    assert!(r >= target && r < target + 1_000.0, "stopped at {r}");
    assert!(result.time_s > 0.0);
}

#[test]
fn step_cap_surfaces_the_partial_state() {
    let r = 7_000.0;
    let v = (MU_EARTH / r).sqrt();
    let state = StateVector::new([r, 0.0, 0.0], [0.0, v, 0.0]);

    let mut gravity = PointMassGravity { mu_km3_s2: MU_EARTH };
    let integrator = RungeKutta4 {
        max_steps: 5,
        ..RungeKutta4::default()
    };
    let result = integrator.propagate_until(&mut gravity, 0.0, &state, &mut |_, _| false);

    match result {
        Err(PropagationError::StepLimit { steps, time_s, state }) => {
            assert_eq!(steps, 5);
            assert!(time_s > 0.0);
            assert!(norm(&state.position_km) > 0.0);
        }
        other => panic!("expected step limit, got {other:?}"),
    }
}

#[test]
fn invalid_step_bounds_are_rejected() {
    let state = StateVector::new([7_000.0, 0.0, 0.0], [0.0, 7.5, 0.0]);
    let mut gravity = PointMassGravity { mu_km3_s2: MU_EARTH };
    let integrator = RungeKutta4 {
        min_step_s: 10.0,
        max_step_s: 1.0,
        ..RungeKutta4::default()
    };
    let result = integrator.propagate_for(&mut gravity, 0.0, &state, 100.0);
    assert!(matches!(
        result,
        Err(PropagationError::InvalidStepBounds { .. })
    ));
}

#[test]
fn drag_bleeds_orbital_energy_gravity_alone_does_not() {
    // 200 km circular orbit in a thin non-rotating atmosphere.
    let r = 6_578.0;
    let v = (MU_EARTH / r).sqrt();
    let state = StateVector::new([r, 0.0, 0.0], [0.0, v, 0.0]);
    let atmosphere = ExponentialAtmosphere {
        body_radius_km: 6_378.0,
        surface_density_kg_m3: 1e-6,
        scale_height_km: 50.0,
        rotation_rate_rad_s: 0.0,
        speed_of_sound_km_s: 0.3,
    };
    let mut with_drag = GravityWithDrag::new(
        PointMassGravity { mu_km3_s2: MU_EARTH },
        atmosphere,
        MachDragTable::constant(2.2),
        200.0,
        None,
    );
    let mut gravity_only = PointMassGravity { mu_km3_s2: MU_EARTH };
    let integrator = RungeKutta4::default();
    let start_energy = specific_energy(&state);

    let dragged = integrator
        .propagate_for(&mut with_drag, 0.0, &state, 600.0)
        .unwrap();
    let coasted = integrator
        .propagate_for(&mut gravity_only, 0.0, &state, 600.0)
        .unwrap();

    let drag_loss = start_energy - specific_energy(&dragged.state);
    let coast_drift = (start_energy - specific_energy(&coasted.state)).abs();
    assert!(drag_loss > 0.0);
    assert!(drag_loss > 10.0 * coast_drift);
}
