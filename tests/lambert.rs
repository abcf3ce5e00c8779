use orbital_mission_engine::core::constants::{AU_KM, MU_SUN, SECONDS_PER_DAY};
use orbital_mission_engine::transfer::{NavigationError, TransferPath, solve_lambert};

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[test]
fn quarter_orbit_on_a_circle_recovers_circular_speed() {
    let r1 = [AU_KM, 0.0, 0.0];
    let r2 = [0.0, AU_KM, 0.0];
    let tof = (std::f64::consts::PI / 2.0) * (AU_KM.powi(3) / MU_SUN).sqrt();

    let solution = solve_lambert(r1, r2, tof, MU_SUN, TransferPath::Short).expect("lambert solve");
    let expected = (MU_SUN / AU_KM).sqrt();
    assert!((norm(&solution.v1_km_s) - expected).abs() < 1e-3);
    assert!((norm(&solution.v2_km_s) - expected).abs() < 1e-3);
    // Departure velocity is tangential for the circular case.
    assert!(solution.v1_km_s[1] > 0.99 * expected);
}

#[test]
fn transfer_conic_lands_on_the_arrival_position() {
    let angle = 110f64.to_radians();
    let r1 = [AU_KM, 0.0, 0.0];
    let r2 = [
        1.3 * AU_KM * angle.cos(),
        1.3 * AU_KM * angle.sin(),
        0.02 * AU_KM,
    ];
    let tof = 200.0 * SECONDS_PER_DAY;

    let solution = solve_lambert(r1, r2, tof, MU_SUN, TransferPath::Short).expect("lambert solve");

    // The solution's conic is epoch-zero at departure; propagating it by the
    // time of flight must land on r2.
    let arrived = solution.conic.state_vector_at(tof).expect("propagate");
    for axis in 0..3 {
        assert!(
            (arrived.position_km[axis] - r2[axis]).abs() < 1.0,
            "axis {axis}: {} vs {}",
            arrived.position_km[axis],
            r2[axis]
        );
    }
}

#[test]
fn long_way_sweeps_the_complementary_angle() {
    let r1 = [AU_KM, 0.0, 0.0];
    let angle = 60f64.to_radians();
    let r2 = [AU_KM * angle.cos(), AU_KM * angle.sin(), 0.0];
    // A circular orbit covers 60 degrees in ~61 days and 300 degrees in ~304.
    let short = solve_lambert(r1, r2, 61.0 * SECONDS_PER_DAY, MU_SUN, TransferPath::Short)
        .expect("short path");
    let long = solve_lambert(r1, r2, 304.0 * SECONDS_PER_DAY, MU_SUN, TransferPath::Long)
        .expect("long path");

    // Short way departs prograde (+y), long way retrograde (-y).
    assert!(short.v1_km_s[1] > 0.0);
    assert!(long.v1_km_s[1] < 0.0);
}

#[test]
fn degenerate_inputs_are_rejected() {
    let r1 = [AU_KM, 0.0, 0.0];
    let r2 = [-AU_KM, 1.0, 0.0]; // within the near-180-degree exclusion
    let tof = 100.0 * SECONDS_PER_DAY;
    assert!(matches!(
        solve_lambert(r1, r2, tof, MU_SUN, TransferPath::Short),
        Err(NavigationError::DegenerateGeometry { .. })
    ));

    assert!(matches!(
        solve_lambert(r1, [0.0, AU_KM, 0.0], -1.0, MU_SUN, TransferPath::Short),
        Err(NavigationError::InvalidTimeOfFlight { .. })
    ));
}
