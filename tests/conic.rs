use orbital_mission_engine::core::constants::MU_EARTH;
use orbital_mission_engine::kepler::{Conic, KeplerianElements};

fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[test]
fn circular_orbit_period_matches_vis_viva() {
    let r = 6_771.0;
    let elements = KeplerianElements::from_semi_major_axis(r, 0.0, 0.0, 0.0, 0.0, 0.0);
    let conic = Conic::from_elements(elements, MU_EARTH, 0.0);

    let expected = std::f64::consts::TAU * (r.powi(3) / MU_EARTH).sqrt();
    let period = conic.period_s().expect("elliptic orbit has a period");
    assert!((period - expected).abs() / expected < 1e-12);

    // A quarter period later the position has swept 90 degrees.
    let quarter = conic.state_vector_at(period / 4.0).unwrap();
    assert!(quarter.position_km[0].abs() < 1.0);
    assert!((quarter.position_km[1] - r).abs() < 1.0);
}

#[test]
fn apsis_speeds_obey_vis_viva() {
    let elements = KeplerianElements::from_semi_major_axis(10_000.0, 0.3, 0.4, 1.0, 2.0, 0.0);
    let conic = Conic::from_elements(elements, MU_EARTH, 0.0);

    let a = 10_000.0;
    let rp = conic.periapsis_km();
    let ra = conic.apoapsis_km().expect("elliptic orbit has an apoapsis");
    assert!((rp - a * 0.7).abs() < 1e-6);
    assert!((ra - a * 1.3).abs() < 1e-6);

    let vp_expected = (MU_EARTH * (2.0 / rp - 1.0 / a)).sqrt();
    let va_expected = (MU_EARTH * (2.0 / ra - 1.0 / a)).sqrt();
    assert!((conic.max_speed_km_s() - vp_expected).abs() < 1e-9);
    assert!((conic.min_speed_km_s().unwrap() - va_expected).abs() < 1e-9);

    // The epoch state starts at periapsis (true anomaly zero).
    let epoch_state = conic.state_vector_at_epoch();
    assert!((norm(&epoch_state.position_km) - rp).abs() < 1e-6);
    assert!((norm(&epoch_state.velocity_km_s) - vp_expected).abs() < 1e-9);
}

#[test]
fn hyperbolic_orbit_has_no_period_or_apoapsis() {
    let elements = KeplerianElements::from_semi_major_axis(-15_000.0, 1.5, 0.1, 0.0, 0.0, 0.0);
    let conic = Conic::from_elements(elements, MU_EARTH, 0.0);

    assert!(conic.period_s().is_none());
    assert!(conic.apoapsis_km().is_none());
    assert!(conic.min_speed_km_s().is_none());

    // Outbound from periapsis the radius grows monotonically.
    let mut last = conic.periapsis_km();
    for &t in &[1_000.0, 5_000.0, 20_000.0] {
        let r = norm(&conic.state_vector_at(t).unwrap().position_km);
        assert!(r > last, "radius should grow outbound: {r} vs {last}");
        last = r;
    }
}

#[test]
fn state_round_trip_preserves_the_orbit() {
    let elements = KeplerianElements::from_semi_major_axis(8_200.0, 0.12, 0.9, 2.2, 0.6, 1.1);
    let conic = Conic::from_elements(elements, MU_EARTH, 500.0);

    let state = conic.state_vector_at(3_000.0).unwrap();
    let rebuilt = Conic::from_state_vector(&state, MU_EARTH, 3_000.0).unwrap();

    // Both conics predict the same future state.
    let ahead = conic.state_vector_at(9_000.0).unwrap();
    let ahead_rebuilt = rebuilt.state_vector_at(9_000.0).unwrap();
    for axis in 0..3 {
        assert!((ahead.position_km[axis] - ahead_rebuilt.position_km[axis]).abs() < 1e-3);
        assert!((ahead.velocity_km_s[axis] - ahead_rebuilt.velocity_km_s[axis]).abs() < 1e-8);
    }
}
