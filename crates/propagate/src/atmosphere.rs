//! Exponential atmosphere and Mach-keyed drag coefficient lookup.

use orbital_core::vector::{self, Vector3};

/// Exponential-density atmosphere attached to a rotating body.
#[derive(Debug, Clone)]
pub struct ExponentialAtmosphere {
    pub body_radius_km: f64,
    pub surface_density_kg_m3: f64,
    pub scale_height_km: f64,
    /// Body rotation rate about +Z; the airmass co-rotates.
    pub rotation_rate_rad_s: f64,
    /// Treated as constant with altitude.
    pub speed_of_sound_km_s: f64,
}

impl ExponentialAtmosphere {
    /// Density at a radius from the body center (kg/m³). Clamped to the
    /// surface density below the surface so a clipped trajectory does not
    /// see negative-altitude blowup.
    pub fn density_at(&self, radius_km: f64) -> f64 {
        let altitude_km = radius_km - self.body_radius_km;
        if altitude_km < 0.0 {
            return self.surface_density_kg_m3;
        }
        self.surface_density_kg_m3 * (-altitude_km / self.scale_height_km).exp()
    }

    /// Velocity of the co-rotating airmass at `position_km` (km/s).
    pub fn airmass_velocity_km_s(&self, position_km: &Vector3) -> Vector3 {
        let omega = [0.0, 0.0, self.rotation_rate_rad_s];
        vector::cross(&omega, position_km)
    }
}

/// Drag does not change meaningfully for smaller Mach moves; the cached
/// coefficient is reused until the change exceeds this.
pub const MACH_RECOMPUTE_THRESHOLD: f64 = 0.05;

/// Piecewise-linear Cd(Mach) table, sorted by Mach.
#[derive(Debug, Clone)]
pub struct MachDragTable {
    points: Vec<(f64, f64)>,
}

impl MachDragTable {
    /// Build from (mach, cd) samples. Samples get sorted by Mach.
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// Flat table for bodies where a constant coefficient is good enough.
    pub fn constant(cd: f64) -> Self {
        Self {
            points: vec![(0.0, cd)],
        }
    }

    /// Interpolated drag coefficient, clamped to the table endpoints.
    pub fn coefficient_at(&self, mach: f64) -> f64 {
        match self.points.as_slice() {
            [] => 0.0,
            [only] => only.1,
            points => {
                if mach <= points[0].0 {
                    return points[0].1;
                }
                if mach >= points[points.len() - 1].0 {
                    return points[points.len() - 1].1;
                }
                for pair in points.windows(2) {
                    let (m0, cd0) = pair[0];
                    let (m1, cd1) = pair[1];
                    if mach <= m1 {
                        let f = (mach - m0) / (m1 - m0);
                        return cd0 + f * (cd1 - cd0);
                    }
                }
                points[points.len() - 1].1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_decays_with_scale_height() {
        let atm = ExponentialAtmosphere {
            body_radius_km: 6371.0,
            surface_density_kg_m3: 1.225,
            scale_height_km: 8.5,
            rotation_rate_rad_s: 0.0,
            speed_of_sound_km_s: 0.34,
        };
        let at_surface = atm.density_at(6371.0);
        let one_scale_height = atm.density_at(6371.0 + 8.5);
        assert!((at_surface - 1.225).abs() < 1e-12);
        assert!((one_scale_height / at_surface - (-1.0f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn drag_table_interpolates_and_clamps() {
        let table = MachDragTable::new(vec![(2.0, 0.5), (1.0, 1.0)]);
        assert!((table.coefficient_at(0.5) - 1.0).abs() < 1e-12);
        assert!((table.coefficient_at(1.5) - 0.75).abs() < 1e-12);
        assert!((table.coefficient_at(3.0) - 0.5).abs() < 1e-12);
    }
}
