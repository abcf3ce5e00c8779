//! Transfer-window search over departure time and time of flight.
//!
//! The search subdivides the 2-D (departure, time-of-flight) domain instead
//! of scanning a full grid: a priority queue holds rectangular cells keyed by
//! the cost at their center, and each round splits the current best cell into
//! quarters. Work is metered so the search can run inside a tick loop.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orbital_core::{StateVector, vector};
use orbital_kepler::Conic;

use crate::NavigationError;
use crate::lambert::{self, TransferPath};

pub const WINDOW_DATASET_VERSION: u32 = 1;

/// Cost assigned to cells whose Lambert solve failed or whose transfer
/// violates the periapsis constraint.
pub const MAX_COST_KM_S: f64 = 1e9;

/// Source of body state vectors indexed by simulation seconds.
pub trait StateSource {
    fn state_at(&self, time_s: f64) -> Option<StateVector>;
}

impl StateSource for Conic {
    fn state_at(&self, time_s: f64) -> Option<StateVector> {
        self.state_vector_at(time_s).ok()
    }
}

impl<F> StateSource for F
where
    F: Fn(f64) -> Option<StateVector>,
{
    fn state_at(&self, time_s: f64) -> Option<StateVector> {
        self(time_s)
    }
}

/// Rectangular search domain.
#[derive(Debug, Clone, Copy)]
pub struct SearchBounds {
    pub depart_start_s: f64,
    pub depart_end_s: f64,
    pub tof_min_s: f64,
    pub tof_max_s: f64,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub mu_km3_s2: f64,
    /// Cells are not split below these half-extents.
    pub min_cell_depart_s: f64,
    pub min_cell_tof_s: f64,
    /// Transfers dipping below this periapsis radius are rejected.
    pub min_periapsis_km: Option<f64>,
    /// Try the long-way branch in addition to the short way.
    pub include_long_way: bool,
}

/// One evaluated transfer candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferSample {
    pub depart_s: f64,
    pub arrive_s: f64,
    pub tof_s: f64,
    pub dv_depart_km_s: f64,
    pub dv_arrive_km_s: f64,
    pub dv_total_km_s: f64,
    pub long_way: bool,
}

/// Search progress after one `step` call.
#[derive(Debug, Clone)]
pub enum SearchStatus {
    /// Budget exhausted; call `step` again to continue.
    Running { evaluations: usize },
    /// The best cell reached the minimum size; `best` is the answer.
    Converged { best: TransferSample },
    /// Nothing left to refine (or no feasible transfer exists).
    Exhausted { best: Option<TransferSample> },
}

#[derive(Debug, Clone)]
struct Cell {
    cost: f64,
    depart_center_s: f64,
    tof_center_s: f64,
    depart_half_s: f64,
    tof_half_s: f64,
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost
    }
}
impl Eq for Cell {}
impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Cell {
    // Reversed so the BinaryHeap pops the cheapest cell first.
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost)
    }
}

/// Resumable minimum-Δv search between two state sources.
pub struct TransferSearch<O: StateSource, D: StateSource> {
    origin: O,
    destination: D,
    bounds: SearchBounds,
    settings: SearchSettings,
    cells: BinaryHeap<Cell>,
    best: Option<TransferSample>,
    evaluations: usize,
    seeded: bool,
}

impl<O: StateSource, D: StateSource> TransferSearch<O, D> {
    pub fn new(origin: O, destination: D, bounds: SearchBounds, settings: SearchSettings) -> Self {
        Self {
            origin,
            destination,
            bounds,
            settings,
            cells: BinaryHeap::new(),
            best: None,
            evaluations: 0,
            seeded: false,
        }
    }

    /// Total Lambert evaluations performed so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn best(&self) -> Option<&TransferSample> {
        self.best.as_ref()
    }

    /// Run at most `budget` cell evaluations, then yield. A split is never
    /// started unless its whole set of children fits in the remaining budget,
    /// so a budget below four may make no progress.
    pub fn step(&mut self, budget: usize) -> SearchStatus {
        let mut used = 0;
        if budget == 0 {
            return SearchStatus::Running { evaluations: 0 };
        }

        if !self.seeded {
            self.seeded = true;
            let depart_half = (self.bounds.depart_end_s - self.bounds.depart_start_s) / 2.0;
            let tof_half = (self.bounds.tof_max_s - self.bounds.tof_min_s) / 2.0;
            let root = self.evaluate_cell(
                self.bounds.depart_start_s + depart_half,
                self.bounds.tof_min_s + tof_half,
                depart_half,
                tof_half,
            );
            used += 1;
            self.cells.push(root);
        }

        while used < budget {
            let Some(cell) = self.cells.pop() else {
                return SearchStatus::Exhausted {
                    best: self.best.clone(),
                };
            };

            let split_depart = cell.depart_half_s / 2.0 >= self.settings.min_cell_depart_s;
            let split_tof = cell.tof_half_s / 2.0 >= self.settings.min_cell_tof_s;
            if !split_depart && !split_tof {
                log::debug!(
                    "window search converged after {} evaluations (dv {:.3} km/s)",
                    self.evaluations,
                    cell.cost
                );
                return match &self.best {
                    Some(best) => SearchStatus::Converged { best: best.clone() },
                    None => SearchStatus::Exhausted { best: None },
                };
            }

            let depart_offsets: &[f64] = if split_depart { &[-0.5, 0.5] } else { &[0.0] };
            let tof_offsets: &[f64] = if split_tof { &[-0.5, 0.5] } else { &[0.0] };
            let children = depart_offsets.len() * tof_offsets.len();
            if used + children > budget {
                // Splitting this cell would overshoot the budget; put it back
                // untouched and resume from it on the next call.
                self.cells.push(cell);
                break;
            }
            let child_depart_half = if split_depart {
                cell.depart_half_s / 2.0
            } else {
                cell.depart_half_s
            };
            let child_tof_half = if split_tof {
                cell.tof_half_s / 2.0
            } else {
                cell.tof_half_s
            };

            for &dd in depart_offsets {
                for &dt in tof_offsets {
                    let child = self.evaluate_cell(
                        cell.depart_center_s + dd * cell.depart_half_s,
                        cell.tof_center_s + dt * cell.tof_half_s,
                        child_depart_half,
                        child_tof_half,
                    );
                    used += 1;
                    self.cells.push(child);
                }
            }
        }

        SearchStatus::Running { evaluations: used }
    }

    fn evaluate_cell(
        &mut self,
        depart_s: f64,
        tof_s: f64,
        depart_half_s: f64,
        tof_half_s: f64,
    ) -> Cell {
        self.evaluations += 1;
        let sampled = sample_point(
            &self.origin,
            &self.destination,
            &self.settings,
            depart_s,
            tof_s,
        );
        let cost = match sampled {
            Ok(sample) => {
                let cost = sample.dv_total_km_s;
                let improved = self
                    .best
                    .as_ref()
                    .is_none_or(|b| cost < b.dv_total_km_s);
                if improved {
                    log::debug!(
                        "new best transfer: depart {depart_s:.0}s tof {tof_s:.0}s dv {cost:.3} km/s"
                    );
                    self.best = Some(sample);
                }
                cost
            }
            Err(_) => MAX_COST_KM_S,
        };
        Cell {
            cost,
            depart_center_s: depart_s,
            tof_center_s: tof_s,
            depart_half_s,
            tof_half_s,
        }
    }
}

/// Evaluate one (departure, time-of-flight) point: solve Lambert on the
/// requested branches and keep the cheaper feasible one.
pub fn sample_point<O: StateSource, D: StateSource>(
    origin: &O,
    destination: &D,
    settings: &SearchSettings,
    depart_s: f64,
    tof_s: f64,
) -> Result<TransferSample, NavigationError> {
    let arrive_s = depart_s + tof_s;
    let origin = origin
        .state_at(depart_s)
        .ok_or(NavigationError::StateUnavailable { time_s: depart_s })?;
    let destination = destination
        .state_at(arrive_s)
        .ok_or(NavigationError::StateUnavailable { time_s: arrive_s })?;

    let mut best: Option<TransferSample> = None;
    let mut paths = vec![TransferPath::Short];
    if settings.include_long_way {
        paths.push(TransferPath::Long);
    }
    for path in paths {
        let solution = match lambert::solve(
            origin.position_km,
            destination.position_km,
            tof_s,
            settings.mu_km3_s2,
            path,
        ) {
            Ok(solution) => solution,
            Err(_) => continue,
        };

        if let Some(min_rp) = settings.min_periapsis_km {
            if solution.conic.periapsis_km() < min_rp {
                continue;
            }
        }

        let dv_depart = vector::norm(&vector::sub(&solution.v1_km_s, &origin.velocity_km_s));
        let dv_arrive =
            vector::norm(&vector::sub(&destination.velocity_km_s, &solution.v2_km_s));
        let sample = TransferSample {
            depart_s,
            arrive_s,
            tof_s,
            dv_depart_km_s: dv_depart,
            dv_arrive_km_s: dv_arrive,
            dv_total_km_s: dv_depart + dv_arrive,
            long_way: path == TransferPath::Long,
        };
        let better = best
            .as_ref()
            .is_none_or(|b| sample.dv_total_km_s < b.dv_total_km_s);
        if better {
            best = Some(sample);
        }
    }
    best.ok_or(NavigationError::DegenerateGeometry {
        reason: "no feasible branch at this cell",
    })
}

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("dataset version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Persisted result of a window search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowDataset {
    pub version: u32,
    pub origin: String,
    pub destination: String,
    pub depart_start_s: f64,
    pub depart_end_s: f64,
    pub tof_min_s: f64,
    pub tof_max_s: f64,
    pub samples: Vec<TransferSample>,
}

impl WindowDataset {
    pub fn new(
        origin: impl Into<String>,
        destination: impl Into<String>,
        bounds: &SearchBounds,
        samples: Vec<TransferSample>,
    ) -> Self {
        Self {
            version: WINDOW_DATASET_VERSION,
            origin: origin.into(),
            destination: destination.into(),
            depart_start_s: bounds.depart_start_s,
            depart_end_s: bounds.depart_end_s,
            tof_min_s: bounds.tof_min_s,
            tof_max_s: bounds.tof_max_s,
            samples,
        }
    }

    /// Cheapest sample in the dataset.
    pub fn baseline_sample(&self) -> Option<&TransferSample> {
        self.samples.iter().min_by(|a, b| {
            a.dv_total_km_s
                .partial_cmp(&b.dv_total_km_s)
                .unwrap_or(Ordering::Equal)
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), WindowError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, WindowError> {
        let file = File::open(path)?;
        let dataset: Self = serde_json::from_reader(BufReader::new(file))?;
        if dataset.version != WINDOW_DATASET_VERSION {
            return Err(WindowError::UnsupportedVersion {
                found: dataset.version,
                expected: WINDOW_DATASET_VERSION,
            });
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dataset_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("window.json");
        let bounds = SearchBounds {
            depart_start_s: 0.0,
            depart_end_s: 100.0,
            tof_min_s: 10.0,
            tof_max_s: 50.0,
        };
        let dataset = WindowDataset::new(
            "earth",
            "mars",
            &bounds,
            vec![TransferSample {
                depart_s: 5.0,
                arrive_s: 25.0,
                tof_s: 20.0,
                dv_depart_km_s: 3.0,
                dv_arrive_km_s: 2.0,
                dv_total_km_s: 5.0,
                long_way: false,
            }],
        );
        dataset.save(&path).unwrap();
        let loaded = WindowDataset::load(&path).unwrap();
        assert_eq!(loaded.version, WINDOW_DATASET_VERSION);
        assert_eq!(loaded.samples.len(), 1);
        assert!((loaded.baseline_sample().unwrap().dv_total_km_s - 5.0).abs() < 1e-12);
    }
}
