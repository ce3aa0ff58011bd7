//! HeatField: per-point temperature state of one partition.
//!
//! All vectors are indexed by the local point index (ghosts included) and
//! are allocated once, at construction or restart.

use crate::geometry::metrics::Vec3;
use crate::heat_error::HeatError;
use crate::topology::point::PointId;

/// Temperature at every time level plus per-iteration work arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct HeatField {
    /// Current iterate (time level n+1).
    pub solution: Vec<f64>,
    /// Copy of the solution taken before an explicit or RK update.
    pub solution_old: Vec<f64>,
    /// Converged solution at time level n.
    pub time_n: Vec<f64>,
    /// Converged solution at time level n-1.
    pub time_n1: Vec<f64>,
    pub gradient: Vec<Vec3>,
    /// Local pseudo time step.
    pub delta_time: Vec<f64>,
    /// Accumulated viscous spectral radius.
    pub lambda_visc: Vec<f64>,
}

impl HeatField {
    /// Field with every time level set to `temperature`.
    pub fn uniform(n_points: usize, temperature: f64) -> Self {
        Self::from_solution(vec![temperature; n_points])
    }

    /// Field whose time levels all start from `solution`.
    pub fn from_solution(solution: Vec<f64>) -> Self {
        let n = solution.len();
        Self {
            solution_old: solution.clone(),
            time_n: solution.clone(),
            time_n1: solution.clone(),
            solution,
            gradient: vec![[0.0; 3]; n],
            delta_time: vec![0.0; n],
            lambda_visc: vec![0.0; n],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.solution.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.solution.is_empty()
    }

    #[inline]
    pub fn temperature(&self, p: PointId) -> f64 {
        self.solution[p.index()]
    }

    /// Overwrite the current temperature of `p`.
    pub fn set_temperature(&mut self, p: PointId, value: f64) -> Result<(), HeatError> {
        let len = self.len();
        let slot = self
            .solution
            .get_mut(p.index())
            .ok_or(HeatError::PointOutOfRange {
                point: p.index(),
                len,
            })?;
        *slot = value;
        Ok(())
    }

    #[inline]
    pub fn gradient(&self, p: PointId) -> Vec3 {
        self.gradient[p.index()]
    }

    /// `solution_old ← solution`.
    pub fn set_old_solution(&mut self) {
        self.solution_old.copy_from_slice(&self.solution);
    }

    /// Shift time levels after a converged physical step:
    /// `n-1 ← n`, `n ← current`.
    pub fn push_time_levels(&mut self) {
        self.time_n1.copy_from_slice(&self.time_n);
        self.time_n.copy_from_slice(&self.solution);
    }
}
