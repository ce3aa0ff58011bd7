//! Iterative solvers for the per-partition implicit system.
//!
//! The heat solver only depends on the [`LinearSolver`] trait; [`BiCgStab`]
//! with a Jacobi preconditioner is the default implementation.

use crate::config::LinearSolverConfig;
use crate::heat_error::HeatError;
use crate::linalg::sparse::SparseMatrix;

const BREAKDOWN_TOL: f64 = 1e-30;
const DIVERGENCE_FACTOR: f64 = 1e6;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    Converged,
    MaxIterationsReached,
    Diverged,
    Stagnated,
}

/// Outcome of one linear solve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolveReport {
    pub status: SolverStatus,
    pub iterations: usize,
    pub residual_norm: f64,
    pub initial_residual_norm: f64,
}

impl SolveReport {
    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    fn converged_at_start(norm: f64) -> Self {
        Self {
            status: SolverStatus::Converged,
            iterations: 0,
            residual_norm: norm,
            initial_residual_norm: norm,
        }
    }
}

/// Solver for `A·x = b` with `x` holding the initial guess on entry.
pub trait LinearSolver: Send {
    /// Only a non-finite result is an error; non-convergence is reported in
    /// the returned status.
    fn solve(
        &mut self,
        matrix: &SparseMatrix,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveReport, HeatError>;

    fn name(&self) -> &'static str;
}

/// `z = M⁻¹·r`.
pub trait Preconditioner: Send {
    fn apply(&self, r: &[f64], z: &mut [f64]);
    fn update(&mut self, matrix: &SparseMatrix);
}

/// Diagonal scaling; rows with a vanishing diagonal are left unscaled.
#[derive(Clone, Debug, Default)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        for ((zi, ri), d) in z.iter_mut().zip(r).zip(&self.inv_diag) {
            *zi = ri * d;
        }
    }

    fn update(&mut self, matrix: &SparseMatrix) {
        self.inv_diag = matrix
            .diagonal()
            .into_iter()
            .map(|d| if d.abs() > 1e-14 { 1.0 / d } else { 1.0 })
            .collect();
    }
}

/// Preconditioned BiCGStab with preallocated work vectors.
#[derive(Clone, Debug)]
pub struct BiCgStab<P = JacobiPreconditioner> {
    config: LinearSolverConfig,
    precond: P,
    r: Vec<f64>,
    r0: Vec<f64>,
    p: Vec<f64>,
    v: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
    p_hat: Vec<f64>,
    s_hat: Vec<f64>,
}

impl BiCgStab<JacobiPreconditioner> {
    pub fn new(config: LinearSolverConfig) -> Self {
        Self::with_preconditioner(config, JacobiPreconditioner::default())
    }
}

impl<P: Preconditioner> BiCgStab<P> {
    pub fn with_preconditioner(config: LinearSolverConfig, precond: P) -> Self {
        Self {
            config,
            precond,
            r: Vec::new(),
            r0: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            s: Vec::new(),
            t: Vec::new(),
            p_hat: Vec::new(),
            s_hat: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        for work in [
            &mut self.r,
            &mut self.r0,
            &mut self.p,
            &mut self.v,
            &mut self.s,
            &mut self.t,
            &mut self.p_hat,
            &mut self.s_hat,
        ] {
            work.clear();
            work.resize(n, 0.0);
        }
    }

    fn iterate(&mut self, matrix: &SparseMatrix, b: &[f64], x: &mut [f64]) -> SolveReport {
        let n = b.len();
        self.ensure_workspace(n);
        self.precond.update(matrix);

        matrix.mul_vec(x, &mut self.r);
        for (ri, bi) in self.r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        let initial = norm2(&self.r);
        if initial < self.config.atol {
            return SolveReport::converged_at_start(initial);
        }
        let target = (self.config.rtol * initial).max(self.config.atol);
        self.r0.copy_from_slice(&self.r);

        let (mut rho_old, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let report = |status, iterations, residual_norm| SolveReport {
            status,
            iterations,
            residual_norm,
            initial_residual_norm: initial,
        };

        for iter in 0..self.config.max_iter {
            let rho = dot(&self.r0, &self.r);
            if rho.abs() < BREAKDOWN_TOL {
                return report(SolverStatus::Stagnated, iter, norm2(&self.r));
            }
            let beta = if iter == 0 {
                0.0
            } else {
                (rho / rho_old) * (alpha / omega)
            };
            rho_old = rho;
            for k in 0..n {
                self.p[k] = self.r[k] + beta * (self.p[k] - omega * self.v[k]);
            }

            self.precond.apply(&self.p, &mut self.p_hat);
            matrix.mul_vec(&self.p_hat, &mut self.v);
            let r0v = dot(&self.r0, &self.v);
            if r0v.abs() < BREAKDOWN_TOL {
                return report(SolverStatus::Stagnated, iter, norm2(&self.r));
            }
            alpha = rho / r0v;
            for k in 0..n {
                self.s[k] = self.r[k] - alpha * self.v[k];
            }
            let s_norm = norm2(&self.s);
            if s_norm <= target {
                axpy(alpha, &self.p_hat, x);
                return report(SolverStatus::Converged, iter + 1, s_norm);
            }

            self.precond.apply(&self.s, &mut self.s_hat);
            matrix.mul_vec(&self.s_hat, &mut self.t);
            let tt = dot(&self.t, &self.t);
            omega = if tt < BREAKDOWN_TOL {
                0.0
            } else {
                dot(&self.t, &self.s) / tt
            };
            axpy(alpha, &self.p_hat, x);
            if omega.abs() < BREAKDOWN_TOL {
                return report(SolverStatus::Stagnated, iter + 1, s_norm);
            }
            axpy(omega, &self.s_hat, x);
            for k in 0..n {
                self.r[k] = self.s[k] - omega * self.t[k];
            }

            let res = norm2(&self.r);
            log::trace!("BiCGStab iter {}: residual = {:.6e}", iter + 1, res);
            if res <= target {
                return report(SolverStatus::Converged, iter + 1, res);
            }
            if !res.is_finite() || res > DIVERGENCE_FACTOR * initial {
                return report(SolverStatus::Diverged, iter + 1, res);
            }
        }
        report(
            SolverStatus::MaxIterationsReached,
            self.config.max_iter,
            norm2(&self.r),
        )
    }
}

impl<P: Preconditioner> LinearSolver for BiCgStab<P> {
    fn solve(
        &mut self,
        matrix: &SparseMatrix,
        b: &[f64],
        x: &mut [f64],
    ) -> Result<SolveReport, HeatError> {
        let report = self.iterate(matrix, b, x);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(HeatError::LinearSolve(format!(
                "non-finite solution after {} iterations ({:?})",
                report.iterations, report.status
            )));
        }
        Ok(report)
    }

    fn name(&self) -> &'static str {
        "BiCGStab"
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm2(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[inline]
fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}
