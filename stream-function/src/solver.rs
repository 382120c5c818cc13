use crate::config::{SolveParameters, SweepOrder};
use crate::error::SolverError;
use crate::field::{max_abs, value_range, StreamFunctionField, VelocityField};
use crate::grid::Grid;
use rayon::prelude::*;
use std::fmt;

/// How far apart progress reports are, in sweeps.
const REPORT_PERIOD: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// Residual dropped below the tolerance.
    Converged,
    /// Ran out of sweeps first. The last iterate is still returned.
    IterationBudgetExhausted,
}

/// Everything a solve produces.
#[derive(Debug, Clone)]
pub struct SolveResult {
    pub stream_function: StreamFunctionField,
    pub velocity: VelocityField,
    pub grid: Grid,
    pub iterations: usize,
    pub residual: f64,
    pub status: Convergence,
}

impl SolveResult {
    pub fn is_converged(&self) -> bool {
        self.status == Convergence::Converged
    }

    /// Treat an exhausted budget as an error.
    pub fn require_converged(self) -> Result<Self, SolverError> {
        match self.status {
            Convergence::Converged => Ok(self),
            Convergence::IterationBudgetExhausted => Err(SolverError::ConvergenceNotReached {
                iterations: self.iterations,
                residual: self.residual,
            }),
        }
    }

    /// One-line status for a caption or status bar.
    pub fn summary(&self) -> String {
        self.to_string()
    }

    pub fn log_statistics(&self) {
        let (lo, hi) = self.stream_function.range();
        let laplacian = self.stream_function.laplacian(self.grid.dx, self.grid.dy);
        let (lap_lo, lap_hi) = value_range(&laplacian);
        log::info!("Stream function range: [{:.4}, {:.4}]", lo, hi);
        log::info!("Laplacian range: [{:.6e}, {:.6e}]", lap_lo, lap_hi);
        log::info!(
            "Max |laplacian psi| (should be close to 0): {:.6e}",
            max_abs(&laplacian)
        );
        log::info!("Max speed: {:.4}", self.velocity.max_speed());
    }
}

impl fmt::Display for SolveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Convergence::Converged => write!(
                f,
                "converged after {} sweeps (residual {:.2e})",
                self.iterations, self.residual
            ),
            Convergence::IterationBudgetExhausted => write!(
                f,
                "not converged after {} sweeps (residual {:.2e})",
                self.iterations, self.residual
            ),
        }
    }
}

/// Relaxes the channel stream function towards a solution of Laplace's
/// equation. Owns the field for the duration of one solve.
pub struct StreamFunctionSolver<'a> {
    params: &'a SolveParameters,
    grid: Grid,
    field: StreamFunctionField,
    iterations: usize,
    residual: f64,
    // Stencil weights: 1/dx^2, 1/dy^2 and their combined diagonal
    cx: f64,
    cy: f64,
    diag: f64,
}

impl<'a> StreamFunctionSolver<'a> {
    pub fn new(params: &'a SolveParameters) -> Result<Self, SolverError> {
        params.validate()?;
        let grid = *params.grid();
        let field = StreamFunctionField::channel(&grid, params.inlet_velocity);
        let cx = 1.0 / (grid.dx * grid.dx);
        let cy = 1.0 / (grid.dy * grid.dy);

        Ok(Self {
            params,
            grid,
            field,
            iterations: 0,
            residual: f64::INFINITY,
            cx,
            cy,
            diag: 2.0 * cx + 2.0 * cy,
        })
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn residual(&self) -> f64 {
        self.residual
    }

    pub fn field(&self) -> &StreamFunctionField {
        &self.field
    }

    pub fn is_finished(&self) -> bool {
        self.residual < self.params.tolerance || self.iterations >= self.params.max_iterations
    }

    /// One full sweep over the interior. Returns the largest change.
    pub fn sweep(&mut self) -> f64 {
        let residual = match self.params.sweep {
            SweepOrder::GaussSeidel => self.sweep_gauss_seidel(),
            SweepOrder::RedBlack => self.sweep_red_black(),
        };
        self.iterations += 1;
        self.residual = residual;
        residual
    }

    fn stencil(&self, i: usize, j: usize) -> f64 {
        let psi = &self.field.psi;
        ((psi[[i + 1, j]] + psi[[i - 1, j]]) * self.cy
            + (psi[[i, j + 1]] + psi[[i, j - 1]]) * self.cx)
            / self.diag
    }

    // Row-major, in place: neighbours updated earlier in this sweep are used
    // immediately.
    fn sweep_gauss_seidel(&mut self) -> f64 {
        let (ny, nx) = self.field.dim();
        let mut max_change = 0.0_f64;

        for i in 1..ny - 1 {
            for j in 1..nx - 1 {
                let updated = self.stencil(i, j);
                let change = (updated - self.field.psi[[i, j]]).abs();
                max_change = max_change.max(change);
                self.field.psi[[i, j]] = updated;
            }
        }
        max_change
    }

    // Points of one colour only read points of the other colour, so each half
    // sweep can be computed in parallel and applied afterwards.
    fn sweep_red_black(&mut self) -> f64 {
        let (ny, nx) = self.field.dim();
        let mut max_change = 0.0_f64;

        for colour in 0..2 {
            let indices: Vec<(usize, usize)> = (1..ny - 1)
                .flat_map(|i| (1..nx - 1).map(move |j| (i, j)))
                .filter(|&(i, j)| (i + j) % 2 == colour)
                .collect();

            let updates: Vec<(usize, usize, f64)> = indices
                .par_iter()
                .map(|&(i, j)| (i, j, self.stencil(i, j)))
                .collect();

            for (i, j, updated) in updates {
                let change = (updated - self.field.psi[[i, j]]).abs();
                max_change = max_change.max(change);
                self.field.psi[[i, j]] = updated;
            }
        }
        max_change
    }

    /// Sweep until converged or out of budget, then derive the velocity.
    pub fn run(mut self) -> SolveResult {
        log::debug!(
            "Relaxing {}x{} grid ({} interior points), tolerance {:e}, budget {} sweeps, {:?}",
            self.grid.nx,
            self.grid.ny,
            self.grid.interior_points(),
            self.params.tolerance,
            self.params.max_iterations,
            self.params.sweep
        );

        while !self.is_finished() {
            self.sweep();

            if self.iterations % REPORT_PERIOD == 0 {
                log::trace!(
                    "Sweep {}/{} residual {:.3e}",
                    self.iterations,
                    self.params.max_iterations,
                    self.residual
                );
            }
        }

        let status = if self.residual < self.params.tolerance {
            Convergence::Converged
        } else {
            Convergence::IterationBudgetExhausted
        };

        match status {
            Convergence::Converged => log::info!(
                "Converged after {} sweeps (residual {:.3e})",
                self.iterations,
                self.residual
            ),
            Convergence::IterationBudgetExhausted => log::warn!(
                "Iteration budget of {} sweeps exhausted (residual {:.3e} >= {:e})",
                self.iterations,
                self.residual,
                self.params.tolerance
            ),
        }

        let velocity = self.field.velocity(self.grid.dx, self.grid.dy);
        SolveResult {
            stream_function: self.field,
            velocity,
            grid: self.grid,
            iterations: self.iterations,
            residual: self.residual,
            status,
        }
    }
}

/// Solve the channel problem described by `params`.
pub fn solve(params: &SolveParameters) -> Result<SolveResult, SolverError> {
    Ok(StreamFunctionSolver::new(params)?.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn params(nx: usize, tolerance: f64, max_iterations: usize) -> SolveParameters {
        SolveParameters::new(1.0, 4.0, 2.0, nx, tolerance, max_iterations).unwrap()
    }

    #[test]
    fn test_single_sweep_matches_hand_computation() {
        // 5x3 grid: dx = 1, dy = 1, three interior points on the middle row
        let p = SolveParameters::new(1.0, 4.0, 2.0, 5, 1e-9, 1).unwrap();
        assert_eq!(p.ny(), 3);
        let mut solver = StreamFunctionSolver::new(&p).unwrap();
        solver.sweep();

        let psi = &solver.field().psi;
        // (0 + 2 + 1 + 0) / 4
        assert_abs_diff_eq!(psi[[1, 1]], 0.75, epsilon = 1e-12);
        // uses the freshly updated left neighbour
        assert_abs_diff_eq!(psi[[1, 2]], (0.0 + 2.0 + 0.75 + 0.0) / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(psi[[1, 3]], (0.0 + 2.0 + 0.6875 + 1.0) / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(solver.residual(), 0.921875, epsilon = 1e-12);
    }

    #[test]
    fn test_anisotropic_stencil_weights() {
        // dx = 2, dy = 0.5 weights the vertical neighbours sixteen times more
        let p = SolveParameters::new(1.0, 4.0, 1.0, 3, 1e-9, 1).unwrap();
        assert_eq!(p.ny(), 3);
        let mut solver = StreamFunctionSolver::new(&p).unwrap();
        solver.sweep();

        let (cx, cy) = (0.25, 4.0);
        let expected = ((1.0 + 0.0) * cy + (0.5 + 0.5) * cx) / (2.0 * cx + 2.0 * cy);
        assert_abs_diff_eq!(solver.field().psi[[1, 1]], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_budget_of_one_sweep() {
        let p = params(41, 1e-6, 1);
        let result = solve(&p).unwrap();
        assert_eq!(result.iterations, 1);
        assert_eq!(result.status, Convergence::IterationBudgetExhausted);
        assert!(result.summary().starts_with("not converged after 1 sweeps"));
    }

    #[test]
    fn test_converges_to_uniform_flow() {
        // psi = U*y satisfies every edge and Laplace's equation
        let p = params(41, 1e-10, 20_000);
        let result = solve(&p).unwrap();
        assert!(result.is_converged());

        let grid = result.grid;
        for i in 0..grid.ny {
            for j in 0..grid.nx {
                assert_abs_diff_eq!(
                    result.stream_function.psi[[i, j]],
                    grid.y_coord(i),
                    epsilon = 1e-7
                );
            }
        }
        for &u in result.velocity.u.iter() {
            assert_abs_diff_eq!(u, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_red_black_reaches_same_field() {
        let gs = solve(&params(21, 1e-10, 20_000)).unwrap();
        let rb = solve(&params(21, 1e-10, 20_000).with_sweep(SweepOrder::RedBlack)).unwrap();
        assert!(gs.is_converged() && rb.is_converged());

        for (a, b) in gs
            .stream_function
            .psi
            .iter()
            .zip(rb.stream_function.psi.iter())
        {
            assert_abs_diff_eq!(a, b, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_edited_parameters_rejected() {
        let mut p = params(21, 1e-6, 10);
        p.tolerance = 0.0;
        assert!(matches!(solve(&p), Err(SolverError::Configuration(_))));

        let mut p = params(21, 1e-6, 10);
        p.max_iterations = 0;
        assert!(matches!(solve(&p), Err(SolverError::Configuration(_))));

        let mut p = params(21, 1e-6, 10);
        p.inlet_velocity = f64::NAN;
        assert!(p.validate().is_err());
        assert!(matches!(solve(&p), Err(SolverError::Configuration(_))));
    }
}
