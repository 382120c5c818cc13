use crate::grid::Grid;
use ndarray::{Array2, Axis};

/// Stream function samples, shape `(ny, nx)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamFunctionField {
    pub psi: Array2<f64>,
}

impl StreamFunctionField {
    pub fn zeros(grid: &Grid) -> Self {
        Self {
            psi: Array2::zeros(grid.shape()),
        }
    }

    /// Zero field with the channel's Dirichlet edges imposed.
    pub fn channel(grid: &Grid, inlet_velocity: f64) -> Self {
        let mut field = Self::zeros(grid);
        field.apply_channel_boundaries(grid, inlet_velocity);
        field
    }

    /// Inlet and outlet carry the uniform profile `U*y`; the bottom wall is the
    /// zero streamline and the top wall carries the full flux `U*H`.
    pub fn apply_channel_boundaries(&mut self, grid: &Grid, inlet_velocity: f64) {
        let (ny, nx) = self.psi.dim();

        // Left (inlet) and right (outlet)
        for i in 0..ny {
            let profile = inlet_velocity * grid.y_coord(i);
            self.psi[[i, 0]] = profile;
            self.psi[[i, nx - 1]] = profile;
        }

        // Bottom and top walls, corners included
        let top = inlet_velocity * grid.height;
        for j in 0..nx {
            self.psi[[0, j]] = 0.0;
            self.psi[[ny - 1, j]] = top;
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.psi.dim()
    }

    /// Discrete five-point Laplacian on interior points; zero on the edges.
    pub fn laplacian(&self, dx: f64, dy: f64) -> Array2<f64> {
        let (ny, nx) = self.psi.dim();
        let mut lap = Array2::<f64>::zeros((ny, nx));
        let psi = &self.psi;

        for i in 1..ny - 1 {
            for j in 1..nx - 1 {
                let d2psi_dx2 = (psi[[i, j + 1]] - 2.0 * psi[[i, j]] + psi[[i, j - 1]]) / (dx * dx);
                let d2psi_dy2 = (psi[[i + 1, j]] - 2.0 * psi[[i, j]] + psi[[i - 1, j]]) / (dy * dy);
                lap[[i, j]] = d2psi_dx2 + d2psi_dy2;
            }
        }
        lap
    }

    pub fn max_abs_laplacian(&self, dx: f64, dy: f64) -> f64 {
        max_abs(&self.laplacian(dx, dy))
    }

    /// `(min, max)` of the field.
    pub fn range(&self) -> (f64, f64) {
        value_range(&self.psi)
    }

    /// `u = dpsi/dy`, `v = -dpsi/dx`.
    pub fn velocity(&self, dx: f64, dy: f64) -> VelocityField {
        let u = gradient(&self.psi, Axis(0), dy);
        let v = gradient(&self.psi, Axis(1), dx).mapv(|d| -d);
        VelocityField { u, v }
    }
}

/// One arrow of a sub-sampled vector plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorSample {
    pub i: usize,
    pub j: usize,
    pub u: f64,
    pub v: f64,
}

/// Velocity components derived from the stream function.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityField {
    pub u: Array2<f64>,
    pub v: Array2<f64>,
}

impl VelocityField {
    pub fn divergence(&self, dx: f64, dy: f64) -> Array2<f64> {
        let du_dx = gradient(&self.u, Axis(1), dx);
        let dv_dy = gradient(&self.v, Axis(0), dy);
        du_dx + dv_dy
    }

    pub fn magnitude(&self) -> Array2<f64> {
        let mut mag = Array2::<f64>::zeros(self.u.dim());
        ndarray::Zip::from(&mut mag)
            .and(&self.u)
            .and(&self.v)
            .for_each(|m, &u, &v| *m = u.hypot(v));
        mag
    }

    pub fn max_speed(&self) -> f64 {
        self.magnitude().iter().copied().fold(0.0, f64::max)
    }

    /// Every `step`-th row and column, for arrow rendering.
    pub fn subsample(&self, step: usize) -> Vec<VectorSample> {
        let step = step.max(1);
        let (ny, nx) = self.u.dim();
        (0..ny)
            .step_by(step)
            .flat_map(|i| (0..nx).step_by(step).map(move |j| (i, j)))
            .map(|(i, j)| VectorSample {
                i,
                j,
                u: self.u[[i, j]],
                v: self.v[[i, j]],
            })
            .collect()
    }
}

/// Finite-difference derivative along `axis`: centered in the interior,
/// one-sided first order on the two end slices.
pub fn gradient(data: &Array2<f64>, axis: Axis, spacing: f64) -> Array2<f64> {
    let n = data.len_of(axis);
    let mut out = Array2::<f64>::zeros(data.dim());
    if n < 2 {
        return out;
    }

    for k in 1..n - 1 {
        let ahead = data.index_axis(axis, k + 1);
        let behind = data.index_axis(axis, k - 1);
        let mut slot = out.index_axis_mut(axis, k);
        ndarray::Zip::from(&mut slot)
            .and(&ahead)
            .and(&behind)
            .for_each(|o, &a, &b| *o = (a - b) / (2.0 * spacing));
    }

    for (edge, hi, lo) in [(0, 1, 0), (n - 1, n - 1, n - 2)] {
        let ahead = data.index_axis(axis, hi);
        let behind = data.index_axis(axis, lo);
        let mut slot = out.index_axis_mut(axis, edge);
        ndarray::Zip::from(&mut slot)
            .and(&ahead)
            .and(&behind)
            .for_each(|o, &a, &b| *o = (a - b) / spacing);
    }
    out
}

/// `(min, max)` over every sample.
pub fn value_range(data: &Array2<f64>) -> (f64, f64) {
    data.iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

pub fn max_abs(data: &Array2<f64>) -> f64 {
    data.iter().map(|v| v.abs()).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn small_grid() -> Grid {
        Grid::channel(4.0, 2.0, 9).unwrap()
    }

    #[test]
    fn test_channel_boundaries() {
        let grid = small_grid();
        let field = StreamFunctionField::channel(&grid, 1.5);
        let (ny, nx) = field.dim();
        assert_eq!((ny, nx), (5, 9));

        for i in 0..ny {
            assert_abs_diff_eq!(field.psi[[i, 0]], 1.5 * grid.y_coord(i), epsilon = 1e-12);
            assert_abs_diff_eq!(field.psi[[i, nx - 1]], 1.5 * grid.y_coord(i), epsilon = 1e-12);
        }
        for j in 0..nx {
            assert_eq!(field.psi[[0, j]], 0.0);
            assert_eq!(field.psi[[ny - 1, j]], 3.0);
        }
        assert_eq!(field.psi[[2, 4]], 0.0);
        assert_eq!(field.range(), (0.0, 3.0));
    }

    #[test]
    fn test_gradient_of_linear_field_is_exact() {
        // psi = 2x + 3y on a 5x9 grid
        let grid = small_grid();
        let mut field = StreamFunctionField::zeros(&grid);
        for i in 0..grid.ny {
            for j in 0..grid.nx {
                field.psi[[i, j]] = 2.0 * grid.x_coord(j) + 3.0 * grid.y_coord(i);
            }
        }

        let vel = field.velocity(grid.dx, grid.dy);
        for &u in vel.u.iter() {
            assert_abs_diff_eq!(u, 3.0, epsilon = 1e-12);
        }
        for &v in vel.v.iter() {
            assert_abs_diff_eq!(v, -2.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(vel.max_speed(), 13f64.sqrt(), epsilon = 1e-12);
        assert!(field.max_abs_laplacian(grid.dx, grid.dy) < 1e-9);
        assert!(max_abs(&vel.divergence(grid.dx, grid.dy)) < 1e-9);
    }

    #[test]
    fn test_laplacian_of_quadratic() {
        // psi = x^2 + y^2 -> laplacian 4 everywhere inside
        let grid = small_grid();
        let mut field = StreamFunctionField::zeros(&grid);
        for i in 0..grid.ny {
            for j in 0..grid.nx {
                field.psi[[i, j]] = grid.x_coord(j).powi(2) + grid.y_coord(i).powi(2);
            }
        }
        let lap = field.laplacian(grid.dx, grid.dy);
        assert_abs_diff_eq!(lap[[2, 4]], 4.0, epsilon = 1e-9);
        assert_eq!(lap[[0, 4]], 0.0);
    }

    #[test]
    fn test_subsample_strides_both_axes() {
        let grid = small_grid();
        let vel = StreamFunctionField::channel(&grid, 1.0).velocity(grid.dx, grid.dy);
        let samples = vel.subsample(4);
        // rows 0, 4 and columns 0, 4, 8
        assert_eq!(samples.len(), 6);
        assert_eq!((samples[5].i, samples[5].j), (4, 8));
        assert_eq!(vel.subsample(0).len(), grid.nx * grid.ny);
    }

    #[test]
    fn test_laplacian_range_of_paraboloid() {
        // psi = x^2 + y^2 has a Laplacian of 4 everywhere inside
        let grid = small_grid();
        let mut field = StreamFunctionField::zeros(&grid);
        for ((i, j), v) in field.psi.indexed_iter_mut() {
            let (x, y) = (grid.x_coord(j), grid.y_coord(i));
            *v = x * x + y * y;
        }
        let (lo, hi) = value_range(&field.laplacian(grid.dx, grid.dy));
        assert_abs_diff_eq!(lo, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(hi, 4.0, epsilon = 1e-9);
    }
}
