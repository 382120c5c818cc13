use crate::field::StreamFunctionField;
use crate::grid::Grid;
use std::f64::consts::PI;

/// Free stream plus a source at `(-a, 0)` and a sink at `(a, 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialFlow {
    pub free_stream: f64,
    pub source_strength: f64,
    pub sink_strength: f64,
    pub half_spacing: f64,
}

impl PotentialFlow {
    /// Free stream and a single source at the origin.
    pub fn source_in_stream(free_stream: f64, source_strength: f64) -> Self {
        Self {
            free_stream,
            source_strength,
            sink_strength: 0.0,
            half_spacing: 0.0,
        }
    }

    /// Equal source and sink: a Rankine oval when placed in a free stream.
    pub fn rankine(free_stream: f64, strength: f64, half_spacing: f64) -> Self {
        Self {
            free_stream,
            source_strength: strength,
            sink_strength: strength,
            half_spacing,
        }
    }

    pub fn stream_function(&self, x: f64, y: f64) -> f64 {
        let a = self.half_spacing;
        self.free_stream * y + self.source_strength / (2.0 * PI) * y.atan2(x + a)
            - self.sink_strength / (2.0 * PI) * y.atan2(x - a)
    }

    /// `(u, v)` at a point off the singularities.
    pub fn velocity(&self, x: f64, y: f64) -> (f64, f64) {
        let a = self.half_spacing;
        let (xs, xk) = (x + a, x - a);
        let rs2 = xs * xs + y * y;
        let rk2 = xk * xk + y * y;
        let ms = self.source_strength / (2.0 * PI);
        let mk = self.sink_strength / (2.0 * PI);
        let u = self.free_stream + ms * xs / rs2 - mk * xk / rk2;
        let v = ms * y / rs2 - mk * y / rk2;
        (u, v)
    }

    /// Upstream stagnation point of a source in a free stream, on the x axis.
    /// `None` without a free stream or a source.
    pub fn source_stagnation_point(&self) -> Option<(f64, f64)> {
        if self.free_stream == 0.0 || self.source_strength == 0.0 || self.sink_strength != 0.0 {
            return None;
        }
        let offset = self.source_strength / (2.0 * PI * self.free_stream);
        Some((-self.half_spacing - offset, 0.0))
    }

    /// Evaluate the stream function at every node of `grid`.
    pub fn evaluate(&self, grid: &Grid) -> StreamFunctionField {
        let mut field = StreamFunctionField::zeros(grid);
        for ((i, j), psi) in field.psi.indexed_iter_mut() {
            *psi = self.stream_function(grid.x_coord(j), grid.y_coord(i));
        }
        field
    }

    pub fn describe(&self) -> String {
        format!(
            "psi = {:.2} y + {:.2}/2pi atan2(y, x+{a}) - {:.2}/2pi atan2(y, x-{a})",
            self.free_stream,
            self.source_strength,
            self.sink_strength,
            a = self.half_spacing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_source_in_stream_closed_form() {
        let flow = PotentialFlow::source_in_stream(1.0, 2.0);
        let (x, y) = (1.0, 1.0);
        let expected = 1.0 + 2.0 / (2.0 * PI) * (PI / 4.0);
        assert_abs_diff_eq!(flow.stream_function(x, y), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_stagnation_point_has_zero_velocity() {
        let flow = PotentialFlow::source_in_stream(1.5, 3.0);
        let (xs, ys) = flow.source_stagnation_point().unwrap();
        assert_abs_diff_eq!(xs, -3.0 / (2.0 * PI * 1.5), epsilon = 1e-12);

        let (u, v) = flow.velocity(xs, ys);
        assert_abs_diff_eq!(u, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_matches_stream_function_derivatives() {
        let flow = PotentialFlow::rankine(1.0, 4.0, 1.0);
        let (x, y, h) = (0.3, 1.7, 1e-6);
        let dpsi_dy = (flow.stream_function(x, y + h) - flow.stream_function(x, y - h)) / (2.0 * h);
        let dpsi_dx = (flow.stream_function(x + h, y) - flow.stream_function(x - h, y)) / (2.0 * h);
        let (u, v) = flow.velocity(x, y);
        assert_abs_diff_eq!(u, dpsi_dy, epsilon = 1e-6);
        assert_abs_diff_eq!(v, -dpsi_dx, epsilon = 1e-6);
        assert!(flow.source_stagnation_point().is_none());
    }

    #[test]
    fn test_rankine_x_axis_outside_oval_is_dividing_streamline() {
        // Upstream of the source both angles are pi and cancel
        let flow = PotentialFlow::rankine(1.0, 2.0, 1.0);
        assert_abs_diff_eq!(flow.stream_function(-3.0, 1e-12), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_evaluate_on_centred_grid() {
        let flow = PotentialFlow::source_in_stream(2.0, 0.0);
        let grid = Grid::centred(5.0, 11);
        let field = flow.evaluate(&grid);
        assert_abs_diff_eq!(field.psi[[0, 3]], -10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(field.psi[[10, 7]], 10.0, epsilon = 1e-12);
    }
}
