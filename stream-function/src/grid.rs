use crate::error::SolverError;

/// Largest grid, in points, a solve may allocate.
pub const MAX_GRID_POINTS: usize = 50_000_000;

/// Uniform grid over a rectangular channel `[0, width] x [0, height]`.
///
/// Fields on this grid are stored as `(ny, nx)` arrays: row `i` is the y
/// index, column `j` the x index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub nx: usize, // Number of columns (x direction)
    pub ny: usize, // Number of rows (y direction)
    pub dx: f64,   // Grid spacing in x
    pub dy: f64,   // Grid spacing in y
    pub width: f64,
    pub height: f64,
    pub x0: f64, // Lower-left corner
    pub y0: f64,
}

impl Grid {
    /// Build the channel grid from the column count, deriving the row count
    /// from the aspect ratio and forcing it odd.
    pub fn channel(width: f64, height: f64, nx: usize) -> Result<Self, SolverError> {
        if !(width.is_finite() && width > 0.0) || !(height.is_finite() && height > 0.0) {
            return Err(SolverError::configuration(format!(
                "domain dimensions must be positive (width={}, height={})",
                width, height
            )));
        }
        if nx < 3 {
            return Err(SolverError::configuration(format!(
                "need at least 3 columns, got nx={}",
                nx
            )));
        }
        if nx % 2 == 0 {
            return Err(SolverError::configuration(format!(
                "column count must be odd, got nx={} (use nearest_odd)",
                nx
            )));
        }

        let ny = derive_rows(nx, width, height)?;
        Ok(Grid {
            nx,
            ny,
            dx: width / (nx - 1) as f64,
            dy: height / (ny - 1) as f64,
            width,
            height,
            x0: 0.0,
            y0: 0.0,
        })
    }

    /// Square grid centred on the origin, `[-extent, extent]` on both axes.
    pub fn centred(extent: f64, n: usize) -> Self {
        let n = n.max(2);
        let spacing = 2.0 * extent / (n - 1) as f64;
        Grid {
            nx: n,
            ny: n,
            dx: spacing,
            dy: spacing,
            width: 2.0 * extent,
            height: 2.0 * extent,
            x0: -extent,
            y0: -extent,
        }
    }

    pub fn x_coord(&self, j: usize) -> f64 {
        // linspace semantics: the last column lands exactly on `width`
        self.x0 + self.width * j as f64 / (self.nx - 1) as f64
    }

    pub fn y_coord(&self, i: usize) -> f64 {
        self.y0 + self.height * i as f64 / (self.ny - 1) as f64
    }

    pub fn in_bounds(&self, i: usize, j: usize) -> bool {
        i < self.ny && j < self.nx
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn interior_points(&self) -> usize {
        (self.nx - 2) * (self.ny - 2)
    }
}

/// Row count for a `width x height` channel with `nx` columns, always odd.
/// Fails when the aspect ratio asks for more than [`MAX_GRID_POINTS`].
pub fn derive_rows(nx: usize, width: f64, height: f64) -> Result<usize, SolverError> {
    let rows = ((nx - 1) as f64 * height / width).round() + 1.0;
    let limit = (MAX_GRID_POINTS / nx.max(1)) as f64;
    if !rows.is_finite() || rows > limit {
        return Err(SolverError::configuration(format!(
            "aspect ratio {}/{} with nx={} needs more than {} grid points",
            height, width, nx, MAX_GRID_POINTS
        )));
    }

    let rows = (rows as usize).max(3);
    if rows % 2 == 0 && (rows + 1) * nx > MAX_GRID_POINTS {
        return Err(SolverError::configuration(format!(
            "grid {}x{} exceeds {} points",
            nx,
            rows + 1,
            MAX_GRID_POINTS
        )));
    }
    Ok(if rows % 2 == 0 { rows + 1 } else { rows })
}

/// Coerce a user-supplied count to the nearest odd integer (ties round up).
pub fn nearest_odd(n: usize) -> usize {
    if n % 2 == 1 {
        n
    } else {
        n + 1
    }
}
