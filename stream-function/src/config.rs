use crate::error::SolverError;
use crate::grid::{nearest_odd, Grid};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Order in which interior points are visited during one relaxation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SweepOrder {
    /// Sequential row-major sweep, updated in place.
    #[default]
    GaussSeidel,
    /// Checkerboard colouring, each colour updated in parallel.
    RedBlack,
}

/// Everything one solve needs. Validated once on construction and never
/// mutated by the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveParameters {
    pub inlet_velocity: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub sweep: SweepOrder,
    grid: Grid,
}

impl SolveParameters {
    pub fn new(
        inlet_velocity: f64,
        width: f64,
        height: f64,
        nx: usize,
        tolerance: f64,
        max_iterations: usize,
    ) -> Result<Self, SolverError> {
        let params = Self {
            inlet_velocity,
            tolerance,
            max_iterations,
            sweep: SweepOrder::GaussSeidel,
            grid: Grid::channel(width, height, nx)?,
        };
        params.validate()?;
        Ok(params)
    }

    /// Check the knobs that stay public after construction. The grid is
    /// private and was checked when it was built.
    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.inlet_velocity.is_finite() {
            return Err(SolverError::configuration(format!(
                "inlet velocity must be finite, got {}",
                self.inlet_velocity
            )));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SolverError::configuration(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::configuration(
                "iteration budget must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn with_sweep(mut self, sweep: SweepOrder) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn width(&self) -> f64 {
        self.grid.width
    }

    pub fn height(&self) -> f64 {
        self.grid.height
    }

    pub fn nx(&self) -> usize {
        self.grid.nx
    }

    pub fn ny(&self) -> usize {
        self.grid.ny
    }
}

/// Channel geometry and inflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_inlet_velocity")]
    pub inlet_velocity: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_nx")]
    pub nx: usize,
}

fn default_inlet_velocity() -> f64 {
    1.0
}

fn default_width() -> f64 {
    4.0
}

fn default_height() -> f64 {
    2.0
}

fn default_nx() -> usize {
    81
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            inlet_velocity: default_inlet_velocity(),
            width: default_width(),
            height: default_height(),
            nx: default_nx(),
        }
    }
}

impl ChannelConfig {
    fn validate(&self) -> Result<()> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(anyhow!(
                "Channel dimensions must be positive (width={}, height={})",
                self.width,
                self.height
            ));
        }
        if self.nx < 3 {
            return Err(anyhow!("nx must be at least 3, got {}", self.nx));
        }
        Ok(())
    }
}

/// Relaxation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default)]
    pub sweep: SweepOrder,
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_max_iterations() -> usize {
    10_000
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            sweep: SweepOrder::default(),
        }
    }
}

impl SolverConfig {
    fn validate(&self) -> Result<()> {
        if self.tolerance <= 0.0 {
            return Err(anyhow!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be at least 1"));
        }
        Ok(())
    }
}

/// Visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    #[serde(default = "default_vector_scale")]
    pub vector_scale: f64,
    #[serde(default = "default_arrow_step")]
    pub arrow_step: usize,
    #[serde(default = "default_contour_levels")]
    pub contour_levels: usize,
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_image_width() -> u32 {
    1200
}

fn default_image_height() -> u32 {
    700
}

fn default_vector_scale() -> f64 {
    0.05
}

fn default_arrow_step() -> usize {
    4
}

fn default_contour_levels() -> usize {
    20
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            vector_scale: default_vector_scale(),
            arrow_step: default_arrow_step(),
            contour_levels: default_contour_levels(),
        }
    }
}

impl VisualizationConfig {
    fn validate(&self) -> Result<()> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        if self.vector_scale <= 0.0 {
            return Err(anyhow!(
                "vector_scale must be positive, got {}",
                self.vector_scale
            ));
        }
        if self.arrow_step == 0 {
            return Err(anyhow!("arrow_step must be at least 1"));
        }
        Ok(())
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub visualization: VisualizationConfig,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all sections. An even column count is coerced to the nearest
    /// odd one rather than rejected.
    pub fn validate(&mut self) -> Result<()> {
        self.channel.validate()?;
        self.solver.validate()?;
        self.visualization.validate()?;

        let odd = nearest_odd(self.channel.nx);
        if odd != self.channel.nx {
            log::warn!("nx={} is even, using {}", self.channel.nx, odd);
            self.channel.nx = odd;
        }
        Ok(())
    }

    pub fn solve_parameters(&self) -> Result<SolveParameters, SolverError> {
        let params = SolveParameters::new(
            self.channel.inlet_velocity,
            self.channel.width,
            self.channel.height,
            nearest_odd(self.channel.nx),
            self.solver.tolerance,
            self.solver.max_iterations,
        )?;
        Ok(params.with_sweep(self.solver.sweep))
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        let ny = crate::grid::derive_rows(
            nearest_odd(self.channel.nx),
            self.channel.width,
            self.channel.height,
        )
        .map_or_else(|_| "?".to_string(), |ny| ny.to_string());
        log::info!("=== Channel Configuration ===");
        log::info!(
            "Channel: {} x {} (grid {}x{}), inlet U={}",
            self.channel.width,
            self.channel.height,
            self.channel.nx,
            ny,
            self.channel.inlet_velocity
        );
        log::info!(
            "Solver: tolerance={:e}, max_iterations={}, sweep={:?}",
            self.solver.tolerance,
            self.solver.max_iterations,
            self.solver.sweep
        );
        log::info!(
            "Visualization: {}x{} px, vector_scale={}, arrows every {} points -> {}/",
            self.visualization.image_width,
            self.visualization.image_height,
            self.visualization.vector_scale,
            self.visualization.arrow_step,
            self.visualization.output_dir
        );
    }
}
