use crate::error::SolverError;
use ndarray::Array2;
use std::fmt;
use std::path::{Path, PathBuf};

/// Grayscale raster with intensities in `[0, 1]`, shape `(height, width)`.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub path: PathBuf,
    pub pixels: Array2<f64>,
}

impl RasterImage {
    pub fn width(&self) -> usize {
        self.pixels.ncols()
    }

    pub fn height(&self) -> usize {
        self.pixels.nrows()
    }
}

/// Decode a raster file. A missing or unreadable file is reported as a
/// resource error carrying a message fit for the user.
pub fn load_image(path: impl AsRef<Path>) -> Result<RasterImage, SolverError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SolverError::Resource {
            path: path.to_path_buf(),
            reason: "file not found, please provide a valid image file".to_string(),
        });
    }

    let decoded = image::open(path).map_err(|e| SolverError::Resource {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let luma = decoded.to_luma8();
    let (width, height) = luma.dimensions();

    let mut pixels = Array2::<f64>::zeros((height as usize, width as usize));
    for (x, y, px) in luma.enumerate_pixels() {
        pixels[[y as usize, x as usize]] = px.0[0] as f64 / 255.0;
    }

    log::info!("Loaded {} ({}x{})", path.display(), width, height);
    Ok(RasterImage {
        path: path.to_path_buf(),
        pixels,
    })
}

/// Pixel position, column `x` and row `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub x: i64,
    pub y: i64,
}

impl Pixel {
    /// Snap a pointer position to the nearest pixel.
    pub fn nearest(x: f64, y: f64) -> Self {
        Self {
            x: x.round() as i64,
            y: y.round() as i64,
        }
    }

    pub fn distance_to(&self, other: &Pixel) -> f64 {
        let dx = other.x as f64 - self.x as f64;
        let dy = other.y as f64 - self.y as f64;
        dx.hypot(dy)
    }

    pub fn midpoint(&self, other: &Pixel) -> (f64, f64) {
        (
            0.5 * (self.x as f64 + other.x as f64),
            0.5 * (self.y as f64 + other.y as f64),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub first: Pixel,
    pub second: Pixel,
    pub distance: f64,
}

impl Measurement {
    /// Annotation text, one decimal place.
    pub fn label(&self) -> String {
        format!("d={:.1}", self.distance)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) -> ({}, {}): {}",
            self.first.x,
            self.first.y,
            self.second.x,
            self.second.y,
            self.label()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureState {
    AwaitingFirstPoint,
    AwaitingSecondPoint { first: Pixel },
}

/// Two-click distance gesture. Every completed pair yields one measurement
/// and returns the machine to `AwaitingFirstPoint`.
#[derive(Debug, Clone)]
pub struct DistanceMeasurer {
    bounds: Option<(usize, usize)>,
    state: MeasureState,
}

impl DistanceMeasurer {
    /// Accept clicks anywhere.
    pub fn new() -> Self {
        Self {
            bounds: None,
            state: MeasureState::AwaitingFirstPoint,
        }
    }

    /// Accept clicks that land on `image` only.
    pub fn for_image(image: &RasterImage) -> Self {
        Self {
            bounds: Some((image.width(), image.height())),
            state: MeasureState::AwaitingFirstPoint,
        }
    }

    pub fn state(&self) -> MeasureState {
        self.state
    }

    fn accepts(&self, p: &Pixel) -> bool {
        match self.bounds {
            None => true,
            Some((w, h)) => p.x >= 0 && p.y >= 0 && (p.x as usize) < w && (p.y as usize) < h,
        }
    }

    /// Feed one click. Returns the measurement when it completes a pair.
    pub fn click(&mut self, x: f64, y: f64) -> Option<Measurement> {
        if !(x.is_finite() && y.is_finite()) {
            log::debug!("Ignoring non-finite click at ({}, {})", x, y);
            return None;
        }
        let p = Pixel::nearest(x, y);
        if !self.accepts(&p) {
            log::debug!("Ignoring click outside the image at ({}, {})", x, y);
            return None;
        }

        match self.state {
            MeasureState::AwaitingFirstPoint => {
                self.state = MeasureState::AwaitingSecondPoint { first: p };
                None
            }
            MeasureState::AwaitingSecondPoint { first } => {
                self.state = MeasureState::AwaitingFirstPoint;
                Some(Measurement {
                    first,
                    second: p,
                    distance: first.distance_to(&p),
                })
            }
        }
    }

    /// Drop a pending first point.
    pub fn reset(&mut self) {
        self.state = MeasureState::AwaitingFirstPoint;
    }
}

impl Default for DistanceMeasurer {
    fn default() -> Self {
        Self::new()
    }
}
