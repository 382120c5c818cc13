use crate::field::VelocityField;
use crate::grid::Grid;
use crate::measure::{Measurement, Pixel, RasterImage};
use crate::solver::SolveResult;
use anyhow::{Context, Result};
use ndarray::Array2;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

/// Straight piece of a contour line, in domain coordinates.
pub type Segment = [(f64, f64); 2];

/// Arrow display settings for vector plots.
#[derive(Debug, Clone, Copy)]
pub struct ArrowStyle {
    pub scale: f64,
    pub step: usize,
}

pub struct FieldVisualiser {
    output_dir: PathBuf,
    width: u32,
    height: u32,
    contour_levels: usize,
    // Store as a boxed trait object
    gradient: Box<dyn colorgrad::Gradient>,
}

impl FieldVisualiser {
    pub fn new(output_dir: impl AsRef<Path>, width: u32, height: u32) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir).with_context(|| {
            format!("Failed to create output directory '{}'", output_dir.display())
        })?;

        let gradient = Box::new(colorgrad::preset::rd_yl_bu());

        Ok(Self {
            output_dir,
            width,
            height,
            contour_levels: 20,
            gradient,
        })
    }

    pub fn with_contour_levels(mut self, levels: usize) -> Self {
        self.contour_levels = levels;
        self
    }

    /// Stream-function heatmap with streamlines, velocity arrows and the
    /// convergence summary in the caption.
    pub fn plot_channel(&self, result: &SolveResult, arrows: ArrowStyle, name: &str) -> Result<PathBuf> {
        let title = format!("Stream function psi: {}", result.summary());
        self.render(
            &result.stream_function.psi,
            &result.grid,
            &title,
            name,
            Some((&result.velocity, arrows)),
        )
    }

    /// Heatmap and contour lines of any scalar field on `grid`.
    pub fn plot_scalar(&self, data: &Array2<f64>, grid: &Grid, title: &str, name: &str) -> Result<PathBuf> {
        self.render(data, grid, title, name, None)
    }

    fn render(
        &self,
        data: &Array2<f64>,
        grid: &Grid,
        title: &str,
        name: &str,
        arrows: Option<(&VelocityField, ArrowStyle)>,
    ) -> Result<PathBuf> {
        let filename = self.output_dir.join(format!("{}.png", name));
        self.draw_field(&filename, data, grid, title, arrows)
            .with_context(|| format!("Failed to write '{}'", filename.display()))?;
        log::info!("Saved frame: {}", filename.display());
        Ok(filename)
    }

    fn draw_field(
        &self,
        path: &Path,
        data: &Array2<f64>,
        grid: &Grid,
        title: &str,
        arrows: Option<(&VelocityField, ArrowStyle)>,
    ) -> Result<()> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (ny, nx) = data.dim();
        let (min_val, max_val) = finite_range(data);

        let x_range = grid.x0..grid.x0 + grid.width;
        let y_range = grid.y0..grid.y0 + grid.height;
        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc("x")
            .y_desc("y")
            .draw()?;

        // One cell per grid square, coloured by its corner average
        let cells = (0..ny - 1).flat_map(|i| (0..nx - 1).map(move |j| (i, j)));
        chart.draw_series(cells.map(|(i, j)| {
            let value = 0.25
                * (data[[i, j]] + data[[i + 1, j]] + data[[i, j + 1]] + data[[i + 1, j + 1]]);
            let color = self.value_to_color(value, min_val, max_val);
            Rectangle::new(
                [
                    (grid.x_coord(j), grid.y_coord(i)),
                    (grid.x_coord(j + 1), grid.y_coord(i + 1)),
                ],
                color.filled(),
            )
        }))?;

        for level in contour_levels(min_val, max_val, self.contour_levels) {
            let segments = contour_segments(data, grid, level);
            chart.draw_series(
                segments
                    .into_iter()
                    .map(|s| PathElement::new(vec![s[0], s[1]], BLACK.mix(0.6))),
            )?;
        }

        if let Some((velocity, style)) = arrows {
            for sample in velocity.subsample(style.step) {
                let x = grid.x_coord(sample.j);
                let y = grid.y_coord(sample.i);
                if let Some([shaft, head]) = arrow(x, y, sample.u * style.scale, sample.v * style.scale) {
                    chart.draw_series(std::iter::once(PathElement::new(shaft, BLACK)))?;
                    chart.draw_series(std::iter::once(PathElement::new(head, BLACK)))?;
                }
            }
        }

        root.present()?;
        Ok(())
    }

    /// Grayscale image with a red dot on every click, a dashed line for each
    /// measurement and its `d=` label at the midpoint. `pending` is a first
    /// click still waiting for its partner.
    pub fn plot_measurements(
        &self,
        image: &RasterImage,
        measurements: &[Measurement],
        pending: Option<Pixel>,
        name: &str,
    ) -> Result<PathBuf> {
        let filename = self.output_dir.join(format!("{}.png", name));
        self.draw_measurements(&filename, image, measurements, pending)
            .with_context(|| format!("Failed to write '{}'", filename.display()))?;
        log::info!("Saved annotated image: {}", filename.display());
        Ok(filename)
    }

    fn draw_measurements(
        &self,
        path: &Path,
        image: &RasterImage,
        measurements: &[Measurement],
        pending: Option<Pixel>,
    ) -> Result<()> {
        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let (w, h) = (image.width() as f64, image.height() as f64);
        // image rows grow downwards, chart y grows upwards
        let centre = |x: f64, y: f64| (x + 0.5, h - y - 0.5);

        let mut chart = ChartBuilder::on(&root)
            .caption(image.path.display().to_string(), ("sans-serif", 20))
            .margin(10)
            .build_cartesian_2d(0.0..w, 0.0..h)?;

        chart.draw_series(image.pixels.indexed_iter().map(|((row, col), &v)| {
            let g = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            let (x, top) = (col as f64, h - row as f64);
            Rectangle::new([(x, top - 1.0), (x + 1.0, top)], RGBColor(g, g, g).filled())
        }))?;

        let dash = (w.max(h) / 100.0).max(1.0);
        for m in measurements {
            let a = centre(m.first.x as f64, m.first.y as f64);
            let b = centre(m.second.x as f64, m.second.y as f64);
            chart.draw_series(
                dashes(a, b, dash, dash)
                    .into_iter()
                    .map(|s| PathElement::new(vec![s[0], s[1]], RED.stroke_width(2))),
            )?;

            let (mx, my) = m.first.midpoint(&m.second);
            chart.draw_series(std::iter::once(Text::new(
                m.label(),
                centre(mx, my),
                ("sans-serif", 16).into_font().color(&RED),
            )))?;
        }

        let clicks = measurements
            .iter()
            .flat_map(|m| [m.first, m.second])
            .chain(pending);
        chart.draw_series(
            clicks.map(|p| Circle::new(centre(p.x as f64, p.y as f64), 4, RED.filled())),
        )?;

        root.present()?;
        Ok(())
    }

    fn value_to_color(&self, value: f64, min_val: f64, max_val: f64) -> RGBColor {
        let normalized = if max_val > min_val {
            (value - min_val) / (max_val - min_val)
        } else {
            0.5
        };
        let normalized = normalized.clamp(0.0, 1.0);
        let color_rgba = self.gradient.at(normalized as f32).to_rgba8();
        RGBColor(color_rgba[0], color_rgba[1], color_rgba[2])
    }
}

/// `(min, max)` over finite samples; `(0, 0)` if there are none.
fn finite_range(data: &Array2<f64>) -> (f64, f64) {
    let (lo, hi) = data
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        (0.0, 0.0)
    } else {
        (lo, hi)
    }
}

/// `n` evenly spaced levels strictly inside `(min, max)`.
pub fn contour_levels(min: f64, max: f64, n: usize) -> Vec<f64> {
    if n == 0 || !(max > min) {
        return Vec::new();
    }
    let step = (max - min) / (n + 1) as f64;
    (1..=n).map(|k| min + step * k as f64).collect()
}

/// Marching squares over every grid cell. Saddle cells pair crossings in
/// edge order.
pub fn contour_segments(data: &Array2<f64>, grid: &Grid, level: f64) -> Vec<Segment> {
    let (ny, nx) = data.dim();
    let mut segments = Vec::new();

    for i in 0..ny.saturating_sub(1) {
        for j in 0..nx.saturating_sub(1) {
            // counter-clockwise from the lower-left corner
            let corners = [(i, j), (i, j + 1), (i + 1, j + 1), (i + 1, j)];
            let mut crossings = Vec::with_capacity(4);

            for edge in 0..4 {
                let (ia, ja) = corners[edge];
                let (ib, jb) = corners[(edge + 1) % 4];
                let (va, vb) = (data[[ia, ja]], data[[ib, jb]]);
                if !(va.is_finite() && vb.is_finite()) {
                    continue;
                }
                if (va >= level) != (vb >= level) {
                    let t = (level - va) / (vb - va);
                    let (xa, ya) = (grid.x_coord(ja), grid.y_coord(ia));
                    let (xb, yb) = (grid.x_coord(jb), grid.y_coord(ib));
                    crossings.push((xa + t * (xb - xa), ya + t * (yb - ya)));
                }
            }

            for pair in crossings.chunks_exact(2) {
                segments.push([pair[0], pair[1]]);
            }
        }
    }
    segments
}

/// Dashes of length `dash` separated by `gap` along the segment `a -> b`.
fn dashes(a: (f64, f64), b: (f64, f64), dash: f64, gap: f64) -> Vec<Segment> {
    let length = (b.0 - a.0).hypot(b.1 - a.1);
    if !(length > 0.0) {
        return Vec::new();
    }
    if !(dash > 0.0 && gap >= 0.0) {
        return vec![[a, b]];
    }
    let (ux, uy) = ((b.0 - a.0) / length, (b.1 - a.1) / length);
    let at = |t: f64| (a.0 + ux * t, a.1 + uy * t);

    let mut out = Vec::new();
    let mut start = 0.0;
    while start < length {
        let end = (start + dash).min(length);
        out.push([at(start), at(end)]);
        start = end + gap;
    }
    out
}

/// Shaft and head polylines for an arrow from `(x, y)` along `(du, dv)`.
fn arrow(x: f64, y: f64, du: f64, dv: f64) -> Option<[Vec<(f64, f64)>; 2]> {
    let length = du.hypot(dv);
    if length < 1e-12 {
        return None;
    }
    let tip = (x + du, y + dv);
    let head = 0.3 * length;
    let (ux, uy) = (du / length, dv / length);
    let (sin, cos) = 25f64.to_radians().sin_cos();

    let left = (
        tip.0 - head * (ux * cos - uy * sin),
        tip.1 - head * (uy * cos + ux * sin),
    );
    let right = (
        tip.0 - head * (ux * cos + uy * sin),
        tip.1 - head * (uy * cos - ux * sin),
    );
    Some([vec![(x, y), tip], vec![left, tip, right]])
}
