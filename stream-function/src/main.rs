use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stream_function::analytic::PotentialFlow;
use stream_function::grid::Grid;
use stream_function::logging::init_logging;
use stream_function::measure::{load_image, DistanceMeasurer, MeasureState};
use stream_function::visualisation::{ArrowStyle, FieldVisualiser};
use stream_function::{solve, Config, SweepOrder};

#[derive(Parser)]
#[command(name = "stream-function", version, about = "Classroom potential-flow tools")]
struct Cli {
    /// Log level (error, warn, info, debug, trace); falls back to RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relax the channel stream function and render it
    Solve(SolveArgs),
    /// Plot the free stream + source + sink superposition
    Analytic(AnalyticArgs),
    /// Measure pixel distances on an image from pairs of click positions
    Measure(MeasureArgs),
}

#[derive(Args)]
struct SolveArgs {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use the parallel red-black sweep
    #[arg(long)]
    parallel: bool,
}

#[derive(Args)]
struct AnalyticArgs {
    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    free_stream: f64,

    #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
    source: f64,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    sink: f64,

    /// Half distance between source and sink
    #[arg(long, default_value_t = 0.0)]
    spacing: f64,

    /// Plot window is [-extent, extent] on both axes
    #[arg(long, default_value_t = 5.0)]
    extent: f64,

    #[arg(long, default_value_t = 100)]
    points: usize,

    #[arg(short, long, default_value = "output")]
    output: PathBuf,
}

#[derive(Args)]
struct MeasureArgs {
    /// Raster image to measure on
    image: PathBuf,

    /// Directory for the annotated copy of the image
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Click positions as x y pairs, two clicks per measurement
    #[arg(num_args = 0.., allow_hyphen_values = true)]
    clicks: Vec<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Solve(args) => run_solve(args),
        Commands::Analytic(args) => run_analytic(args),
        Commands::Measure(args) => {
            run_measure(args);
            Ok(())
        }
    }
}

fn run_solve(args: SolveArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => {
            let mut config = Config::default();
            config.validate()?;
            config
        }
    };
    if let Some(dir) = args.output {
        config.visualization.output_dir = dir.display().to_string();
    }
    if args.parallel {
        config.solver.sweep = SweepOrder::RedBlack;
    }
    config.log_summary();

    let params = config.solve_parameters()?;
    let result = solve(&params)?;
    log::info!("{}", result.summary());
    result.log_statistics();

    let vis = &config.visualization;
    let visualiser = FieldVisualiser::new(&vis.output_dir, vis.image_width, vis.image_height)?
        .with_contour_levels(vis.contour_levels);
    let arrows = ArrowStyle {
        scale: vis.vector_scale,
        step: vis.arrow_step,
    };
    visualiser.plot_channel(&result, arrows, "stream_function")?;

    let grid = result.grid;
    let laplacian = result.stream_function.laplacian(grid.dx, grid.dy);
    visualiser.plot_scalar(&laplacian, &grid, "Laplacian of stream function", "laplacian")?;
    Ok(())
}

fn run_analytic(args: AnalyticArgs) -> Result<()> {
    if args.extent <= 0.0 || args.points < 3 {
        bail!(
            "extent must be positive and points at least 3 (extent={}, points={})",
            args.extent,
            args.points
        );
    }
    let flow = PotentialFlow {
        free_stream: args.free_stream,
        source_strength: args.source,
        sink_strength: args.sink,
        half_spacing: args.spacing,
    };
    log::info!("{}", flow.describe());
    if let Some((x, y)) = flow.source_stagnation_point() {
        log::info!("Stagnation point at ({:.4}, {:.4})", x, y);
    }

    let grid = Grid::centred(args.extent, args.points);
    let field = flow.evaluate(&grid);

    let visualiser = FieldVisualiser::new(&args.output, 1000, 900)?;
    visualiser.plot_scalar(&field.psi, &grid, &flow.describe(), "potential_flow")?;
    Ok(())
}

// A failed session is reported but does not fail the program.
fn run_measure(args: MeasureArgs) {
    let image = match load_image(&args.image) {
        Ok(image) => image,
        Err(e) => {
            log::error!("Error: {}", e);
            return;
        }
    };

    if args.clicks.len() % 2 != 0 {
        log::warn!("Odd number of coordinates, ignoring the last one");
    }

    let mut measurer = DistanceMeasurer::for_image(&image);
    let mut measurements = Vec::new();
    for click in args.clicks.chunks_exact(2) {
        if let Some(measurement) = measurer.click(click[0], click[1]) {
            log::info!("Measurement {}: {}", measurements.len() + 1, measurement);
            measurements.push(measurement);
        }
    }
    if measurements.is_empty() {
        log::warn!("No complete pair of clicks on {}", image.path.display());
    }

    let pending = match measurer.state() {
        MeasureState::AwaitingSecondPoint { first } => Some(first),
        MeasureState::AwaitingFirstPoint => None,
    };
    let (width, height) = (image.width().clamp(200, 2000), image.height().clamp(200, 2000));
    let annotated = FieldVisualiser::new(&args.output, width as u32, height as u32)
        .and_then(|vis| vis.plot_measurements(&image, &measurements, pending, "measurement"));
    if let Err(e) = annotated {
        log::error!("Error: {:#}", e);
    }
}
