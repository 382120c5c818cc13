//! Classroom potential-flow tools.
//!
//! The core is a Gauss-Seidel relaxation solver for the stream function of a
//! rectangular channel ([`solver::solve`]). Around it sit a PNG renderer
//! ([`visualisation`]), an analytic source/sink/free-stream evaluator
//! ([`analytic`]) and a two-click image distance measurer ([`measure`]).
//!
//! ```no_run
//! use stream_function::{solve, SolveParameters};
//!
//! let params = SolveParameters::new(1.0, 4.0, 2.0, 81, 1e-6, 10_000)?;
//! let result = solve(&params)?;
//! println!("{}", result.summary());
//! # Ok::<(), stream_function::SolverError>(())
//! ```

pub mod analytic;
pub mod config;
pub mod error;
pub mod field;
pub mod grid;
pub mod logging;
pub mod measure;
pub mod solver;
pub mod visualisation;

pub use config::{Config, SolveParameters, SweepOrder};
pub use error::SolverError;
pub use field::{StreamFunctionField, VelocityField};
pub use grid::Grid;
pub use solver::{solve, Convergence, SolveResult, StreamFunctionSolver};
