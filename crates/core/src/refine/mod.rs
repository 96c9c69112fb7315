//! Question solving by generate, execute and refine
//!
//! [`RefinementLoop::solve`] runs one question end to end and returns the
//! final statement together with a [`Trace`] of every attempt.

pub mod error;
pub mod solver;
pub mod trace;

pub use error::{SolveError, SolveResult};
pub use solver::RefinementLoop;
pub use trace::{Attempt, AttemptOutcome, AttemptReport, Termination, Trace, TraceReport};
