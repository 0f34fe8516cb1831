//! Dataflow analysis of method bodies
//!
//! The [`Analyzer`] runs a worklist over the instructions of a method until the [`Frame`] before
//! every reachable instruction stops changing. Frames hold [`Value`]s, which are more than types:
//!
//!   - primitives may carry a known constant, and arithmetic on constants is folded
//!   - strings and string builders may be simulated, so that their contents are known (see
//!     [`SimulationTable`])
//!   - every value records the instructions which contributed to it (its [`Provenance`])
//!
//! Branches on constants are opaque predicates: their dead successor is never scheduled, so the
//! code behind it ends up without a frame. Type mismatches which better flow information might
//! explain away (typically a `null` which later turns out to be checked) are recorded as
//! [`Problem`]s and only fail the analysis if they are still standing after convergence.

mod analyzer;
mod blocks;
mod errors;
mod factories;
mod frame;
mod interpreter;
mod opaque;
mod problems;
mod simulation;
mod types;
mod value;

pub use analyzer::*;
pub use blocks::*;
pub use errors::*;
pub use factories::*;
pub use frame::*;
pub use interpreter::*;
pub use opaque::*;
pub use problems::*;
pub use simulation::*;
pub use types::*;
pub use value::*;
