//! Conformal parameterization algorithms.
//!
//! - [`boundary`]: boundary loop extraction
//! - [`flow`]: tangential circle-packing Ricci flow
//! - [`embed`]: planar layout of the flat metric and extremal length
//! - [`progress`]: per-round progress callbacks

pub mod boundary;
pub mod embed;
pub mod flow;
pub mod progress;

pub use progress::{FlowProgress, Progress};
