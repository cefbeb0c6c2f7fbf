//! Progress reporting for the curvature flow.
//!
//! The flow calls the callback once per round with a [`FlowProgress`]
//! snapshot, so callers can draw a progress line or log convergence.
//!
//! # Example
//!
//! ```
//! use riccimap::algo::Progress;
//!
//! let progress = Progress::new(|p| {
//!     eprintln!("round {}/{}: error {:.3e}", p.round + 1, p.max_rounds, p.error);
//! });
//! # let _ = progress;
//! ```

/// State of a running flow at the start of a round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowProgress {
    /// Current round (0-based).
    pub round: usize,
    /// Round budget.
    pub max_rounds: usize,
    /// Curvature evaluations so far.
    pub iterations: usize,
    /// Latest curvature error, `f64::INFINITY` before the first evaluation.
    pub error: f64,
}

impl FlowProgress {
    /// Fraction of the round budget used, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.max_rounds == 0 {
            return 1.0;
        }
        (self.round as f64 / self.max_rounds as f64).min(1.0)
    }
}

/// A callback receiving [`FlowProgress`] updates.
pub struct Progress {
    callback: Box<dyn Fn(&FlowProgress) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&FlowProgress) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, progress: &FlowProgress) {
        (self.callback)(progress);
    }

    /// A reporter that discards all updates.
    pub fn none() -> Self {
        Self::new(|_| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_callback_receives_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress = Progress::new(move |p| sink.lock().unwrap().push(p.round));

        for round in 0..3 {
            progress.report(&FlowProgress {
                round,
                max_rounds: 10,
                iterations: round * 64,
                error: 1.0,
            });
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_fraction() {
        let p = FlowProgress {
            round: 5,
            max_rounds: 10,
            iterations: 0,
            error: f64::INFINITY,
        };
        assert_eq!(p.fraction(), 0.5);
        assert_eq!(FlowProgress { max_rounds: 0, ..p }.fraction(), 1.0);
    }
}
