//! Tangential circle-packing Ricci flow.
//!
//! Every vertex `i` carries a conformal factor `u_i`; the circle of radius
//! `exp(u_i)` touches the circles of its neighbours, which fixes all edge
//! lengths. The flow adjusts `u` until the angle defect at every vertex
//! matches its [`TargetCurvature`].
//!
//! Each round first tries Newton steps on the Ricci energy (optional, on by
//! default) and then runs a fixed number of gradient steps
//! `u_i += step (target_k_i - k_i)`. The run stops as soon as the largest
//! curvature deviation drops below the threshold.
//!
//! # Example
//!
//! ```
//! use riccimap::prelude::*;
//! use riccimap::algo::flow::{ricci_flow, FlowOptions, TargetCurvature};
//! use nalgebra::Point3;
//!
//! let mut vertices = Vec::new();
//! for j in 0..3 {
//!     for i in 0..3 {
//!         vertices.push(Point3::new(i as f64, j as f64, 0.0));
//!     }
//! }
//! let mut faces = Vec::new();
//! for j in 0..2 {
//!     for i in 0..2 {
//!         let v = j * 3 + i;
//!         faces.push([v, v + 1, v + 4]);
//!         faces.push([v, v + 4, v + 3]);
//!     }
//! }
//! let mut mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! let options = FlowOptions::default().with_target(TargetCurvature::DiskWithHoles);
//! let report = ricci_flow(&mut mesh, &options).unwrap();
//! assert!(report.error < 1e-6);
//! ```

pub mod metric;
mod newton;
pub mod sparse;
pub mod target;

pub use metric::{
    corner_angle, curvature_error, total_curvature, update_corner_angles, update_edge_lengths,
    update_edge_weights, update_vertex_curvature,
};
pub use newton::{hessian, newton_direction};
pub use target::{loop_corners, TargetCurvature};

use crate::algo::boundary::{trace_boundary, BoundaryLoop};
use crate::algo::progress::{FlowProgress, Progress};
use crate::error::{MeshError, Result};
use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};

use sparse::ConjugateGradient;

/// Step-halvings tried before a Newton direction is rejected.
const NEWTON_BACKTRACKS: usize = 4;

/// Options for [`ricci_flow`].
#[derive(Debug, Clone)]
pub struct FlowOptions {
    /// Curvatures to reach.
    pub target: TargetCurvature,

    /// Stop once `max |target_k - k|` is below this value.
    pub threshold: f64,

    /// Gradient step size.
    pub step: f64,

    /// Gradient steps per round.
    pub inner_iterations: usize,

    /// Round budget before giving up with [`MeshError::FlowDidNotConverge`].
    pub max_rounds: usize,

    /// Try Newton steps at the start of every round.
    pub newton: bool,

    /// Newton steps per round.
    pub newton_iterations: usize,

    /// Conjugate gradient iteration limit for one Newton solve.
    pub cg_max_iterations: usize,

    /// Conjugate gradient relative residual tolerance.
    pub cg_tolerance: f64,

    /// Fail with [`MeshError::DegenerateAngle`] instead of clamping.
    pub strict_angles: bool,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            target: TargetCurvature::default(),
            threshold: 1e-6,
            step: 2e-2,
            inner_iterations: 64,
            max_rounds: 1000,
            newton: true,
            newton_iterations: 20,
            cg_max_iterations: 2000,
            cg_tolerance: 1e-10,
            strict_angles: false,
        }
    }
}

impl FlowOptions {
    /// Set the target curvature.
    pub fn with_target(mut self, target: TargetCurvature) -> Self {
        self.target = target;
        self
    }

    /// Set the convergence threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the gradient step size.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Set the number of gradient steps per round.
    pub fn with_inner_iterations(mut self, iterations: usize) -> Self {
        self.inner_iterations = iterations;
        self
    }

    /// Set the round budget.
    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Enable or disable the Newton phase.
    pub fn with_newton(mut self, newton: bool) -> Self {
        self.newton = newton;
        self
    }

    /// Plain gradient descent, no Newton steps.
    pub fn gradient_only(self) -> Self {
        self.with_newton(false)
    }

    /// Set the number of Newton steps per round.
    pub fn with_newton_iterations(mut self, iterations: usize) -> Self {
        self.newton_iterations = iterations;
        self
    }

    /// Treat out-of-range cosines as errors.
    pub fn with_strict_angles(mut self, strict: bool) -> Self {
        self.strict_angles = strict;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold.is_finite()) {
            return Err(MeshError::invalid_param("threshold", self.threshold, "must be positive"));
        }
        if !(self.step > 0.0 && self.step.is_finite()) {
            return Err(MeshError::invalid_param("step", self.step, "must be positive"));
        }
        if self.inner_iterations == 0 {
            return Err(MeshError::invalid_param("inner_iterations", 0, "must be at least 1"));
        }
        if self.max_rounds == 0 {
            return Err(MeshError::invalid_param("max_rounds", 0, "must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of a converged flow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowReport {
    /// Rounds started.
    pub rounds: usize,
    /// Curvature evaluations.
    pub iterations: usize,
    /// Accepted Newton steps.
    pub newton_steps: usize,
    /// Final `max |target_k - k|`.
    pub error: f64,
    /// Corners whose cosine had to be clamped.
    pub degenerate_angles: usize,
}

/// Run the flow to convergence. See [`ricci_flow_with_progress`].
pub fn ricci_flow<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, options: &FlowOptions) -> Result<FlowReport> {
    ricci_flow_with_progress(mesh, options, &Progress::none())
}

/// Run the flow to convergence, reporting once per round.
///
/// On success the mesh holds the final `u`, edge lengths, weights, corner
/// angles and curvatures, all consistent with each other. The conformal
/// factors are used as the starting point, so a second call on a converged
/// mesh returns after one evaluation.
///
/// # Errors
///
/// - [`MeshError::InvalidParameter`] for unusable options
/// - [`MeshError::InvalidState`] when the target does not fit the mesh
/// - [`MeshError::DegenerateAngle`] in strict mode
/// - [`MeshError::FlowDidNotConverge`] when the round budget runs out
pub fn ricci_flow_with_progress<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &FlowOptions,
    progress: &Progress,
) -> Result<FlowReport> {
    options.validate()?;
    let loops = trace_boundary(mesh);
    options.target.validate(mesh, &loops)?;

    log::info!(
        "ricci flow: {} vertices, {} faces, {} boundary loop(s), target {:?}",
        mesh.num_vertices(),
        mesh.num_faces(),
        loops.len(),
        options.target
    );

    let mut flow = Flow {
        mesh,
        loops,
        options,
        report: FlowReport {
            error: f64::INFINITY,
            ..Default::default()
        },
    };

    for round in 0..options.max_rounds {
        progress.report(&FlowProgress {
            round,
            max_rounds: options.max_rounds,
            iterations: flow.report.iterations,
            error: flow.report.error,
        });
        flow.report.rounds = round + 1;

        if options.newton && flow.newton_phase()? {
            return Ok(flow.finish());
        }
        if flow.gradient_round()? {
            return Ok(flow.finish());
        }

        log::info!(
            "round {}: error {:.3e} after {} iterations",
            round,
            flow.report.error,
            flow.report.iterations
        );
    }

    log::warn!(
        "ricci flow stopped after {} rounds, error {:.3e}",
        flow.report.rounds,
        flow.report.error
    );
    Err(MeshError::FlowDidNotConverge {
        rounds: flow.report.rounds,
        iterations: flow.report.iterations,
        error: flow.report.error,
    })
}

struct Flow<'a, I: MeshIndex> {
    mesh: &'a mut HalfEdgeMesh<I>,
    loops: Vec<BoundaryLoop<I>>,
    options: &'a FlowOptions,
    report: FlowReport,
}

impl<I: MeshIndex> Flow<'_, I> {
    /// Bring lengths, targets, weights, angles and curvatures up to date with `u`.
    fn evaluate(&mut self) -> Result<f64> {
        update_edge_lengths(self.mesh);
        self.options.target.apply(self.mesh, &self.loops);
        update_edge_weights(self.mesh);
        self.report.degenerate_angles += update_corner_angles(self.mesh, self.options.strict_angles)?;
        update_vertex_curvature(self.mesh);

        let error = curvature_error(self.mesh);
        self.report.iterations += 1;
        self.report.error = error;
        log::debug!("iteration {}: error {:e}", self.report.iterations, error);
        Ok(error)
    }

    /// Gradient steps; `true` once converged.
    fn gradient_round(&mut self) -> Result<bool> {
        for _ in 0..self.options.inner_iterations {
            if self.evaluate()? < self.options.threshold {
                return Ok(true);
            }
            let step = self.options.step;
            for v in 0..self.mesh.num_vertices() {
                let vertex = self.mesh.vertex_mut(VertexId::new(v));
                vertex.u += step * (vertex.target_k - vertex.k);
            }
        }
        Ok(false)
    }

    /// Newton steps with backtracking; `true` once converged. A step that
    /// does not lower the error is undone and the round continues with
    /// gradient steps.
    fn newton_phase(&mut self) -> Result<bool> {
        let solver = ConjugateGradient {
            max_iterations: self.options.cg_max_iterations,
            tolerance: self.options.cg_tolerance,
            deflate_constants: true,
        };
        let mut error = self.evaluate()?;

        for _ in 0..self.options.newton_iterations {
            if error < self.options.threshold {
                return Ok(true);
            }

            let du = match newton_direction(self.mesh, &solver) {
                Ok(du) => du,
                Err(err) => {
                    log::debug!("newton step skipped: {}", err);
                    return Ok(false);
                }
            };
            let saved: Vec<f64> = self.mesh.vertices().map(|(_, v)| v.u).collect();

            let mut scale = 1.0;
            let mut accepted = false;
            for _ in 0..=NEWTON_BACKTRACKS {
                self.set_factors(&saved, |i| scale * du[i]);
                let trial = self.evaluate()?;
                if trial < error {
                    error = trial;
                    accepted = true;
                    break;
                }
                scale *= 0.5;
            }

            if !accepted {
                self.set_factors(&saved, |_| 0.0);
                self.report.error = error;
                log::debug!("newton step rejected at error {:e}", error);
                return Ok(false);
            }
            self.report.newton_steps += 1;
        }

        Ok(error < self.options.threshold)
    }

    fn set_factors(&mut self, base: &[f64], offset: impl Fn(usize) -> f64) {
        for (i, &u) in base.iter().enumerate() {
            self.mesh.vertex_mut(VertexId::new(i)).u = u + offset(i);
        }
    }

    fn finish(self) -> FlowReport {
        log::info!(
            "ricci flow converged: {} round(s), {} iterations, {} newton step(s), error {:.3e}",
            self.report.rounds,
            self.report.iterations,
            self.report.newton_steps,
            self.report.error
        );
        self.report
    }
}
