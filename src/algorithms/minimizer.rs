//! Bounded quasi-Newton minimizer
//!
//! Projected limited-memory BFGS for box-constrained smooth objectives.
//! Each iteration builds a search direction from the last `history`
//! correction pairs (two-loop recursion), freezes variables that sit on a
//! bound with the gradient pushing outward, and backtracks along the
//! projected path until the Armijo condition holds.
//!
//! Stopping rules:
//! - projected gradient max-norm `<= gtol` (converged)
//! - `(f_k - f_{k+1}) / max(|f_k|, |f_{k+1}|, 1) <= ftol` (converged)
//! - iteration or evaluation cap reached (failure)
//! - no decrease found along the search direction (failure)
//! - non-finite objective at the current point (failure)
//!
//! All working storage lives on the call stack of [`minimize`]; the routine is
//! reentrant.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Sufficient-decrease constant of the Armijo condition
const ARMIJO_C1: f64 = 1e-4;

/// Smooth objective with an analytic gradient
pub trait ObjectiveFunction {
    /// Objective value and gradient at `x`
    fn evaluate(&self, x: &DVector<f64>) -> (f64, DVector<f64>);
}

/// Minimizer tolerances and caps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerOptions {
    /// Relative objective reduction tolerance
    pub ftol: f64,
    /// Projected gradient max-norm tolerance
    pub gtol: f64,
    /// Maximum quasi-Newton iterations
    pub max_iterations: usize,
    /// Maximum objective/gradient evaluations
    pub max_evaluations: usize,
    /// Number of stored correction pairs
    pub history: usize,
    /// Maximum step halvings per line search
    pub max_line_search_steps: usize,
}

impl Default for MinimizerOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-9,
            gtol: 1e-5,
            max_iterations: 15_000,
            max_evaluations: 15_000,
            history: 10,
            max_line_search_steps: 30,
        }
    }
}

/// Why the minimizer stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    ProjectedGradient,
    RelativeReduction,
    IterationLimit,
    EvaluationLimit,
    LineSearchFailed,
    NonFinite,
}

impl Termination {
    pub fn is_success(&self) -> bool {
        matches!(self, Termination::ProjectedGradient | Termination::RelativeReduction)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Termination::ProjectedGradient => "converged: projected gradient below tolerance",
            Termination::RelativeReduction => "converged: relative reduction of objective below tolerance",
            Termination::IterationLimit => "stopped: iteration limit reached",
            Termination::EvaluationLimit => "stopped: objective evaluation limit reached",
            Termination::LineSearchFailed => "abnormal termination: line search found no decrease",
            Termination::NonFinite => "abnormal termination: objective is not finite",
        }
    }
}

/// Result of a minimization run
#[derive(Debug, Clone, PartialEq)]
pub struct MinimizeOutcome {
    pub x: DVector<f64>,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

impl MinimizeOutcome {
    pub fn success(&self) -> bool {
        self.termination.is_success()
    }

    pub fn message(&self) -> &'static str {
        self.termination.message()
    }
}

struct CorrectionPair {
    s: DVector<f64>,
    y: DVector<f64>,
    rho: f64,
}

struct SearchBox<'a> {
    lower: &'a DVector<f64>,
    upper: &'a DVector<f64>,
}

impl SearchBox<'_> {
    fn project(&self, v: &DVector<f64>) -> DVector<f64> {
        v.zip_zip_map(self.lower, self.upper, |vi, lo, hi| vi.max(lo).min(hi))
    }

    fn projected_gradient_norm(&self, x: &DVector<f64>, g: &DVector<f64>) -> f64 {
        let stepped = self.project(&(x - g));
        (stepped - x).amax()
    }

    /// Zero the gradient components of variables held at a bound
    fn free_gradient(&self, x: &DVector<f64>, g: &DVector<f64>) -> DVector<f64> {
        let mut free = g.clone();
        for i in 0..x.len() {
            let at_lower = x[i] <= self.lower[i] && g[i] > 0.0;
            let at_upper = x[i] >= self.upper[i] && g[i] < 0.0;
            if at_lower || at_upper {
                free[i] = 0.0;
            }
        }
        free
    }
}

/// Apply the inverse-Hessian approximation to `g` (two-loop recursion)
fn two_loop(g: &DVector<f64>, history: &VecDeque<CorrectionPair>) -> DVector<f64> {
    let mut q = g.clone();
    let mut alphas = Vec::with_capacity(history.len());

    for pair in history.iter().rev() {
        let alpha = pair.rho * pair.s.dot(&q);
        q -= &pair.y * alpha;
        alphas.push(alpha);
    }

    if let Some(last) = history.back() {
        let gamma = last.s.dot(&last.y) / last.y.dot(&last.y);
        q *= gamma;
    }

    for (pair, alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = pair.rho * pair.y.dot(&q);
        q += &pair.s * (alpha - beta);
    }

    q
}

fn is_finite(value: f64, gradient: &DVector<f64>) -> bool {
    value.is_finite() && gradient.iter().all(|g| g.is_finite())
}

/// Minimize `objective` from `x0` inside the box `bounds` (one `(lower, upper)`
/// pair per variable).
pub fn minimize<F: ObjectiveFunction + ?Sized>(
    objective: &F,
    x0: &DVector<f64>,
    bounds: &[(f64, f64)],
    options: &MinimizerOptions,
) -> MinimizeOutcome {
    let n = x0.len();
    let lower = DVector::from_iterator(n, bounds.iter().map(|b| b.0));
    let upper = DVector::from_iterator(n, bounds.iter().map(|b| b.1));
    let domain = SearchBox { lower: &lower, upper: &upper };

    let mut x = domain.project(x0);
    let (mut fx, mut g) = objective.evaluate(&x);
    let mut evaluations = 1;
    let mut iterations = 0;
    let mut history: VecDeque<CorrectionPair> = VecDeque::with_capacity(options.history);

    let termination = 'outer: loop {
        if !is_finite(fx, &g) {
            break Termination::NonFinite;
        }
        if domain.projected_gradient_norm(&x, &g) <= options.gtol {
            break Termination::ProjectedGradient;
        }
        if iterations >= options.max_iterations {
            break Termination::IterationLimit;
        }

        let free_g = domain.free_gradient(&x, &g);
        let mut direction = -two_loop(&free_g, &history);
        for i in 0..n {
            if free_g[i] == 0.0 && g[i] != 0.0 {
                direction[i] = 0.0;
            }
        }
        if g.dot(&direction) >= 0.0 {
            // Curvature information went stale; fall back to steepest descent
            history.clear();
            direction = -free_g.clone();
        }

        let mut step = if history.is_empty() {
            (1.0 / direction.norm()).min(1.0)
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..options.max_line_search_steps {
            if evaluations >= options.max_evaluations {
                break 'outer Termination::EvaluationLimit;
            }
            let candidate = domain.project(&(&x + &direction * step));
            let s = &candidate - &x;
            if s.amax() == 0.0 {
                break;
            }

            let (f_candidate, g_candidate) = objective.evaluate(&candidate);
            evaluations += 1;

            if is_finite(f_candidate, &g_candidate) && f_candidate <= fx + ARMIJO_C1 * g.dot(&s) {
                accepted = Some((candidate, f_candidate, g_candidate));
                break;
            }
            step *= 0.5;
        }

        iterations += 1;

        let Some((x_new, f_new, g_new)) = accepted else {
            if history.is_empty() {
                break Termination::LineSearchFailed;
            }
            history.clear();
            continue;
        };

        let s = &x_new - &x;
        let y = &g_new - &g;
        let sy = s.dot(&y);
        if sy > f64::EPSILON * y.dot(&y) {
            if history.len() == options.history.max(1) {
                history.pop_front();
            }
            history.push_back(CorrectionPair { s, y, rho: 1.0 / sy });
        }

        let reduction = (fx - f_new) / fx.abs().max(f_new.abs()).max(1.0);
        x = x_new;
        fx = f_new;
        g = g_new;

        if reduction <= options.ftol {
            break Termination::RelativeReduction;
        }
    };

    MinimizeOutcome {
        x,
        value: fx,
        iterations,
        evaluations,
        termination,
    }
}
