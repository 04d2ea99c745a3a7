//! Non-negative Matrix Factorization under a divergence objective.
//!
//! Given a word-document count matrix X (n_words × n_docs), decompose into:
//!   X ≈ W × H
//! where W (n_words × k) holds topic-word weights
//! and H (k × n_docs) holds topic-document weights.
//!
//! Uses the multiplicative update rules for the KL-style divergence
//! (Lee & Seung, 2001). Every denominator carries an `epsilon` floor and
//! every updated entry is clamped to [`POSITIVE_FLOOR`], so entries that
//! start positive stay positive.

use std::ops::ControlFlow;

use ndarray::{Array2, ArrayView2, Axis, Zip};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NmfError, Result};

pub const DEFAULT_RANK: usize = 25;
pub const DEFAULT_ITERATIONS: usize = 100;
pub const DEFAULT_EPSILON: f64 = 1e-16;

/// Smallest value an updated factor entry may take. Entries fed by all-zero
/// counts decay super-exponentially and would otherwise underflow to 0.0,
/// after which a multiplicative update can never revive them.
pub const POSITIVE_FLOOR: f64 = f64::MIN_POSITIVE;

/// Dense, non-negative word × document count matrix.
///
/// Immutable once built; the engine only ever reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    data: Array2<f64>,
}

impl CountMatrix {
    /// Wrap a dense matrix, rejecting empty shapes and negative or non-finite entries.
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (n_words, n_docs) = data.dim();
        if n_words == 0 || n_docs == 0 {
            return Err(NmfError::invalid_dimension(format!(
                "count matrix must be non-empty, got {n_words}x{n_docs}"
            )));
        }
        if let Some(((row, col), &value)) = data
            .indexed_iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(NmfError::InvalidCount { row, col, value });
        }
        Ok(Self { data })
    }

    /// Build from row-major nested vectors (one inner vector per word).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_docs = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().position(|r| r.len() != n_docs) {
            return Err(NmfError::invalid_dimension(format!(
                "row {bad} has {} columns, expected {n_docs}",
                rows[bad].len()
            )));
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((rows.len(), n_docs), flat)
            .map_err(|e| NmfError::invalid_dimension(e.to_string()))?;
        Self::new(data)
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// (n_words, n_docs)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn n_words(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_docs(&self) -> usize {
        self.data.ncols()
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0.0).count()
    }

    /// Sum of all counts.
    pub fn total(&self) -> f64 {
        self.data.sum()
    }

    /// Indices of documents (columns) with no words at all.
    pub fn empty_documents(&self) -> Vec<usize> {
        self.data
            .axis_iter(Axis(1))
            .enumerate()
            .filter(|(_, col)| col.iter().all(|&v| v == 0.0))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }
}

/// Which reconstruction the W half-step divides by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSchedule {
    /// Recompute W·H from the freshly updated H before updating W.
    #[default]
    Refreshed,
    /// Reuse the W·H computed before H was updated. Oscillates on some inputs.
    Stale,
}

impl UpdateSchedule {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "refreshed" | "refresh" => Some(Self::Refreshed),
            "stale" => Some(Self::Stale),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Refreshed => "refreshed",
            Self::Stale => "stale",
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["refreshed", "stale"]
    }
}

/// Hyperparameters for one training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NmfOptions {
    /// Number of topics (k).
    pub rank: usize,
    /// Exact number of update iterations; there is no early stopping.
    pub iterations: usize,
    /// Floor added to every denominator.
    pub epsilon: f64,
    pub schedule: UpdateSchedule,
    /// Fail with `NumericalDegeneracy` instead of letting NaN/Inf propagate.
    pub strict: bool,
}

impl Default for NmfOptions {
    fn default() -> Self {
        Self {
            rank: DEFAULT_RANK,
            iterations: DEFAULT_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            schedule: UpdateSchedule::default(),
            strict: false,
        }
    }
}

impl NmfOptions {
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(NmfError::invalid_dimension("rank must be at least 1"));
        }
        if self.iterations == 0 {
            return Err(NmfError::invalid_dimension(
                "iteration count must be at least 1",
            ));
        }
        if !(self.epsilon > 0.0 && self.epsilon.is_finite()) {
            return Err(NmfError::invalid_dimension(format!(
                "epsilon must be a positive finite number, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// Draw W (n × k) and H (k × m) with every entry from Uniform[1, 2).
pub fn initialize<R: Rng + ?Sized>(
    n: usize,
    m: usize,
    k: usize,
    rng: &mut R,
) -> Result<(Array2<f64>, Array2<f64>)> {
    for (name, value) in [("rows", n), ("columns", m), ("rank", k)] {
        if value == 0 {
            return Err(NmfError::invalid_dimension(format!(
                "{name} must be at least 1"
            )));
        }
    }
    let dist = Uniform::new(1.0, 2.0);
    let w = Array2::from_shape_simple_fn((n, k), || rng.sample(dist));
    let h = Array2::from_shape_simple_fn((k, m), || rng.sample(dist));
    Ok((w, h))
}

/// One multiplicative update: H first, then W against the updated H.
///
/// `epsilon` is added to W·H and also to the column sums Σ_n W[n,k] and row
/// sums Σ_m H[k,m] used as denominators.
///
/// Shapes are checked before anything is written, so on error W and H are
/// untouched. NaN or Inf already present in the inputs is carried through.
pub fn update(
    x: ArrayView2<'_, f64>,
    w: &mut Array2<f64>,
    h: &mut Array2<f64>,
    epsilon: f64,
    schedule: UpdateSchedule,
) -> Result<()> {
    check_shapes(x, w.view(), h.view())?;

    // H[k,m] *= Σ_n W[n,k]·X[n,m]/(WH)[n,m] / Σ_n W[n,k]
    let ratio = demand_ratio(x, &w.dot(&*h), epsilon);
    let topic_totals = w.sum_axis(Axis(0)).insert_axis(Axis(1)) + epsilon;
    *h *= &(w.t().dot(&ratio) / &topic_totals);
    h.mapv_inplace(floor_positive);

    // W[n,k] *= Σ_m X[n,m]/(WH)[n,m]·H[k,m] / Σ_m H[k,m]
    let ratio = match schedule {
        UpdateSchedule::Refreshed => demand_ratio(x, &w.dot(&*h), epsilon),
        UpdateSchedule::Stale => ratio,
    };
    let doc_totals = h.sum_axis(Axis(1)).insert_axis(Axis(0)) + epsilon;
    *w *= &(ratio.dot(&h.t()) / &doc_totals);
    w.mapv_inplace(floor_positive);

    Ok(())
}

/// Divergence objective tracked during training:
///
///   D = Σ X·log(1 / (WH + ε)) + WH
///
/// This omits the `X·log X − X` terms of the textbook generalized KL
/// divergence. It differs from it by a constant in W and H, so it is only
/// meaningful as a relative convergence signal and can be negative.
pub fn objective(
    x: ArrayView2<'_, f64>,
    w: ArrayView2<'_, f64>,
    h: ArrayView2<'_, f64>,
    epsilon: f64,
) -> Result<f64> {
    check_shapes(x, w, h)?;
    let reconstruction = w.dot(&h);
    Ok(Zip::from(&x)
        .and(&reconstruction)
        .fold(0.0, |acc, &x, &r| acc + x * (1.0 / (r + epsilon)).ln() + r))
}

// X / (WH + ε), elementwise
fn demand_ratio(x: ArrayView2<'_, f64>, reconstruction: &Array2<f64>, epsilon: f64) -> Array2<f64> {
    Zip::from(&x)
        .and(reconstruction)
        .map_collect(|&x, &r| x / (r + epsilon))
}

fn check_shapes(x: ArrayView2<'_, f64>, w: ArrayView2<'_, f64>, h: ArrayView2<'_, f64>) -> Result<()> {
    let (n, m) = x.dim();
    let (w_rows, w_cols) = w.dim();
    let (h_rows, h_cols) = h.dim();
    if w_rows != n || h_cols != m || w_cols != h_rows {
        return Err(NmfError::InvalidShape {
            x: x.dim(),
            w: w.dim(),
            h: h.dim(),
        });
    }
    Ok(())
}

// NaN compares false and passes through unchanged.
fn floor_positive(v: f64) -> f64 {
    if v < POSITIVE_FLOOR {
        POSITIVE_FLOOR
    } else {
        v
    }
}

fn all_finite(a: &Array2<f64>) -> bool {
    a.iter().all(|v| v.is_finite())
}

/// Snapshot handed to the observer after each completed iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    /// Zero-based iteration index.
    pub iteration: usize,
    pub objective: f64,
}

/// An initialized engine: owns freshly drawn W and H, not yet trained.
#[derive(Debug, Clone)]
pub struct DivergenceNmf {
    options: NmfOptions,
    w: Array2<f64>,
    h: Array2<f64>,
}

impl DivergenceNmf {
    /// Validate `options` and draw the initial factors from `rng`.
    pub fn initialize<R: Rng + ?Sized>(
        n_words: usize,
        n_docs: usize,
        options: NmfOptions,
        rng: &mut R,
    ) -> Result<Self> {
        options.validate()?;
        let (w, h) = initialize(n_words, n_docs, options.rank, rng)?;
        Ok(Self { options, w, h })
    }

    /// Same as [`DivergenceNmf::initialize`] with a `StdRng` seeded from `seed`.
    pub fn seeded(n_words: usize, n_docs: usize, options: NmfOptions, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::initialize(n_words, n_docs, options, &mut rng)
    }

    pub fn options(&self) -> &NmfOptions {
        &self.options
    }

    pub fn w(&self) -> ArrayView2<'_, f64> {
        self.w.view()
    }

    pub fn h(&self) -> ArrayView2<'_, f64> {
        self.h.view()
    }

    /// Objective of the current (untrained) factors against `x`.
    pub fn objective(&self, x: &CountMatrix) -> Result<f64> {
        objective(x.view(), self.w.view(), self.h.view(), self.options.epsilon)
    }

    /// Run the full iteration count.
    pub fn fit(self, x: &CountMatrix) -> Result<Factorization> {
        self.fit_with(x, |_| ControlFlow::Continue(()))
    }

    /// Run the iteration loop, calling `observer` after every iteration.
    ///
    /// Returning `ControlFlow::Break(())` stops before the next iteration;
    /// the result then reports fewer completed iterations than requested.
    pub fn fit_with<F>(mut self, x: &CountMatrix, mut observer: F) -> Result<Factorization>
    where
        F: FnMut(&IterationReport) -> ControlFlow<()>,
    {
        check_shapes(x.view(), self.w.view(), self.h.view())?;
        let NmfOptions {
            rank,
            iterations,
            epsilon,
            schedule,
            strict,
        } = self.options;

        info!(
            words = x.n_words(),
            docs = x.n_docs(),
            rank,
            iterations,
            ?schedule,
            strict,
            "starting divergence NMF"
        );

        let mut trace = Vec::with_capacity(iterations);
        for iteration in 0..iterations {
            update(x.view(), &mut self.w, &mut self.h, epsilon, schedule)?;
            let value = objective(x.view(), self.w.view(), self.h.view(), epsilon)?;
            trace.push(value);

            if strict && !(value.is_finite() && all_finite(&self.w) && all_finite(&self.h)) {
                return Err(NmfError::NumericalDegeneracy { iteration });
            }
            debug!(iteration, objective = value, "iteration complete");

            if observer(&IterationReport {
                iteration,
                objective: value,
            })
            .is_break()
            {
                info!(completed = iteration + 1, "training stopped by observer");
                break;
            }
        }

        info!(
            completed = trace.len(),
            final_objective = trace.last().copied().unwrap_or(f64::NAN),
            "divergence NMF finished"
        );

        Ok(Factorization {
            w: self.w,
            h: self.h,
            trace,
            requested_iterations: iterations,
        })
    }
}

/// Fully trained factors plus the objective trace. Read-only.
#[derive(Debug, Clone)]
pub struct Factorization {
    w: Array2<f64>,
    h: Array2<f64>,
    trace: Vec<f64>,
    requested_iterations: usize,
}

impl Factorization {
    /// Topic-word matrix (n_words × k).
    pub fn w(&self) -> ArrayView2<'_, f64> {
        self.w.view()
    }

    /// Topic-document matrix (k × n_docs).
    pub fn h(&self) -> ArrayView2<'_, f64> {
        self.h.view()
    }

    /// One objective value per completed iteration, in order.
    pub fn trace(&self) -> &[f64] {
        &self.trace
    }

    pub fn rank(&self) -> usize {
        self.w.ncols()
    }

    pub fn completed_iterations(&self) -> usize {
        self.trace.len()
    }

    pub fn requested_iterations(&self) -> usize {
        self.requested_iterations
    }

    pub fn is_complete(&self) -> bool {
        self.trace.len() == self.requested_iterations
    }

    pub fn final_objective(&self) -> Option<f64> {
        self.trace.last().copied()
    }

    /// Get dominant topic for each document (argmax over its H column).
    pub fn dominant_topics(&self) -> Vec<usize> {
        self.h
            .axis_iter(Axis(1))
            .map(|col| {
                col.iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, _)| i)
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Move out (trace, W, H).
    pub fn into_parts(self) -> (Vec<f64>, Array2<f64>, Array2<f64>) {
        (self.trace, self.w, self.h)
    }
}

/// Initialize from `seed` and run `iterations` updates at the given rank.
pub fn train(x: &CountMatrix, rank: usize, iterations: usize, seed: u64) -> Result<Factorization> {
    let options = NmfOptions {
        rank,
        iterations,
        ..NmfOptions::default()
    };
    DivergenceNmf::seeded(x.n_words(), x.n_docs(), options, seed)?.fit(x)
}
