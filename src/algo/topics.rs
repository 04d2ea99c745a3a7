//! Ranking the strongest terms of each topic column of W.

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use serde::Serialize;

use crate::algo::vocabulary::Vocabulary;
use crate::error::Result;

/// Terms listed per topic unless the caller asks otherwise.
pub const DEFAULT_TOP_N: usize = 10;

/// A ranked term within a topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermWeight {
    /// 0-based word index (row of W).
    pub index: usize,
    pub term: String,
    /// Column-normalized weight in W.
    pub weight: f64,
}

/// A topic's highest-weighted terms, strongest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topic {
    pub id: usize,
    pub terms: Vec<TermWeight>,
}

impl Topic {
    /// Short label built from the first `n` terms.
    pub fn label(&self, n: usize) -> String {
        self.terms
            .iter()
            .take(n)
            .map(|t| t.term.as_str())
            .collect::<Vec<&str>>()
            .join(", ")
    }

    /// `term:weight, term:weight, ...` with weights rounded to 4 decimals.
    pub fn summary(&self) -> String {
        self.terms
            .iter()
            .map(|t| format!("{}:{}", t.term, round4(t.weight)))
            .collect::<Vec<String>>()
            .join(", ")
    }
}

pub fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

/// Scale each column of W to sum to one.
pub fn normalize_columns(w: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut normalized = w.to_owned();
    for mut col in normalized.axis_iter_mut(Axis(1)) {
        let total = col.sum();
        if total > 0.0 {
            col /= total;
        }
    }
    normalized
}

/// Top `n` terms per topic column of W, ranked by normalized weight.
///
/// Ties go to the lower word index.
pub fn top_terms(w: ArrayView2<'_, f64>, vocab: &Vocabulary, n: usize) -> Result<Vec<Topic>> {
    vocab.ensure_covers(w.nrows())?;
    let normalized = normalize_columns(w);

    Ok((0..normalized.ncols())
        .into_par_iter()
        .map(|id| {
            let mut indexed: Vec<(usize, f64)> =
                normalized.column(id).iter().copied().enumerate().collect();
            indexed.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            let terms = indexed
                .into_iter()
                .take(n)
                .map(|(index, weight)| TermWeight {
                    index,
                    term: vocab.term(index).unwrap_or_default().to_string(),
                    weight,
                })
                .collect();
            Topic { id, terms }
        })
        .collect())
}

/// Near-square (rows, cols) layout for `k` topics: 25 → 5×5, 10 → 3×4.
pub fn grid_shape(k: usize) -> (usize, usize) {
    if k == 0 {
        return (0, 0);
    }
    let cols = (k as f64).sqrt().ceil() as usize;
    let rows = k.div_ceil(cols);
    (rows, cols)
}
