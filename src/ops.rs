//! Operation wrappers shared by the CLI and integration tests.
//!
//! Each `op_*` function wires one or more `algo` modules together and
//! returns a `serde_json::Value`, with no dependency on clap.

use std::path::Path;

use serde_json::{json, Value};
use tracing::info;

use crate::algo::nmf::{CountMatrix, DivergenceNmf, Factorization};
use crate::algo::topics::{self, Topic};
use crate::algo::vocabulary::Vocabulary;
use crate::algo::{corpus, report};
use crate::config::TrainConfig;
use crate::error::Result;

/// A trained factorization together with its ranked topics.
#[derive(Debug, Clone)]
pub struct TopicModel {
    pub config: TrainConfig,
    pub factorization: Factorization,
    pub topics: Vec<Topic>,
}

impl TopicModel {
    /// Number of documents whose dominant topic is each topic id.
    pub fn topic_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.factorization.rank()];
        for topic in self.factorization.dominant_topics() {
            sizes[topic] += 1;
        }
        sizes
    }

    pub fn to_json(&self) -> Value {
        let sizes = self.topic_sizes();
        let topics: Vec<Value> = self
            .topics
            .iter()
            .map(|topic| {
                let terms: Vec<Value> = topic
                    .terms
                    .iter()
                    .map(|t| json!({"term": t.term, "index": t.index, "weight": topics::round4(t.weight)}))
                    .collect();
                json!({
                    "id": topic.id,
                    "label": topic.label(3),
                    "size": sizes[topic.id],
                    "terms": terms,
                })
            })
            .collect();

        let (n_words, n_docs) = (self.factorization.w().nrows(), self.factorization.h().ncols());
        json!({
            "num_words": n_words,
            "num_documents": n_docs,
            "rank": self.factorization.rank(),
            "iterations": self.factorization.completed_iterations(),
            "seed": self.config.seed,
            "schedule": self.config.schedule,
            "final_objective": self.factorization.final_objective(),
            "objective": self.factorization.trace(),
            "topics": topics,
        })
    }
}

/// Factorize `x` and rank the top terms of every topic.
///
/// Without a vocabulary, terms are named `word_<1-based index>`.
pub fn train_topics(
    x: &CountMatrix,
    vocab: Option<&Vocabulary>,
    config: &TrainConfig,
) -> Result<TopicModel> {
    config.validate()?;
    let numbered;
    let vocab = match vocab {
        Some(v) => v,
        None => {
            numbered = Vocabulary::numbered(x.n_words());
            &numbered
        }
    };
    vocab.ensure_covers(x.n_words())?;

    let factorization =
        DivergenceNmf::seeded(x.n_words(), x.n_docs(), config.nmf_options(), config.seed)?.fit(x)?;
    let topics = topics::top_terms(factorization.w(), vocab, config.top_n)?;

    Ok(TopicModel {
        config: *config,
        factorization,
        topics,
    })
}

/// Shape and sparsity statistics for a count matrix.
pub fn op_inspect(x: &CountMatrix) -> Value {
    let (n_words, n_docs) = x.dim();
    let nnz = x.nnz();
    let cells = (n_words * n_docs) as f64;
    let empty = x.empty_documents();
    json!({
        "num_words": n_words,
        "num_documents": n_docs,
        "non_zero": nnz,
        "density": if cells > 0.0 { nnz as f64 / cells } else { 0.0 },
        "total_count": x.total(),
        "empty_documents": empty.len(),
    })
}

/// Load, train, optionally write CSV reports, and return the JSON summary.
pub fn op_train(
    data: &Path,
    vocab: Option<&Path>,
    n_words: Option<usize>,
    config: &TrainConfig,
    out_dir: Option<&Path>,
) -> Result<Value> {
    let x = corpus::load_counts(data, n_words)?;
    let vocab = vocab.map(Vocabulary::load).transpose()?;
    info!(
        data = %data.display(),
        words = x.n_words(),
        docs = x.n_docs(),
        "loaded count matrix"
    );

    let model = train_topics(&x, vocab.as_ref(), config)?;
    let mut summary = model.to_json();

    if let Some(dir) = out_dir {
        let written = report::write_all(dir, &model.topics, model.factorization.trace())?;
        let files: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        summary["files"] = json!(files);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inspect_counts_density() {
        let x = CountMatrix::from_rows(&[vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let v = op_inspect(&x);
        assert_eq!(v["non_zero"], 1);
        assert_eq!(v["density"], 0.25);
        assert_eq!(v["empty_documents"], 1);
    }

    #[test]
    fn topic_sizes_cover_all_documents() {
        let x = CountMatrix::from_rows(&[vec![4.0, 0.0, 3.0], vec![0.0, 4.0, 0.0]]).unwrap();
        let config = TrainConfig {
            rank: 2,
            iterations: 30,
            ..TrainConfig::default()
        };
        let model = train_topics(&x, None, &config).unwrap();
        assert_eq!(model.topic_sizes().iter().sum::<usize>(), 3);
        assert_eq!(model.topics.len(), 2);
        assert_eq!(model.topics[0].terms.len(), 2);
    }
}
